use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type JobId = String;

/// Metadatos de un job del sistema actual (registro `task:<id>:info`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,

    /// Petición original tal cual la mandó el cliente (puede traer display_*)
    #[serde(default)]
    pub original_request: Map<String, Value>,
}

impl JobMetadata {
    /// Lee un registro de metadatos campo por campo, sin fallar si falta algo
    /// o si algún campo tiene un tipo inesperado.
    pub fn from_record(record: &Value) -> Self {
        let text = |key: &str| {
            record
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            kind: text("type"),
            name: text("name"),
            artist: text("artist"),
            original_request: record
                .get("original_request")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }
    }

    pub fn display_title(&self) -> String {
        self.display_override("display_title", &self.name)
    }

    pub fn display_type(&self) -> String {
        self.display_override("display_type", &self.kind)
    }

    pub fn display_artist(&self) -> String {
        self.display_override("display_artist", &self.artist)
    }

    fn display_override(&self, key: &str, fallback: &str) -> String {
        self.original_request
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string()
    }
}

/// Una entrada del listado de jobs del sistema actual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: JobId,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub artist: String,
    /// Discriminador del último evento ("unknown" si todavía no hay eventos)
    pub status: String,
    pub timestamp: Option<f64>,
}

/// Resultado de cancel/retry tal como lo devuelve el gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleOutcome {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl LifecycleOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
            task_id: None,
            retry_count: None,
            max_retries: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTaskResponse {
    pub task_id: JobId,
}
