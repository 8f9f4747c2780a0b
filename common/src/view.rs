use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::states;
use crate::job::{JobId, JobMetadata};

/// Categoría semántica del último evento de un job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Progress,
    Complete,
    Error,
    TrackComplete,
    Update,
    /// Solo para entradas legacy, que no tienen categorías
    Unknown,
}

impl EventCategory {
    /// `cancelled` no tiene categoría propia y queda como `update`.
    pub fn from_status(status: &str) -> Self {
        match status {
            states::COMPLETE | states::DONE => EventCategory::Complete,
            states::TRACK_COMPLETE => EventCategory::TrackComplete,
            states::ERROR => EventCategory::Error,
            states::TRACK_PROGRESS | states::REAL_TIME => EventCategory::Progress,
            _ => EventCategory::Update,
        }
    }
}

/// Campos de avance que dependen del tipo de evento. Se aplanan en la
/// respuesta y solo aparecen los que el evento aporta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_track: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tracks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_song: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_elapsed: Option<Value>,
}

/// Vista normalizada del estado de un job, igual para ambos backends.
/// Se recalcula en cada consulta y nunca se guarda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusView {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub artist: String,
    pub last_line: Option<Value>,
    pub original_request: Option<Value>,
    pub display_title: String,
    pub display_type: String,
    pub display_artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_count: Option<usize>,
    pub task_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,

    #[serde(flatten)]
    pub details: ProgressDetails,
}

impl StatusView {
    /// Vista base de un job del sistema actual, todavía sin clasificar.
    pub fn from_metadata(task_id: &str, meta: &JobMetadata) -> Self {
        Self {
            kind: meta.kind.clone(),
            name: meta.name.clone(),
            artist: meta.artist.clone(),
            last_line: None,
            original_request: Some(Value::Object(meta.original_request.clone())),
            display_title: meta.display_title(),
            display_type: meta.display_type(),
            display_artist: meta.display_artist(),
            status_count: Some(0),
            task_id: task_id.to_string(),
            timestamp: Some(Utc::now()),
            event: None,
            progress_message: None,
            details: ProgressDetails::default(),
        }
    }

    /// Vista vacía de un archivo legacy sin líneas.
    pub fn blank(task_id: &str) -> Self {
        Self {
            kind: String::new(),
            name: String::new(),
            artist: String::new(),
            last_line: None,
            original_request: None,
            display_title: String::new(),
            display_type: String::new(),
            display_artist: String::new(),
            status_count: None,
            task_id: task_id.to_string(),
            timestamp: None,
            event: Some(EventCategory::Unknown),
            progress_message: None,
            details: ProgressDetails::default(),
        }
    }
}
