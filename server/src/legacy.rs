use chrono::Utc;
use common::{EventCategory, StatusView};
use serde_json::{Map, Value};
use std::{io::ErrorKind, path::PathBuf};
use tracing::{debug, error, warn};

use crate::error::JobError;

/// Extensión de los archivos de log del sistema viejo.
pub const LEGACY_SUFFIX: &str = ".prg";

/// Rechaza identificadores que podrían salir del directorio legacy.
pub fn validate_identifier(task_id: &str) -> Result<(), JobError> {
    if task_id.is_empty() || task_id.contains("..") || task_id.contains(['/', '\\']) {
        return Err(JobError::InvalidRequest("Invalid file request".to_string()));
    }
    Ok(())
}

/// Lector de los archivos `.prg`: una línea JSON (o texto) por registro,
/// línea 1 = petición original, línea 2 = recurso, última = estado actual.
///
/// Se lee sin locks; si el escritor está agregando una línea podemos ver la
/// última a medio escribir, y en ese caso queda como texto crudo.
#[derive(Debug, Clone)]
pub struct LegacyLogReader {
    root: PathBuf,
}

impl LegacyLogReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `Ok(None)` si el archivo no existe.
    pub async fn read(&self, task_id: &str) -> Result<Option<StatusView>, JobError> {
        validate_identifier(task_id)?;

        let path = self.root.join(task_id);
        match tokio::fs::read(&path).await {
            // bytes sueltos de un carácter cortado a la mitad no tumban la lectura
            Ok(bytes) => Ok(Some(parse_log(task_id, &String::from_utf8_lossy(&bytes)))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                error!("no se pudo leer el log legacy {}: {}", task_id, e);
                Err(JobError::Internal("failed to read legacy log".to_string()))
            }
        }
    }

    /// Nombres de archivo con la extensión legacy. Si el directorio no
    /// existe no hay nada que listar.
    pub async fn list(&self) -> Result<Vec<String>, JobError> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                error!("no se pudo listar el directorio legacy: {}", e);
                return Err(JobError::Internal("failed to list legacy logs".to_string()));
            }
        };

        let mut files = Vec::new();
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("entrada ilegible en el directorio legacy: {}", e);
                    continue;
                }
            };
            let is_file = entry.file_type().await.map(|ft| ft.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(LEGACY_SUFFIX) {
                    files.push(name.to_string());
                }
            }
        }

        files.sort();
        Ok(files)
    }

    pub async fn remove(&self, task_id: &str) -> Result<(), JobError> {
        validate_identifier(task_id)?;
        if !task_id.ends_with(LEGACY_SUFFIX) {
            return Err(JobError::InvalidRequest(format!(
                "Only {} files can be deleted",
                LEGACY_SUFFIX
            )));
        }

        let path = self.root.join(task_id);
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(JobError::NotFound("File not found".to_string()));
        }

        tokio::fs::remove_file(&path).await.map_err(|e| {
            error!("no se pudo borrar el log legacy {}: {}", task_id, e);
            JobError::Internal("failed to delete legacy log".to_string())
        })?;
        debug!("log legacy {} borrado", task_id);
        Ok(())
    }
}

/// Arma la vista normalizada a partir del contenido de un `.prg`. Las líneas
/// que no son JSON válido nunca son error: quedan en blanco o como texto.
pub fn parse_log(task_id: &str, content: &str) -> StatusView {
    let lines: Vec<&str> = content.lines().collect();
    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return StatusView::blank(task_id);
    };

    // línea 1: la petición original, envuelta o tal cual
    let original_request: Option<Map<String, Value>> =
        match serde_json::from_str::<Value>(first) {
            Ok(Value::Object(mut obj)) => match obj.remove("original_request") {
                Some(Value::Object(inner)) => Some(inner),
                Some(_) => None,
                None => Some(obj),
            },
            _ => None,
        };

    // línea 2: tipo/nombre/artista del recurso
    let resource = lines
        .get(1)
        .and_then(|line| serde_json::from_str::<Value>(line).ok())
        .unwrap_or(Value::Null);
    let resource_field = |key: &str| {
        resource
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let kind = resource_field("type");
    let name = resource_field("name");
    let artist = resource_field("artist");

    let display = |key: &str, base: &str, fallback: &str| {
        original_request
            .as_ref()
            .and_then(|req| {
                req.get(key)
                    .and_then(Value::as_str)
                    .or_else(|| req.get(base).and_then(Value::as_str))
            })
            .unwrap_or(fallback)
            .to_string()
    };
    let display_title = display("display_title", "name", &name);
    let display_type = display("display_type", "type", &kind);
    let display_artist = display("display_artist", "artist", &artist);

    let last_line = serde_json::from_str::<Value>(last)
        .unwrap_or_else(|_| Value::String(last.to_string()));

    StatusView {
        kind,
        name,
        artist,
        last_line: Some(last_line),
        original_request: original_request.map(Value::Object),
        display_title,
        display_type,
        display_artist,
        status_count: None,
        task_id: task_id.to_string(),
        timestamp: Some(Utc::now()),
        event: Some(EventCategory::Unknown),
        progress_message: None,
        details: Default::default(),
    }
}
