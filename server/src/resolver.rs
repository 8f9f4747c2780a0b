use async_trait::async_trait;
use common::{classify, StatusView};
use std::sync::Arc;
use tracing::debug;

use crate::error::JobError;
use crate::gateway::TaskGateway;
use crate::legacy::LegacyLogReader;

/// Un backend capaz de reconocer un identificador de job.
#[async_trait]
pub trait StatusSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` cuando el identificador no pertenece a este backend.
    async fn lookup(&self, task_id: &str) -> Result<Option<StatusView>, JobError>;
}

/// Jobs del sistema actual (metadatos + eventos vía gateway).
pub struct TaskRecordSource {
    gateway: Arc<dyn TaskGateway>,
}

impl TaskRecordSource {
    pub fn new(gateway: Arc<dyn TaskGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl StatusSource for TaskRecordSource {
    fn name(&self) -> &'static str {
        "tasks"
    }

    async fn lookup(&self, task_id: &str) -> Result<Option<StatusView>, JobError> {
        let Some(meta) = self.gateway.job_metadata(task_id).await? else {
            return Ok(None);
        };

        // una sola lectura: `latest` y `history` siempre coinciden
        let history = self.gateway.all_events(task_id).await?;
        let latest = history.last().cloned();
        debug!(
            "tarea {}: {} eventos, último = {:?}",
            task_id,
            history.len(),
            latest
        );

        let mut view = StatusView::from_metadata(task_id, &meta);
        view.status_count = Some(history.len());

        // con metadatos pero sin eventos: aceptado y todavía sin arrancar
        if let Some(latest) = latest {
            let c = classify(&latest, &history);
            view.event = Some(c.category);
            view.progress_message = c.progress_message;
            view.details = c.details;
            view.last_line = Some(latest);
        }

        Ok(Some(view))
    }
}

#[async_trait]
impl StatusSource for LegacyLogReader {
    fn name(&self) -> &'static str {
        "legacy"
    }

    async fn lookup(&self, task_id: &str) -> Result<Option<StatusView>, JobError> {
        self.read(task_id).await
    }
}

/// Prueba cada backend en orden y se queda con el primero que reconoce el
/// identificador. Nunca mezcla datos de dos backends.
pub struct StatusResolver {
    sources: Vec<Box<dyn StatusSource>>,
}

impl StatusResolver {
    pub fn new(sources: Vec<Box<dyn StatusSource>>) -> Self {
        Self { sources }
    }

    /// Sistema actual primero, legacy después.
    pub fn with_backends(gateway: Arc<dyn TaskGateway>, legacy: LegacyLogReader) -> Self {
        let sources: Vec<Box<dyn StatusSource>> = vec![
            Box::new(TaskRecordSource::new(gateway)),
            Box::new(legacy),
        ];
        Self::new(sources)
    }

    pub async fn resolve(&self, task_id: &str) -> Result<StatusView, JobError> {
        for source in &self.sources {
            if let Some(view) = source.lookup(task_id).await? {
                debug!("tarea {} resuelta por el backend {}", task_id, source.name());
                return Ok(view);
            }
        }
        Err(JobError::NotFound("Task or file not found".to_string()))
    }
}
