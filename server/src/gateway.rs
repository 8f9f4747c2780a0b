use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use common::{JobMetadata, LifecycleOutcome, TaskSummary};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("task store lock poisoned")]
    Poisoned,

    #[error("corrupt record under key {0}")]
    Corrupt(String),
}

/// Acceso a los registros de tareas del sistema actual (metadatos + eventos
/// en un store clave-valor, con un sistema de colas externo detrás).
///
/// Cualquier lectura puede devolver ausencia. No hay atomicidad entre
/// metadatos y eventos: puede existir un job con metadatos y sin eventos.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    async fn job_metadata(&self, task_id: &str) -> Result<Option<JobMetadata>, GatewayError>;

    async fn latest_event(&self, task_id: &str) -> Result<Option<Value>, GatewayError>;

    /// Todos los eventos en orden de llegada.
    async fn all_events(&self, task_id: &str) -> Result<Vec<Value>, GatewayError>;

    async fn list_all_jobs(&self) -> Result<Vec<TaskSummary>, GatewayError>;

    async fn cancel(&self, task_id: &str) -> Result<LifecycleOutcome, GatewayError>;

    async fn retry(&self, task_id: &str) -> Result<LifecycleOutcome, GatewayError>;

    /// Borra metadatos y eventos juntos.
    async fn delete_records(&self, task_id: &str) -> Result<(), GatewayError>;
}
