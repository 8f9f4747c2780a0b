use common::{JobId, LifecycleOutcome};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::JobError;
use crate::gateway::TaskGateway;
use crate::legacy::LegacyLogReader;

/// Listado y ciclo de vida de jobs sobre ambos backends. Cada operación se
/// manda al backend dueño del identificador.
pub struct JobDirectory {
    gateway: Arc<dyn TaskGateway>,
    legacy: LegacyLogReader,
}

impl JobDirectory {
    pub fn new(gateway: Arc<dyn TaskGateway>, legacy: LegacyLogReader) -> Self {
        Self { gateway, legacy }
    }

    async fn is_task(&self, task_id: &str) -> Result<bool, JobError> {
        Ok(self.gateway.job_metadata(task_id).await?.is_some())
    }

    /// Ids del sistema actual seguidos de los archivos legacy.
    pub async fn list_all(&self) -> Result<Vec<JobId>, JobError> {
        let mut ids: Vec<JobId> = self
            .gateway
            .list_all_jobs()
            .await?
            .into_iter()
            .map(|t| t.task_id)
            .collect();
        ids.extend(self.legacy.list().await?);
        Ok(ids)
    }

    /// Devuelve el mensaje de confirmación.
    pub async fn delete(&self, task_id: &str) -> Result<String, JobError> {
        if self.is_task(task_id).await? {
            // la cancelación es best-effort; borrar los registros es lo que cuenta
            match self.gateway.cancel(task_id).await {
                Ok(outcome) if outcome.status == "error" => {
                    warn!("cancelación previa al borrado de {} falló: {:?}", task_id, outcome.message)
                }
                Ok(_) => {}
                Err(e) => warn!("cancelación previa al borrado de {} falló: {}", task_id, e),
            }

            self.gateway.delete_records(task_id).await?;
            info!("tarea {} borrada", task_id);
            return Ok(format!("Task {} deleted successfully", task_id));
        }

        self.legacy.remove(task_id).await?;
        info!("archivo legacy {} borrado", task_id);
        Ok(format!("File {} deleted successfully", task_id))
    }

    pub async fn retry(&self, task_id: &str) -> Result<LifecycleOutcome, JobError> {
        if self.is_task(task_id).await? {
            return Ok(self.gateway.retry(task_id).await?);
        }
        Err(JobError::Unsupported(
            "Retry for old system is not supported in the new API. Please use the new task ID format."
                .to_string(),
        ))
    }

    pub async fn cancel(&self, task_id: &str) -> Result<LifecycleOutcome, JobError> {
        if self.is_task(task_id).await? {
            return Ok(self.gateway.cancel(task_id).await?);
        }
        Err(JobError::Unsupported(
            "Cancellation for old system is not supported in the new API. Please use the new task ID format."
                .to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::resolver::StatusResolver;
    use crate::store::MemoryTaskStore;
    use async_trait::async_trait;
    use common::{JobMetadata, TaskSummary};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn setup() -> (MemoryTaskStore, JobDirectory, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = MemoryTaskStore::new(3);
        let directory = JobDirectory::new(Arc::new(store.clone()), LegacyLogReader::new(dir.path()));
        (store, directory, dir)
    }

    #[tokio::test]
    async fn list_all_concatena_tareas_y_archivos() {
        let (store, directory, dir) = setup();
        store.store_task_info("t2", json!({})).unwrap();
        store.store_task_info("t1", json!({})).unwrap();
        std::fs::write(dir.path().join("old.prg"), "x").unwrap();
        std::fs::write(dir.path().join("skip.log"), "x").unwrap();

        assert_eq!(directory.list_all().await.unwrap(), vec!["t1", "t2", "old.prg"]);
    }

    #[tokio::test]
    async fn delete_de_tarea_la_saca_del_listado_y_del_resolver() {
        let (store, directory, dir) = setup();
        store.store_task_info("t1", json!({"name": "N"})).unwrap();
        store.store_task_status("t1", json!({"status": "processing"})).unwrap();

        let msg = directory.delete("t1").await.unwrap();
        assert_eq!(msg, "Task t1 deleted successfully");
        assert!(directory.list_all().await.unwrap().is_empty());

        let resolver = StatusResolver::with_backends(
            Arc::new(store.clone()),
            LegacyLogReader::new(dir.path()),
        );
        assert!(matches!(
            resolver.resolve("t1").await,
            Err(JobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_legacy_valida_antes_de_tocar_el_disco() {
        let (_store, directory, dir) = setup();
        std::fs::write(dir.path().join("old.prg"), "x").unwrap();

        assert!(matches!(
            directory.delete("../old.prg").await,
            Err(JobError::InvalidRequest(_))
        ));
        assert!(matches!(
            directory.delete("old.txt").await,
            Err(JobError::InvalidRequest(_))
        ));
        assert!(matches!(
            directory.delete("gone.prg").await,
            Err(JobError::NotFound(_))
        ));

        assert_eq!(
            directory.delete("old.prg").await.unwrap(),
            "File old.prg deleted successfully"
        );
        assert!(!dir.path().join("old.prg").exists());
    }

    #[tokio::test]
    async fn retry_y_cancel_legacy_son_unsupported() {
        let (_store, directory, dir) = setup();
        std::fs::write(dir.path().join("old.prg"), "x").unwrap();

        assert!(matches!(
            directory.retry("old.prg").await,
            Err(JobError::Unsupported(_))
        ));
        assert!(matches!(
            directory.cancel("old.prg").await,
            Err(JobError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn retry_de_tarea_devuelve_el_resultado_del_gateway() {
        let (store, directory, _dir) = setup();
        store.store_task_info("t1", json!({})).unwrap();
        store.store_task_status("t1", json!({"status": "complete"})).unwrap();

        let outcome = directory.retry("t1").await.unwrap();
        assert_eq!(outcome, LifecycleOutcome::error("Task is not in a failed state"));
    }

    /// Gateway que conoce un job pero no puede cancelarlo.
    struct StubbornGateway {
        inner: MemoryTaskStore,
    }

    #[async_trait]
    impl TaskGateway for StubbornGateway {
        async fn job_metadata(&self, id: &str) -> Result<Option<JobMetadata>, GatewayError> {
            self.inner.job_metadata(id).await
        }
        async fn latest_event(&self, id: &str) -> Result<Option<Value>, GatewayError> {
            self.inner.latest_event(id).await
        }
        async fn all_events(&self, id: &str) -> Result<Vec<Value>, GatewayError> {
            self.inner.all_events(id).await
        }
        async fn list_all_jobs(&self) -> Result<Vec<TaskSummary>, GatewayError> {
            self.inner.list_all_jobs().await
        }
        async fn cancel(&self, _id: &str) -> Result<LifecycleOutcome, GatewayError> {
            Err(GatewayError::Poisoned)
        }
        async fn retry(&self, id: &str) -> Result<LifecycleOutcome, GatewayError> {
            self.inner.retry(id).await
        }
        async fn delete_records(&self, id: &str) -> Result<(), GatewayError> {
            self.inner.delete_records(id).await
        }
    }

    #[tokio::test]
    async fn delete_sigue_aunque_falle_la_cancelacion() {
        let dir = TempDir::new().unwrap();
        let store = MemoryTaskStore::new(3);
        store.store_task_info("t1", json!({})).unwrap();
        let directory = JobDirectory::new(
            Arc::new(StubbornGateway { inner: store.clone() }),
            LegacyLogReader::new(dir.path()),
        );

        assert!(directory.delete("t1").await.is_ok());
        assert!(store.job_metadata("t1").await.unwrap().is_none());

        // cancel directo sí propaga el fallo como Internal
        store.store_task_info("t1", json!({})).unwrap();
        assert!(matches!(
            directory.cancel("t1").await,
            Err(JobError::Internal(_))
        ));
    }
}
