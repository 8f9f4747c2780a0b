use async_trait::async_trait;
use chrono::Utc;
use common::{states, JobMetadata, LifecycleOutcome, TaskSummary};
use serde_json::{json, Map, Value};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, info};

use crate::gateway::{GatewayError, TaskGateway};

fn info_key(task_id: &str) -> String {
    format!("task:{}:info", task_id)
}

fn status_key(task_id: &str) -> String {
    format!("task:{}:status", task_id)
}

fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Store clave-valor en memoria con el mismo esquema de claves que usa el
/// sistema de colas: `task:<id>:info` (metadatos) y `task:<id>:status`
/// (lista ordenada de eventos).
#[derive(Clone)]
pub struct MemoryTaskStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
    max_retries: u32,
}

impl MemoryTaskStore {
    pub fn new(max_retries: u32) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            max_retries,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Value>>, GatewayError> {
        self.entries.lock().map_err(|_| GatewayError::Poisoned)
    }

    pub fn store_task_info(&self, task_id: &str, info: Value) -> Result<(), GatewayError> {
        let mut entries = self.lock()?;
        entries.insert(info_key(task_id), info);
        Ok(())
    }

    /// Agrega un evento al final de la lista. Si no trae `timestamp` se lo
    /// ponemos nosotros.
    pub fn store_task_status(&self, task_id: &str, event: Value) -> Result<(), GatewayError> {
        let mut entries = self.lock()?;
        Self::push_event_locked(&mut entries, task_id, event)
    }

    fn push_event_locked(
        entries: &mut HashMap<String, Value>,
        task_id: &str,
        mut event: Value,
    ) -> Result<(), GatewayError> {
        if let Some(obj) = event.as_object_mut() {
            obj.entry("timestamp").or_insert_with(|| json!(now_secs()));
        }

        let key = status_key(task_id);
        let list = entries.entry(key.clone()).or_insert_with(|| json!([]));
        match list.as_array_mut() {
            Some(events) => {
                events.push(event);
                Ok(())
            }
            None => Err(GatewayError::Corrupt(key)),
        }
    }

    pub fn contains(&self, task_id: &str) -> Result<bool, GatewayError> {
        Ok(self.lock()?.contains_key(&info_key(task_id)))
    }

    fn events_locked(
        entries: &HashMap<String, Value>,
        task_id: &str,
    ) -> Result<Vec<Value>, GatewayError> {
        let key = status_key(task_id);
        match entries.get(&key) {
            None => Ok(Vec::new()),
            Some(Value::Array(events)) => Ok(events.clone()),
            Some(_) => Err(GatewayError::Corrupt(key)),
        }
    }
}

#[async_trait]
impl TaskGateway for MemoryTaskStore {
    async fn job_metadata(&self, task_id: &str) -> Result<Option<JobMetadata>, GatewayError> {
        let entries = self.lock()?;
        Ok(entries.get(&info_key(task_id)).map(JobMetadata::from_record))
    }

    async fn latest_event(&self, task_id: &str) -> Result<Option<Value>, GatewayError> {
        let entries = self.lock()?;
        Ok(Self::events_locked(&entries, task_id)?.pop())
    }

    async fn all_events(&self, task_id: &str) -> Result<Vec<Value>, GatewayError> {
        let entries = self.lock()?;
        Self::events_locked(&entries, task_id)
    }

    async fn list_all_jobs(&self) -> Result<Vec<TaskSummary>, GatewayError> {
        let entries = self.lock()?;

        let mut out = Vec::new();
        for (key, info) in entries.iter() {
            let Some(task_id) = key
                .strip_prefix("task:")
                .and_then(|rest| rest.strip_suffix(":info"))
            else {
                continue;
            };

            let meta = JobMetadata::from_record(info);
            let last = Self::events_locked(&entries, task_id)?.pop();

            out.push(TaskSummary {
                task_id: task_id.to_string(),
                kind: meta.kind,
                name: meta.name,
                artist: meta.artist,
                status: last
                    .as_ref()
                    .map(|ev| common::event::status_of(ev).to_string())
                    .unwrap_or_else(|| states::UNKNOWN.to_string()),
                timestamp: last
                    .as_ref()
                    .and_then(|ev| ev.get("timestamp"))
                    .and_then(Value::as_f64),
            });
        }

        out.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        Ok(out)
    }

    async fn cancel(&self, task_id: &str) -> Result<LifecycleOutcome, GatewayError> {
        if !self.contains(task_id)? {
            return Ok(LifecycleOutcome::error(format!("Task {} not found", task_id)));
        }

        self.store_task_status(
            task_id,
            json!({
                "status": states::CANCELLED,
                "message": "Task cancelled by user",
            }),
        )?;
        info!("tarea {} cancelada", task_id);

        Ok(LifecycleOutcome {
            status: states::CANCELLED.to_string(),
            message: Some("Task cancelled".to_string()),
            task_id: Some(task_id.to_string()),
            retry_count: None,
            max_retries: None,
        })
    }

    async fn retry(&self, task_id: &str) -> Result<LifecycleOutcome, GatewayError> {
        // chequeo y escritura bajo el mismo guard: dos reintentos simultáneos
        // no pueden crear el mismo `<id>_retry<k>`
        let mut entries = self.lock()?;

        let Some(info) = entries.get(&info_key(task_id)).cloned() else {
            return Ok(LifecycleOutcome::error(format!("Task {} not found", task_id)));
        };
        let last = Self::events_locked(&entries, task_id)?.pop();

        let Some(last) = last.filter(|ev| common::event::status_of(ev) == states::ERROR) else {
            return Ok(LifecycleOutcome::error("Task is not in a failed state"));
        };

        // el contador vive en los metadatos de los reintentos; el evento de
        // error puede traerlo también
        let retry_count = info
            .get("retry_count")
            .or_else(|| last.get("retry_count"))
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;

        if retry_count >= self.max_retries {
            return Ok(LifecycleOutcome::error(format!(
                "Maximum retry attempts ({}) reached",
                self.max_retries
            )));
        }

        let next = retry_count + 1;
        let new_task_id = format!("{}_retry{}", task_id, next);

        let mut new_info = match info {
            Value::Object(obj) => obj,
            _ => Map::new(),
        };
        new_info.insert("retry_count".to_string(), json!(next));
        new_info.insert("retry_of".to_string(), json!(task_id));

        entries.insert(info_key(&new_task_id), Value::Object(new_info));
        Self::push_event_locked(
            &mut entries,
            task_id,
            json!({
                "status": states::RETRYING,
                "retry_count": next,
                "new_task_id": new_task_id,
            }),
        )?;
        Self::push_event_locked(&mut entries, &new_task_id, json!({ "status": states::QUEUED }))?;
        drop(entries);

        info!(
            "tarea {} reencolada como {} (intento {}/{})",
            task_id, new_task_id, next, self.max_retries
        );

        Ok(LifecycleOutcome {
            status: "requeued".to_string(),
            message: None,
            task_id: Some(new_task_id),
            retry_count: Some(next),
            max_retries: Some(self.max_retries),
        })
    }

    async fn delete_records(&self, task_id: &str) -> Result<(), GatewayError> {
        let mut entries = self.lock()?;
        entries.remove(&info_key(task_id));
        entries.remove(&status_key(task_id));
        debug!("registros de la tarea {} borrados", task_id);
        Ok(())
    }
}
