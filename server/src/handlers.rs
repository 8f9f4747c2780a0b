use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use common::{
    states, DeleteResponse, JobId, JobMetadata, LifecycleOutcome, NewTaskResponse, StatusView,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{ApiResult, JobError};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // consultas y ciclo de vida, para ambos backends
        .route("/api/prgs/list", get(list_jobs))
        .route("/api/prgs/:task_id", get(get_status))
        .route("/api/prgs/delete/:task_id", delete(delete_job))
        .route("/api/prgs/retry/:task_id", post(retry_job))
        .route("/api/prgs/cancel/:task_id", post(cancel_job))
        // lado del ejecutor: alta de tareas y eventos
        .route("/api/tasks", post(create_task))
        .route("/api/tasks/:task_id/status", post(push_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<StatusView>> {
    Ok(Json(state.resolver.resolve(&task_id).await?))
}

async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<JobId>>> {
    Ok(Json(state.directory.list_all().await?))
}

async fn delete_job(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let message = state.directory.delete(&task_id).await?;
    Ok(Json(DeleteResponse { message }))
}

async fn retry_job(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<LifecycleOutcome>> {
    Ok(Json(state.directory.retry(&task_id).await?))
}

async fn cancel_job(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<LifecycleOutcome>> {
    Ok(Json(state.directory.cancel(&task_id).await?))
}

// Registra una tarea nueva y la deja en cola
async fn create_task(
    State(state): State<AppState>,
    Json(meta): Json<JobMetadata>,
) -> ApiResult<Json<NewTaskResponse>> {
    let task_id = uuid::Uuid::new_v4().to_string();

    let info = serde_json::to_value(&meta)
        .map_err(|e| JobError::Internal(format!("failed to encode task info: {e}")))?;
    state
        .store
        .store_task_info(&task_id, info)
        .map_err(JobError::from)?;
    state
        .store
        .store_task_status(&task_id, json!({ "status": states::QUEUED }))
        .map_err(JobError::from)?;

    info!("tarea {} registrada ({} {:?})", task_id, meta.kind, meta.name);
    Ok(Json(NewTaskResponse { task_id }))
}

// El ejecutor reporta un evento de estado
async fn push_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(event): Json<Value>,
) -> ApiResult<Json<Value>> {
    if !event.get("status").is_some_and(Value::is_string) {
        return Err(JobError::InvalidRequest(
            "status event must be an object with a string `status` field".to_string(),
        )
        .into());
    }

    if !state.store.contains(&task_id).map_err(JobError::from)? {
        return Err(JobError::NotFound(format!("Task {} not found", task_id)).into());
    }

    state
        .store
        .store_task_status(&task_id, event)
        .map_err(JobError::from)?;
    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app() -> (Router, AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            prgs_dir: dir.path().to_path_buf(),
            max_retries: 3,
        };
        let state = AppState::new(&config);
        (build_router(state.clone()), state, dir)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };

        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn ciclo_completo_de_una_tarea() {
        let (app, _state, _dir) = app();

        let (status, created) = call(
            &app,
            "POST",
            "/api/tasks",
            Some(json!({"type": "album", "name": "Y", "artist": "Z"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = created["task_id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            "POST",
            &format!("/api/tasks/{id}/status"),
            Some(json!({
                "status": "track_progress",
                "track": "Song A",
                "parsed_current_track": 3,
                "parsed_total_tracks": 10,
                "overall_progress": 30
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, view) = call(&app, "GET", &format!("/api/prgs/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["event"], "progress");
        assert_eq!(view["status_count"], 2);
        assert_eq!(view["progress_message"], "Downloading track 3/10 (30%): Song A");
        assert_eq!(view["track_number"], 3);
        assert_eq!(view["display_title"], "Y");

        let (_, list) = call(&app, "GET", "/api/prgs/list", None).await;
        assert_eq!(list, json!([id.clone()]));

        let (status, cancelled) = call(&app, "POST", &format!("/api/prgs/cancel/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cancelled["status"], "cancelled");

        let (status, deleted) = call(&app, "DELETE", &format!("/api/prgs/delete/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["message"], format!("Task {id} deleted successfully"));

        let (status, err) = call(&app, "GET", &format!("/api/prgs/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn tarea_recien_creada_no_tiene_categoria_sin_eventos() {
        let (app, state, _dir) = app();
        state.store.store_task_info("t1", json!({"name": "N"})).unwrap();

        let (status, view) = call(&app, "GET", "/api/prgs/t1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["last_line"], Value::Null);
        assert!(view.get("event").is_none());
        assert_eq!(view["status_count"], 0);
    }

    #[tokio::test]
    async fn legacy_retry_es_unsupported_y_no_internal() {
        let (app, _state, dir) = app();
        std::fs::write(dir.path().join("old.prg"), "{}\n").unwrap();

        let (status, err) = call(&app, "POST", "/api/prgs/retry/old.prg", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["status"], "error");
        assert_eq!(err["code"], "UNSUPPORTED_OPERATION");
    }

    #[tokio::test]
    async fn traversal_codificado_es_invalid_request() {
        let (app, _state, _dir) = app();

        let (status, err) = call(&app, "GET", "/api/prgs/..%2Fsecret", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "INVALID_REQUEST");

        let (status, _) = call(&app, "DELETE", "/api/prgs/delete/..%2Fsecret.prg", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn legacy_se_lee_y_se_lista() {
        let (app, _state, dir) = app();
        std::fs::write(
            dir.path().join("old.prg"),
            "{\"display_title\":\"X\"}\n{\"type\":\"album\",\"name\":\"Y\",\"artist\":\"Z\"}\n{\"status\":\"complete\"}\n",
        )
        .unwrap();

        let (status, view) = call(&app, "GET", "/api/prgs/old.prg", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["event"], "unknown");
        assert_eq!(view["display_title"], "X");
        assert_eq!(view["last_line"], json!({"status": "complete"}));

        let (_, list) = call(&app, "GET", "/api/prgs/list", None).await;
        assert_eq!(list, json!(["old.prg"]));
    }

    #[tokio::test]
    async fn push_status_valida_el_evento() {
        let (app, state, _dir) = app();
        state.store.store_task_info("t1", json!({})).unwrap();

        let (status, _) = call(&app, "POST", "/api/tasks/t1/status", Some(json!({"foo": 1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            "POST",
            "/api/tasks/missing/status",
            Some(json!({"status": "queued"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
