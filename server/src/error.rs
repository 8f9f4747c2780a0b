use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::gateway::GatewayError;

/// Errores que ve quien llama a la capa de estado.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GatewayError> for JobError {
    fn from(err: GatewayError) -> Self {
        // el detalle (claves del store) queda en el log, no en la respuesta
        error!("fallo en el gateway de tareas: {}", err);
        JobError::Internal("task store failure".to_string())
    }
}

/// Cuerpo JSON de una respuesta de error.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        let (status, code) = match &err {
            JobError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            JobError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            JobError::Unsupported(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_OPERATION"),
            JobError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            status: "error",
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_es_400_con_codigo_propio() {
        let err = ApiError::from(JobError::Unsupported("no".to_string()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "UNSUPPORTED_OPERATION");
        assert_eq!(err.message, "no");
    }

    #[test]
    fn gateway_error_se_vuelve_internal() {
        let err = JobError::from(GatewayError::Poisoned);
        assert!(matches!(err, JobError::Internal(_)));
        assert_eq!(ApiError::from(err).status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn record_corrupto_no_expone_la_clave_del_store() {
        let err = JobError::from(GatewayError::Corrupt("task:t1:status".to_string()));
        let api = ApiError::from(err);

        assert_eq!(api.code, "INTERNAL_ERROR");
        assert_eq!(api.message, "internal error: task store failure");
        assert!(!api.message.contains("task:"));
    }
}
