use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::DbErr;
use services::services::{
    access::AccessError, column::ColumnServiceError, config::ConfigError,
    dependency::DependencyServiceError, project::ProjectServiceError, task::TaskServiceError,
    user::UserServiceError,
};
use tasks::GateError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    TaskLocked(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Database(DbErr::RecordNotFound(_))
            | ApiError::Gate(GateError::Database(DbErr::RecordNotFound(_))) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            ApiError::Database(_) | ApiError::Gate(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            ApiError::Config(err) => match err {
                ConfigError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            ApiError::Access(err) => match err {
                AccessError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
                AccessError::ProjectNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                AccessError::NotMember | AccessError::InsufficientRole(_) => {
                    (StatusCode::FORBIDDEN, "PERMISSION_ERROR")
                }
            },
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "PERMISSION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::TaskLocked(_) => (StatusCode::BAD_REQUEST, "TASK_LOCKED"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = self.status_and_code();

        let error_message = if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let response = ApiResponse::<()>::error(error_type, &error_message);
        (status_code, Json(response)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::Database(db_err) => ApiError::Database(db_err),
            UserServiceError::Validation(msg) => ApiError::BadRequest(msg),
            err @ UserServiceError::EmailTaken(_) => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<ProjectServiceError> for ApiError {
    fn from(err: ProjectServiceError) -> Self {
        match err {
            ProjectServiceError::Database(db_err) => ApiError::Database(db_err),
            ProjectServiceError::Access(access_err) => ApiError::Access(access_err),
            ProjectServiceError::Validation(msg) => ApiError::BadRequest(msg),
            ProjectServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ProjectServiceError::Conflict(msg) => ApiError::Conflict(msg),
            err @ ProjectServiceError::OwnerNotRemovable => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<ColumnServiceError> for ApiError {
    fn from(err: ColumnServiceError) -> Self {
        match err {
            ColumnServiceError::Database(db_err) => ApiError::Database(db_err),
            ColumnServiceError::Access(access_err) => ApiError::Access(access_err),
            ColumnServiceError::Validation(msg) => ApiError::BadRequest(msg),
            ColumnServiceError::NotFound(msg) => ApiError::NotFound(msg),
        }
    }
}

impl From<TaskServiceError> for ApiError {
    fn from(err: TaskServiceError) -> Self {
        match err {
            TaskServiceError::Database(db_err) => ApiError::Database(db_err),
            TaskServiceError::Access(access_err) => ApiError::Access(access_err),
            TaskServiceError::Gate(gate_err) => ApiError::Gate(gate_err),
            TaskServiceError::Validation(msg) => ApiError::BadRequest(msg),
            err @ TaskServiceError::NotFound => ApiError::NotFound(err.to_string()),
            TaskServiceError::Locked(reason) => ApiError::TaskLocked(reason),
            TaskServiceError::Conflict(msg) => ApiError::Conflict(msg),
        }
    }
}

impl From<DependencyServiceError> for ApiError {
    fn from(err: DependencyServiceError) -> Self {
        match err {
            DependencyServiceError::Database(db_err) => ApiError::Database(db_err),
            DependencyServiceError::Access(access_err) => ApiError::Access(access_err),
            DependencyServiceError::Validation(msg) => ApiError::BadRequest(msg),
            DependencyServiceError::NotFound(msg) => ApiError::NotFound(msg),
            err @ DependencyServiceError::Duplicate => ApiError::Conflict(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn locked_transitions_carry_the_reason() {
        let (status, json) = body_of(ApiError::from(TaskServiceError::Locked(
            "must first complete «Design»".to_string(),
        )))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "TASK_LOCKED");
        assert_eq!(json["error"]["message"], "must first complete «Design»");
    }

    #[tokio::test]
    async fn access_errors_map_to_permission_and_not_found() {
        let (status, json) = body_of(AccessError::NotMember.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"]["code"], "PERMISSION_ERROR");

        let (status, json) = body_of(AccessError::ProjectNotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn database_failures_hide_details() {
        let (status, json) = body_of(ApiError::Database(DbErr::Custom(
            "disk I/O error".to_string(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"]["message"], "Internal server error");
    }

    #[tokio::test]
    async fn gate_lookups_of_missing_projects_are_not_found() {
        let (status, json) = body_of(ApiError::from(TaskServiceError::Gate(
            GateError::Database(DbErr::RecordNotFound("Project not found".to_string())),
        )))
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn duplicates_are_conflicts() {
        let (status, json) = body_of(DependencyServiceError::Duplicate.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "CONFLICT");
    }
}
