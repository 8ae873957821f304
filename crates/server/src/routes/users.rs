use axum::{
    Extension, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::{CreateUser, User};
use services::services::user::UserService;
use utils::response::ApiResponse;

use crate::{Deployment, error::ApiError, extract::ApiJson};

pub async fn register_user(
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<CreateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = UserService::new()
        .register(&deployment.db().pool, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn current_user(
    Extension(caller): Extension<User>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(caller)))
}

/// Registration is reachable without a caller identity.
pub fn public_router() -> Router<Deployment> {
    Router::new().route("/users", post(register_user))
}

pub fn router() -> Router<Deployment> {
    Router::new().route("/users/me", get(current_user))
}
