use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use db::models::user::User;
use uuid::Uuid;

use crate::{Deployment, error::ApiError};

/// Header carrying the caller's user id, asserted by the gateway in front of us.
pub const USER_ID_HEADER: &str = "x-user-id";

fn caller_id(req: &Request) -> Result<Uuid, ApiError> {
    let raw = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing X-User-Id header".to_string()))?;
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::Unauthorized("X-User-Id is not a valid user id".to_string()))
}

/// Resolves the caller and stores it as a `User` request extension.
pub async fn require_caller(
    State(deployment): State<Deployment>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = caller_id(&req).inspect_err(|_| {
        tracing::warn!(
            path = %req.uri().path(),
            method = %req.method(),
            "request without caller identity"
        );
    })?;

    let Some(user) = User::find_by_id(&deployment.db().pool, user_id).await? else {
        tracing::warn!(user_id = %user_id, "request from unknown user");
        return Err(ApiError::Unauthorized("Unknown user".to_string()));
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
