use axum::{
    Extension, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::put,
};
use db::models::{
    board_column::{BoardColumn, UpdateBoardColumn},
    user::User,
};
use services::services::column::ColumnService;
use utils::response::ApiResponse;

use crate::{Deployment, error::ApiError, extract::ApiJson, middleware::load_column_middleware};

pub async fn update_column(
    Extension(column): Extension<BoardColumn>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<UpdateBoardColumn>,
) -> Result<ResponseJson<ApiResponse<BoardColumn>>, ApiError> {
    let column = ColumnService::new()
        .update_column(&deployment.db().pool, &caller, column.id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(column)))
}

pub async fn delete_column(
    Extension(column): Extension<BoardColumn>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ColumnService::new()
        .delete_column(&deployment.db().pool, &caller, column.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let column_id_router = Router::new()
        .route("/", put(update_column).delete(delete_column))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_column_middleware::<Deployment>,
        ));

    Router::new().nest("/columns/{column_id}", column_id_router)
}
