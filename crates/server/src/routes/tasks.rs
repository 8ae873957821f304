use axum::{
    Extension, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use db::models::{
    task::{CreateTask, Task, TaskWithDependencies, UpdateTask},
    task_dependency::{CreateTaskDependency, TaskDependency},
    user::User,
};
use services::services::task::{ReorderTask, UpdateTaskStatus};
use tasks::LockState;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, extract::ApiJson, middleware::load_task_middleware};

pub async fn create_task(
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .task_service()
        .await
        .create_task(&deployment.db().pool, &caller, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<TaskWithDependencies>>, ApiError> {
    let task = deployment
        .task_service()
        .await
        .get_task(&deployment.db().pool, &caller, task.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    Extension(task): Extension<Task>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .task_service()
        .await
        .update_task(&deployment.db().pool, &caller, task.id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    Extension(task): Extension<Task>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .task_service()
        .await
        .delete_task(&deployment.db().pool, &caller, task.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn update_task_status(
    Extension(task): Extension<Task>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<UpdateTaskStatus>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .task_service()
        .await
        .update_task_status(&deployment.db().pool, &caller, task.id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn reorder_task(
    Extension(task): Extension<Task>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<ReorderTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .task_service()
        .await
        .reorder_task(&deployment.db().pool, &caller, task.id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn get_lock_state(
    Extension(task): Extension<Task>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<LockState>>, ApiError> {
    let lock = deployment
        .task_service()
        .await
        .lock_state(&deployment.db().pool, &caller, task.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(lock)))
}

pub async fn add_dependency(
    Extension(task): Extension<Task>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<CreateTaskDependency>,
) -> Result<ResponseJson<ApiResponse<TaskDependency>>, ApiError> {
    let edge = deployment
        .dependency_service()
        .await
        .add_dependency(&deployment.db().pool, &caller, task.id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(edge)))
}

pub async fn remove_dependency(
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    Path((task_id, depends_on_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .dependency_service()
        .await
        .remove_dependency(&deployment.db().pool, &caller, task_id, depends_on_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .route("/status", put(update_task_status))
        .route("/order", put(reorder_task))
        .route("/lock", get(get_lock_state))
        .route("/dependencies", post(add_dependency))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_task_middleware::<Deployment>,
        ));

    let inner = Router::new()
        .route("/", post(create_task))
        .route(
            "/{task_id}/dependencies/{depends_on_id}",
            delete(remove_dependency),
        )
        .nest("/{task_id}", task_id_router);

    Router::new().nest("/tasks", inner)
}
