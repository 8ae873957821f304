use axum::{
    Extension, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, put},
};
use db::models::{
    board_column::{BoardColumn, ColumnPosition, CreateBoardColumn},
    project::{CreateProject, Project, ProjectSummary, UpdateProject},
    project_member::{AddProjectMember, ProjectMember},
    user::User,
};
use serde::Deserialize;
use services::services::{
    column::ColumnService,
    project::{ProjectDetails, ProjectService},
    task::Board,
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    Deployment, error::ApiError, extract::ApiJson, middleware::load_project_middleware,
};

#[derive(Debug, Deserialize, TS)]
pub struct ReorderColumns {
    pub columns: Vec<ColumnPosition>,
}

pub async fn get_projects(
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectSummary>>>, ApiError> {
    let projects = ProjectService::new()
        .list_projects(&deployment.db().pool, &caller)
        .await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn create_project(
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<CreateProject>,
) -> Result<ResponseJson<ApiResponse<ProjectDetails>>, ApiError> {
    let project = ProjectService::new()
        .create_project(&deployment.db().pool, &caller, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn get_project(
    Extension(project): Extension<Project>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<ProjectDetails>>, ApiError> {
    let details = ProjectService::new()
        .get_project(&deployment.db().pool, &caller, project.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

pub async fn update_project(
    Extension(project): Extension<Project>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let project = ProjectService::new()
        .update_project(&deployment.db().pool, &caller, project.id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn delete_project(
    Extension(project): Extension<Project>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ProjectService::new()
        .delete_project(&deployment.db().pool, &caller, project.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_members(
    Extension(project): Extension<Project>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectMember>>>, ApiError> {
    let members = ProjectService::new()
        .list_members(&deployment.db().pool, &caller, project.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

pub async fn add_member(
    Extension(project): Extension<Project>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<AddProjectMember>,
) -> Result<ResponseJson<ApiResponse<ProjectMember>>, ApiError> {
    let member = ProjectService::new()
        .add_member(&deployment.db().pool, &caller, project.id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(member)))
}

pub async fn remove_member(
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ProjectService::new()
        .remove_member(&deployment.db().pool, &caller, project_id, user_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_columns(
    Extension(project): Extension<Project>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<BoardColumn>>>, ApiError> {
    let columns = ColumnService::new()
        .list_columns(&deployment.db().pool, &caller, project.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(columns)))
}

pub async fn create_column(
    Extension(project): Extension<Project>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<CreateBoardColumn>,
) -> Result<ResponseJson<ApiResponse<BoardColumn>>, ApiError> {
    let column = ColumnService::new()
        .create_column(&deployment.db().pool, &caller, project.id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(column)))
}

pub async fn reorder_columns(
    Extension(project): Extension<Project>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
    ApiJson(payload): ApiJson<ReorderColumns>,
) -> Result<ResponseJson<ApiResponse<Vec<BoardColumn>>>, ApiError> {
    let columns = ColumnService::new()
        .reorder_columns(&deployment.db().pool, &caller, project.id, payload.columns)
        .await?;
    Ok(ResponseJson(ApiResponse::success(columns)))
}

pub async fn get_board(
    Extension(project): Extension<Project>,
    Extension(caller): Extension<User>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    let board = deployment
        .task_service()
        .await
        .list_board(&deployment.db().pool, &caller, project.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(board)))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let project_id_router = Router::new()
        .route(
            "/",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/members", get(get_members).post(add_member))
        .route("/columns", get(get_columns).post(create_column))
        .route("/columns/reorder", put(reorder_columns))
        .route("/tasks", get(get_board))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_project_middleware::<Deployment>,
        ));

    let projects_router = Router::new()
        .route("/", get(get_projects).post(create_project))
        .route("/{project_id}/members/{user_id}", delete(remove_member))
        .nest("/{project_id}", project_id_router);

    Router::new().nest("/projects", projects_router)
}
