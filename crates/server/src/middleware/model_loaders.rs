use std::{fmt::Display, future::Future};

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use db::{
    DBService,
    models::{board_column::BoardColumn, project::Project, task::Task},
};
use uuid::Uuid;

use crate::{Deployment, error::ApiError};

pub trait ModelLoaderDeps {
    fn db_service(&self) -> &DBService;
}

impl ModelLoaderDeps for Deployment {
    fn db_service(&self) -> &DBService {
        self.db()
    }
}

async fn fetch_model_or_error<M, E, Fut>(
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<M, ApiError>
where
    E: Display + Into<ApiError>,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    match load_future.await {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            tracing::warn!("{model_name} {model_id} not found");
            Err(ApiError::NotFound(format!("{model_name} not found")))
        }
        Err(error) => {
            tracing::error!("Failed to fetch {model_name} {model_id}: {error}");
            Err(error.into())
        }
    }
}

async fn load_request_extension<M, E, Fut>(
    request: Request,
    next: Next,
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<Response, ApiError>
where
    M: Clone + Send + Sync + 'static,
    E: Display + Into<ApiError>,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    let model = fetch_model_or_error(model_name, model_id, load_future).await?;
    let mut request = request;
    request.extensions_mut().insert(model);
    Ok(next.run(request).await)
}

pub async fn load_project_middleware<S>(
    State(deployment): State<S>,
    Path(project_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "Project",
        project_id,
        Project::find_by_id(&deployment.db_service().pool, project_id),
    )
    .await
}

pub async fn load_task_middleware<S>(
    State(deployment): State<S>,
    Path(task_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "Task",
        task_id,
        Task::find_by_id(&deployment.db_service().pool, task_id),
    )
    .await
}

pub async fn load_column_middleware<S>(
    State(deployment): State<S>,
    Path(column_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "Column",
        column_id,
        BoardColumn::find_by_id(&deployment.db_service().pool, column_id),
    )
    .await
}
