use db::{
    DbErr, TransactionTrait,
    models::{
        task::Task,
        task_dependency::{CreateTaskDependency, TaskDependency},
        user::User,
    },
};
use sea_orm::SqlErr;
use tasks::cycle::{DbDependencyEdges, would_create_cycle};
use thiserror::Error;
use uuid::Uuid;

use super::{
    access::{self, AccessError},
    config::DependencyPolicy,
};

#[derive(Debug, Error)]
pub enum DependencyServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Dependency already exists")]
    Duplicate,
}

pub type Result<T> = std::result::Result<T, DependencyServiceError>;

#[derive(Clone, Default)]
pub struct DependencyService {
    policy: DependencyPolicy,
}

impl DependencyService {
    pub fn new(policy: DependencyPolicy) -> Self {
        Self { policy }
    }

    /// Records that `task_id` cannot progress until `payload.depends_on_id` is done.
    pub async fn add_dependency(
        &self,
        pool: &db::DbPool,
        caller: &User,
        task_id: Uuid,
        payload: CreateTaskDependency,
    ) -> Result<TaskDependency> {
        let depends_on_id = payload.depends_on_id;
        if task_id == depends_on_id {
            return Err(DependencyServiceError::Validation(
                "A task cannot depend on itself".to_string(),
            ));
        }

        let tx = pool.begin().await?;
        let task = Task::find_model_by_id(&tx, task_id)
            .await?
            .ok_or_else(|| DependencyServiceError::NotFound("Task not found".to_string()))?;
        let depends_on = Task::find_model_by_id(&tx, depends_on_id)
            .await?
            .ok_or_else(|| {
                DependencyServiceError::NotFound("Dependency task not found".to_string())
            })?;

        access::project_role(&tx, task.project_id, caller.id).await?;

        if task.project_id != depends_on.project_id {
            return Err(DependencyServiceError::Validation(
                "Dependencies must stay within one project".to_string(),
            ));
        }
        if TaskDependency::exists(&tx, task.id, depends_on.id).await? {
            return Err(DependencyServiceError::Duplicate);
        }

        if self.policy.reject_cycles {
            let edges = DbDependencyEdges::new(&tx);
            if would_create_cycle(
                &edges,
                task.id,
                depends_on.id,
                self.policy.max_cycle_search_depth,
            )
            .await?
            {
                return Err(DependencyServiceError::Validation(format!(
                    "«{}» already depends on «{}»",
                    depends_on.title, task.title
                )));
            }
        }

        let edge = TaskDependency::create(&tx, task.id, depends_on.id)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => DependencyServiceError::Duplicate,
                _ => err.into(),
            })?;
        tx.commit().await?;

        tracing::info!(
            task_id = %task_id,
            depends_on_id = %depends_on_id,
            "added task dependency"
        );
        Ok(edge)
    }

    pub async fn remove_dependency(
        &self,
        pool: &db::DbPool,
        caller: &User,
        task_id: Uuid,
        depends_on_id: Uuid,
    ) -> Result<()> {
        let task = Task::find_model_by_id(pool, task_id)
            .await?
            .ok_or_else(|| DependencyServiceError::NotFound("Task not found".to_string()))?;
        access::project_role(pool, task.project_id, caller.id).await?;

        let not_found = || DependencyServiceError::NotFound("Dependency not found".to_string());
        let depends_on = Task::find_model_by_id(pool, depends_on_id)
            .await?
            .ok_or_else(not_found)?;
        if TaskDependency::delete(pool, task.id, depends_on.id).await? == 0 {
            return Err(not_found());
        }

        tracing::info!(
            task_id = %task_id,
            depends_on_id = %depends_on_id,
            "removed task dependency"
        );
        Ok(())
    }
}
