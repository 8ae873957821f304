//! Task lifecycle and the gated status transition.
//!
//! A transition reloads the task, evaluates the gate and writes the new
//! status in one transaction. The write only lands while the task still
//! carries the version that was evaluated. Otherwise the attempt is rolled
//! back and evaluated again against fresh state.

use db::{
    DbErr, TransactionTrait,
    entities::task as task_entity,
    models::{
        board_column::BoardColumn,
        ids,
        project::Project,
        project_member::ProjectMember,
        task::{CreateTask, Task, TaskWithDependencies, UpdateTask},
        user::User,
    },
    retry::{is_sqlite_busy, retry_on_sqlite_busy},
    types::{MemberRole, TaskStatus},
};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use tasks::{DbGateSource, GateDecision, GateError, GateTask, LockState, TaskGate};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    access::{self, AccessError},
    validation,
};

#[derive(Debug, Error)]
pub enum TaskServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error("{0}")]
    Validation(String),
    #[error("Task not found")]
    NotFound,
    #[error("{0}")]
    Locked(String),
    #[error("{0}")]
    Conflict(String),
}

impl TaskServiceError {
    /// SQLite refused the write because another connection holds or just
    /// released the write lock.
    fn is_write_contention(&self) -> bool {
        match self {
            TaskServiceError::Database(err)
            | TaskServiceError::Access(AccessError::Database(err))
            | TaskServiceError::Gate(GateError::Database(err)) => is_sqlite_busy(err),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskServiceError>;

#[derive(Debug, Clone, Serialize, TS)]
pub struct Board {
    pub tasks: Vec<Task>,
    pub columns: Vec<BoardColumn>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct UpdateTaskStatus {
    pub status: TaskStatus,
    /// Accepted for clients that send it. The gate does not read it.
    #[serde(default)]
    pub column_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct ReorderTask {
    pub order_index: i32,
    #[serde(default)]
    pub column_id: Option<Uuid>,
}

/// A gate decision tied to the task version it was made against.
#[derive(Debug, Clone)]
pub struct PreparedTransition {
    pub task: task_entity::Model,
    pub target: TaskStatus,
    pub decision: GateDecision,
}

impl PreparedTransition {
    pub fn is_noop(&self) -> bool {
        self.task.status == self.target
    }
}

#[derive(Clone)]
pub struct TaskService {
    max_attempts: u32,
}

impl Default for TaskService {
    fn default() -> Self {
        Self::new(3)
    }
}

impl TaskService {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    fn validate_title(title: &str) -> Result<String> {
        validation::bounded_text("title", title, 200).map_err(TaskServiceError::Validation)
    }

    async fn load_model<C: ConnectionTrait>(db: &C, task_id: Uuid) -> Result<task_entity::Model> {
        Task::find_model_by_id(db, task_id)
            .await?
            .ok_or(TaskServiceError::NotFound)
    }

    async fn load_for_member<C: ConnectionTrait>(
        db: &C,
        caller: &User,
        task_id: Uuid,
    ) -> Result<(task_entity::Model, MemberRole)> {
        let model = Self::load_model(db, task_id).await?;
        let role = access::project_role(db, model.project_id, caller.id).await?;
        Ok((model, role))
    }

    async fn gate_task<C: ConnectionTrait>(db: &C, model: &task_entity::Model) -> Result<GateTask> {
        let project_id = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(AccessError::ProjectNotFound)?;
        Ok(GateTask::from_model(model, project_id))
    }

    async fn refetch(pool: &db::DbPool, task_id: Uuid) -> Result<Task> {
        Task::find_by_id(pool, task_id)
            .await?
            .ok_or(TaskServiceError::NotFound)
    }

    pub async fn create_task(
        &self,
        pool: &db::DbPool,
        caller: &User,
        payload: CreateTask,
    ) -> Result<Task> {
        access::require_member(pool, payload.project_id, caller.id).await?;
        let title = Self::validate_title(&payload.title)?;

        if let Some(assignee_id) = payload.assignee_id
            && ProjectMember::role_of(pool, payload.project_id, assignee_id)
                .await?
                .is_none()
        {
            return Err(TaskServiceError::Validation(
                "assignee must be a member of the project".to_string(),
            ));
        }

        let data = CreateTask { title, ..payload };
        let tx = pool.begin().await?;
        let task = Task::create(&tx, &data, caller.id, Uuid::new_v4()).await?;
        let project_row_id = Project::row_id(&tx, data.project_id).await?;
        Project::touch(&tx, project_row_id).await?;
        tx.commit().await?;

        tracing::info!(
            task_id = %task.id,
            project_id = %task.project_id,
            status = %task.status,
            order_index = task.order_index,
            "created task"
        );
        Ok(task)
    }

    pub async fn get_task(
        &self,
        pool: &db::DbPool,
        caller: &User,
        task_id: Uuid,
    ) -> Result<TaskWithDependencies> {
        Self::load_for_member(pool, caller, task_id).await?;
        Task::with_dependencies(pool, task_id)
            .await?
            .ok_or(TaskServiceError::NotFound)
    }

    pub async fn list_board(
        &self,
        pool: &db::DbPool,
        caller: &User,
        project_id: Uuid,
    ) -> Result<Board> {
        access::require_member(pool, project_id, caller.id).await?;
        Ok(Board {
            tasks: Task::find_by_project_id(pool, project_id).await?,
            columns: BoardColumn::find_by_project_id(pool, project_id).await?,
        })
    }

    /// Edits descriptive fields. Status only changes through [`Self::update_task_status`].
    pub async fn update_task(
        &self,
        pool: &db::DbPool,
        caller: &User,
        task_id: Uuid,
        payload: UpdateTask,
    ) -> Result<Task> {
        Self::load_for_member(pool, caller, task_id).await?;
        let title = payload
            .title
            .as_deref()
            .map(Self::validate_title)
            .transpose()?;
        let data = &UpdateTask { title, ..payload };
        Ok(retry_on_sqlite_busy(move || Task::update(pool, task_id, data)).await?)
    }

    pub async fn delete_task(&self, pool: &db::DbPool, caller: &User, task_id: Uuid) -> Result<()> {
        Self::load_for_member(pool, caller, task_id).await?;
        let tx = pool.begin().await?;
        Task::delete(&tx, task_id).await?;
        tx.commit().await?;
        tracing::info!(task_id = %task_id, "deleted task");
        Ok(())
    }

    /// Writes the order index as given. Neighbours are not shifted.
    pub async fn reorder_task(
        &self,
        pool: &db::DbPool,
        caller: &User,
        task_id: Uuid,
        payload: ReorderTask,
    ) -> Result<Task> {
        Self::load_for_member(pool, caller, task_id).await?;
        let order_index =
            validation::order_index(payload.order_index).map_err(TaskServiceError::Validation)?;
        let task =
            retry_on_sqlite_busy(move || Task::set_order_index(pool, task_id, order_index)).await?;
        Ok(task)
    }

    /// Lock state of a task regardless of where it would move.
    pub async fn lock_state(
        &self,
        pool: &db::DbPool,
        caller: &User,
        task_id: Uuid,
    ) -> Result<LockState> {
        let (model, _) = Self::load_for_member(pool, caller, task_id).await?;
        let gate_task = Self::gate_task(pool, &model).await?;
        let source = DbGateSource::new(pool);
        Ok(TaskGate::lock_state(&source, &gate_task).await?)
    }

    /// Loads the task and decides whether it may move to `target`.
    pub async fn evaluate_transition<C>(
        db: &C,
        task_id: Uuid,
        target: TaskStatus,
    ) -> Result<PreparedTransition>
    where
        C: ConnectionTrait + Send + Sync,
    {
        let model = Self::load_model(db, task_id).await?;
        let gate_task = Self::gate_task(db, &model).await?;
        let source = DbGateSource::new(db);
        let decision = TaskGate::evaluate(&source, &gate_task, target).await?;
        Ok(PreparedTransition {
            task: model,
            target,
            decision,
        })
    }

    /// Persists an allowed transition. Returns `false` when the task moved on
    /// since it was evaluated and nothing was written.
    pub async fn commit_transition<C: ConnectionTrait>(
        db: &C,
        prepared: &PreparedTransition,
    ) -> Result<bool> {
        if let GateDecision::Blocked(reason) = &prepared.decision {
            return Err(TaskServiceError::Locked(reason.to_string()));
        }
        if prepared.is_noop() {
            return Ok(true);
        }
        let written = Task::update_status_if_version(
            db,
            prepared.task.id,
            prepared.task.version,
            prepared.target,
        )
        .await?;
        Ok(written == 1)
    }

    /// One reload, evaluate and write pass. `Ok(None)` means another writer
    /// moved the task after it was loaded and nothing was written.
    async fn try_transition(
        pool: &db::DbPool,
        caller: &User,
        task_id: Uuid,
        target: TaskStatus,
    ) -> Result<Option<PreparedTransition>> {
        let tx = pool.begin().await?;
        Self::load_for_member(&tx, caller, task_id).await?;

        let prepared = Self::evaluate_transition(&tx, task_id, target).await?;
        if let GateDecision::Blocked(reason) = &prepared.decision {
            tx.rollback().await?;
            return Err(TaskServiceError::Locked(reason.to_string()));
        }

        if !Self::commit_transition(&tx, &prepared).await? {
            tx.rollback().await?;
            return Ok(None);
        }
        if !prepared.is_noop() {
            Project::touch(&tx, prepared.task.project_id).await?;
        }
        tx.commit().await?;
        Ok(Some(prepared))
    }

    pub async fn update_task_status(
        &self,
        pool: &db::DbPool,
        caller: &User,
        task_id: Uuid,
        payload: UpdateTaskStatus,
    ) -> Result<Task> {
        for attempt in 1..=self.max_attempts {
            match Self::try_transition(pool, caller, task_id, payload.status).await {
                Ok(Some(prepared)) => {
                    if !prepared.is_noop() {
                        tracing::info!(
                            task_id = %task_id,
                            from = %prepared.task.status,
                            to = %prepared.target,
                            "task status updated"
                        );
                    }
                    return Self::refetch(pool, task_id).await;
                }
                Ok(None) => tracing::warn!(
                    task_id = %task_id,
                    attempt,
                    max_attempts = self.max_attempts,
                    "task changed during transition, re-evaluating"
                ),
                // A busy or stale-snapshot error leaves nothing written. The
                // transaction is already rolled back on drop.
                Err(err) if err.is_write_contention() => tracing::warn!(
                    task_id = %task_id,
                    attempt,
                    max_attempts = self.max_attempts,
                    error = %err,
                    "database busy during transition, re-evaluating"
                ),
                Err(err) => return Err(err),
            }
        }

        Err(TaskServiceError::Conflict(format!(
            "Task was modified concurrently; gave up after {} attempts",
            self.max_attempts
        )))
    }
}
