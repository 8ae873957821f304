//! Decides whether a task may move to another workflow status.
//!
//! Two checks run in a fixed order and the first denial wins:
//!
//! 1. Column lock. The column whose `order_index` equals the task's
//!    `order_index` is looked up. When it is locked, the unfinished task of
//!    the same project with the largest smaller `order_index` blocks.
//! 2. Dependencies. The first direct dependency that is not done blocks.
//!    Dependencies of dependencies are never consulted.
//!
//! The gate only reads. Persisting an allowed transition is up to the caller.

use std::fmt;

use async_trait::async_trait;
use db::{DbErr, types::TaskStatus};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// The fields of a task the gate reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateTask {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLock {
    pub name: String,
    pub order_index: i32,
    pub is_locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct TaskRef {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// An earlier task in the project is not done and the column is locked.
    Predecessor(TaskRef),
    Dependency(TaskRef),
}

impl BlockReason {
    pub fn blocker(&self) -> &TaskRef {
        match self {
            BlockReason::Predecessor(task) | BlockReason::Dependency(task) => task,
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::Predecessor(task) => write!(f, "must first complete «{}»", task.title),
            BlockReason::Dependency(task) => {
                write!(f, "must first complete dependency «{}»", task.title)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Blocked(BlockReason),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }

    pub fn reason(&self) -> Option<&BlockReason> {
        match self {
            GateDecision::Allowed => None,
            GateDecision::Blocked(reason) => Some(reason),
        }
    }
}

/// Lock state of a card, as shown before the user tries to move it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct LockState {
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<GateDecision> for LockState {
    fn from(decision: GateDecision) -> Self {
        match decision {
            GateDecision::Allowed => LockState {
                locked: false,
                reason: None,
            },
            GateDecision::Blocked(reason) => LockState {
                locked: true,
                reason: Some(reason.to_string()),
            },
        }
    }
}

/// Read access to the board state the gate depends on.
#[async_trait]
pub trait GateSource: Send + Sync {
    async fn columns(&self, project_id: Uuid) -> Result<Vec<ColumnLock>, GateError>;

    /// The unfinished task of the project with the largest `order_index`
    /// strictly below `order_index`.
    async fn nearest_unfinished_predecessor(
        &self,
        project_id: Uuid,
        order_index: i32,
    ) -> Result<Option<TaskRef>, GateError>;

    /// Direct dependencies of the task that are not done, in lookup order.
    async fn blocking_dependencies(&self, task_id: Uuid) -> Result<Vec<TaskRef>, GateError>;
}

/// Finds the column a task is gated by.
///
/// Task order indices are scoped per status lane while column indices are
/// scoped per project; the two are compared as plain integers.
pub fn column_for_task<'a>(columns: &'a [ColumnLock], task: &GateTask) -> Option<&'a ColumnLock> {
    columns
        .iter()
        .find(|column| column.order_index == task.order_index)
}

pub struct TaskGate;

impl TaskGate {
    /// Decides a transition of `task` to `target`. Moving to the current
    /// status is always allowed and reads nothing.
    pub async fn evaluate<S>(
        source: &S,
        task: &GateTask,
        target: TaskStatus,
    ) -> Result<GateDecision, GateError>
    where
        S: GateSource + ?Sized,
    {
        if task.status == target {
            return Ok(GateDecision::Allowed);
        }
        let decision = Self::check(source, task).await?;
        if let GateDecision::Blocked(reason) = &decision {
            tracing::info!(
                task_id = %task.id,
                from = %task.status,
                to = %target,
                "transition blocked: {reason}"
            );
        }
        Ok(decision)
    }

    /// Runs both checks regardless of any target status.
    pub async fn lock_state<S>(source: &S, task: &GateTask) -> Result<LockState, GateError>
    where
        S: GateSource + ?Sized,
    {
        Ok(Self::check(source, task).await?.into())
    }

    async fn check<S>(source: &S, task: &GateTask) -> Result<GateDecision, GateError>
    where
        S: GateSource + ?Sized,
    {
        let columns = source.columns(task.project_id).await?;
        if column_for_task(&columns, task).is_some_and(|column| column.is_locked)
            && let Some(predecessor) = source
                .nearest_unfinished_predecessor(task.project_id, task.order_index)
                .await?
        {
            return Ok(GateDecision::Blocked(BlockReason::Predecessor(predecessor)));
        }

        let blocking = source.blocking_dependencies(task.id).await?;
        if let Some(first) = blocking.into_iter().next() {
            return Ok(GateDecision::Blocked(BlockReason::Dependency(first)));
        }

        Ok(GateDecision::Allowed)
    }
}
