//! In-memory board for evaluating the gate without a database.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use db::types::TaskStatus;
use uuid::Uuid;

use crate::gate::{ColumnLock, GateError, GateSource, GateTask, TaskRef};

#[derive(Debug, Default)]
pub struct BoardSnapshot {
    project_id: Uuid,
    columns: Vec<ColumnLock>,
    tasks: Vec<GateTask>,
    edges: Vec<(Uuid, Uuid)>,
    reads: AtomicUsize,
}

impl BoardSnapshot {
    pub fn new(project_id: Uuid) -> Self {
        Self {
            project_id,
            ..Default::default()
        }
    }

    pub fn push_column(&mut self, name: &str, order_index: i32, is_locked: bool) {
        self.columns.push(ColumnLock {
            name: name.to_string(),
            order_index,
            is_locked,
        });
    }

    pub fn push_task(&mut self, title: &str, status: TaskStatus, order_index: i32) -> GateTask {
        let task = GateTask {
            id: Uuid::new_v4(),
            project_id: self.project_id,
            title: title.to_string(),
            status,
            order_index,
        };
        self.tasks.push(task.clone());
        task
    }

    pub fn add_dependency(&mut self, task_id: Uuid, depends_on_id: Uuid) {
        self.edges.push((task_id, depends_on_id));
    }

    pub fn set_status(&mut self, task_id: Uuid, status: TaskStatus) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) {
            task.status = status;
        }
    }

    /// Current state of the task titled `title`.
    pub fn task(&self, title: &str) -> Option<GateTask> {
        self.tasks.iter().find(|t| t.title == title).cloned()
    }

    /// Number of source calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn task_ref(task: &GateTask) -> TaskRef {
        TaskRef {
            id: task.id,
            title: task.title.clone(),
        }
    }
}

#[async_trait]
impl GateSource for BoardSnapshot {
    async fn columns(&self, project_id: Uuid) -> Result<Vec<ColumnLock>, GateError> {
        self.record_read();
        if project_id != self.project_id {
            return Ok(Vec::new());
        }
        Ok(self.columns.clone())
    }

    async fn nearest_unfinished_predecessor(
        &self,
        project_id: Uuid,
        order_index: i32,
    ) -> Result<Option<TaskRef>, GateError> {
        self.record_read();
        let mut candidates: Vec<&GateTask> = self
            .tasks
            .iter()
            .filter(|t| {
                t.project_id == project_id
                    && t.order_index < order_index
                    && t.status != TaskStatus::Done
            })
            .collect();
        candidates.sort_by(|a, b| b.order_index.cmp(&a.order_index));
        Ok(candidates.first().map(|t| Self::task_ref(t)))
    }

    async fn blocking_dependencies(&self, task_id: Uuid) -> Result<Vec<TaskRef>, GateError> {
        self.record_read();
        Ok(self
            .edges
            .iter()
            .filter(|(from, _)| *from == task_id)
            .filter_map(|(_, to)| self.tasks.iter().find(|t| t.id == *to))
            .filter(|t| t.status != TaskStatus::Done)
            .map(Self::task_ref)
            .collect())
    }
}
