use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

pub use crate::types::{TaskPriority, TaskStatus};
use crate::{
    entities::{task, task_dependency},
    models::{ids, ordering, task_dependency::TaskDependency},
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub order_index: i32,
    pub assignee_id: Option<Uuid>,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_by_id: Uuid,
    pub version: i64,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

/// The slice of a task shown next to another task's dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct TaskSummary {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
}

impl From<&task::Model> for TaskSummary {
    fn from(model: &task::Model) -> Self {
        Self {
            id: model.uuid,
            title: model.title.clone(),
            status: model.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct TaskWithDependencies {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub dependencies: Vec<TaskSummary>,
    pub dependents: Vec<TaskSummary>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateTask {
    pub fn from_title(project_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            project_id,
            title: title.into(),
            description: None,
            status: None,
            priority: None,
            assignee_id: None,
            due_date: None,
        }
    }
}

/// Editable task fields. Status is only changed through the gated transition.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    pub async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let project_id = ids::require_project_uuid(db, model.project_id).await?;
        let assignee_id = match model.assignee_id {
            Some(id) => Some(ids::require_user_uuid(db, id).await?),
            None => None,
        };
        let created_by_id = ids::require_user_uuid(db, model.created_by_id).await?;

        Ok(Self {
            id: model.uuid,
            project_id,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            order_index: model.order_index,
            assignee_id,
            due_date: model.due_date.map(Into::into),
            created_by_id,
            version: model.version,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_model_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<task::Model>, DbErr> {
        task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        match Self::find_model_by_id(db, id).await? {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Tasks of a project in ascending order index.
    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let project_row_id = ids::require_project_id(db, project_id).await?;
        let models = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .order_by_asc(task::Column::OrderIndex)
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    pub async fn with_dependencies<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<TaskWithDependencies>, DbErr> {
        let Some(model) = Self::find_model_by_id(db, id).await? else {
            return Ok(None);
        };
        let row_id = model.id;
        let task = Self::from_model(db, model).await?;
        let dependencies = TaskDependency::dependencies_of(db, row_id).await?;
        let dependents = TaskDependency::dependents_of(db, row_id).await?;
        Ok(Some(TaskWithDependencies {
            task,
            dependencies,
            dependents,
        }))
    }

    /// Inserts the task at the end of its status lane.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTask,
        created_by: Uuid,
        task_id: Uuid,
    ) -> Result<Self, DbErr> {
        let project_row_id = ids::require_project_id(db, data.project_id).await?;
        let created_by_row_id = ids::user_id_by_uuid(db, created_by)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        let assignee_row_id = match data.assignee_id {
            Some(id) => Some(
                ids::user_id_by_uuid(db, id)
                    .await?
                    .ok_or(DbErr::RecordNotFound("User not found".to_string()))?,
            ),
            None => None,
        };

        let status = data.status.unwrap_or_default();
        let order_index = ordering::next_task_order_index(db, project_row_id, status).await?;

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            project_id: Set(project_row_id),
            title: Set(data.title.trim().to_string()),
            description: Set(data.description.clone()),
            status: Set(status),
            priority: Set(data.priority.unwrap_or_default()),
            order_index: Set(order_index),
            assignee_id: Set(assignee_row_id),
            due_date: Set(data.due_date.map(Into::into)),
            created_by_id: Set(created_by_row_id),
            version: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateTask,
    ) -> Result<Self, DbErr> {
        let record = Self::find_model_by_id(db, id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let mut active: task::ActiveModel = record.into();
        if let Some(title) = payload.title.as_ref() {
            active.title = Set(title.trim().to_string());
        }
        if payload.description.is_some() {
            active.description = Set(payload.description.clone());
        }
        if let Some(priority) = payload.priority {
            active.priority = Set(priority);
        }
        if let Some(due_date) = payload.due_date {
            active.due_date = Set(Some(due_date.into()));
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    /// Sets the order index directly. Ties with sibling tasks are allowed.
    pub async fn set_order_index<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        order_index: i32,
    ) -> Result<Self, DbErr> {
        let record = Self::find_model_by_id(db, id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let mut active: task::ActiveModel = record.into();
        active.order_index = Set(order_index);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    /// Writes the status only if the row still carries `expected_version`,
    /// bumping the version. Returns the number of rows written (0 or 1).
    ///
    /// Busy errors are returned as is. Inside a transaction they mean the
    /// snapshot is stale, so the caller has to start over.
    pub async fn update_status_if_version<C: ConnectionTrait>(
        db: &C,
        row_id: i64,
        expected_version: i64,
        status: TaskStatus,
    ) -> Result<u64, DbErr> {
        let result = task::Entity::update_many()
            .col_expr(task::Column::Status, Expr::value(status))
            .col_expr(
                task::Column::Version,
                Expr::col(task::Column::Version).add(1),
            )
            .col_expr(task::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(task::Column::Id.eq(row_id))
            .filter(task::Column::Version.eq(expected_version))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Removes the task and every dependency edge touching it.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let Some(row_id) = ids::task_id_by_uuid(db, id).await? else {
            return Ok(0);
        };

        task_dependency::Entity::delete_many()
            .filter(
                task_dependency::Column::TaskId
                    .eq(row_id)
                    .or(task_dependency::Column::DependsOnId.eq(row_id)),
            )
            .exec(db)
            .await?;

        let result = task::Entity::delete_many()
            .filter(task::Column::Id.eq(row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::{
        project::{CreateProject, Project},
        user::{CreateUser, User},
    };

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed(db: &sea_orm::DatabaseConnection) -> (Uuid, Uuid) {
        let owner = User::create(
            db,
            &CreateUser {
                email: "owner@example.com".to_string(),
                name: "Owner".to_string(),
                avatar_url: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let project_id = Uuid::new_v4();
        Project::create(
            db,
            &CreateProject {
                name: "Board".to_string(),
                description: None,
            },
            owner.id,
            project_id,
        )
        .await
        .unwrap();
        (owner.id, project_id)
    }

    async fn create_task(
        db: &sea_orm::DatabaseConnection,
        project_id: Uuid,
        owner: Uuid,
        title: &str,
    ) -> Task {
        Task::create(db, &CreateTask::from_title(project_id, title), owner, Uuid::new_v4())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn order_index_is_appended_per_status_lane() {
        let db = setup_db().await;
        let (owner, project_id) = seed(&db).await;

        let design = create_task(&db, project_id, owner, "Design").await;
        let build = create_task(&db, project_id, owner, "Build").await;
        let mut review = CreateTask::from_title(project_id, "Review notes");
        review.status = Some(TaskStatus::Review);
        let review = Task::create(&db, &review, owner, Uuid::new_v4()).await.unwrap();

        assert_eq!(design.order_index, 0);
        assert_eq!(build.order_index, 1);
        assert_eq!(review.order_index, 0);
        assert_eq!(design.status, TaskStatus::Backlog);
        assert_eq!(design.priority, TaskPriority::Medium);
        assert_eq!(design.version, 0);
    }

    #[tokio::test]
    async fn conditional_status_write_rejects_stale_versions() {
        let db = setup_db().await;
        let (owner, project_id) = seed(&db).await;
        let task = create_task(&db, project_id, owner, "Design").await;
        let row_id = ids::task_id_by_uuid(&db, task.id).await.unwrap().unwrap();

        let written = Task::update_status_if_version(&db, row_id, 0, TaskStatus::Ready)
            .await
            .unwrap();
        assert_eq!(written, 1);

        let stale = Task::update_status_if_version(&db, row_id, 0, TaskStatus::Done)
            .await
            .unwrap();
        assert_eq!(stale, 0);

        let reloaded = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, TaskStatus::Ready);
        assert_eq!(reloaded.version, 1);
    }

    #[tokio::test]
    async fn update_leaves_status_and_order_alone() {
        let db = setup_db().await;
        let (owner, project_id) = seed(&db).await;
        let task = create_task(&db, project_id, owner, "Draft").await;

        let updated = Task::update(
            &db,
            task.id,
            &UpdateTask {
                title: Some("  Final  ".to_string()),
                priority: Some(TaskPriority::Urgent),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.title, "Final");
        assert_eq!(updated.priority, TaskPriority::Urgent);
        assert_eq!(updated.status, task.status);
        assert_eq!(updated.order_index, task.order_index);
    }

    #[tokio::test]
    async fn delete_cascades_incident_edges() {
        let db = setup_db().await;
        let (owner, project_id) = seed(&db).await;
        let a = create_task(&db, project_id, owner, "A").await;
        let b = create_task(&db, project_id, owner, "B").await;
        let c = create_task(&db, project_id, owner, "C").await;
        let a_row = ids::task_id_by_uuid(&db, a.id).await.unwrap().unwrap();
        let b_row = ids::task_id_by_uuid(&db, b.id).await.unwrap().unwrap();
        let c_row = ids::task_id_by_uuid(&db, c.id).await.unwrap().unwrap();
        TaskDependency::create(&db, a_row, b_row).await.unwrap();
        TaskDependency::create(&db, b_row, c_row).await.unwrap();

        assert_eq!(Task::delete(&db, b.id).await.unwrap(), 1);

        assert!(TaskDependency::dependencies_of(&db, a_row).await.unwrap().is_empty());
        assert!(TaskDependency::dependents_of(&db, c_row).await.unwrap().is_empty());
    }
}
