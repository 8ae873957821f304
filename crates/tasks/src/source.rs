use async_trait::async_trait;
use db::{
    DbErr,
    entities::{board_column, task},
    models::{ids, task_dependency::TaskDependency},
    types::TaskStatus,
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::gate::{ColumnLock, GateError, GateSource, GateTask, TaskRef};

impl GateTask {
    pub fn from_model(model: &task::Model, project_id: Uuid) -> Self {
        Self {
            id: model.uuid,
            project_id,
            title: model.title.clone(),
            status: model.status,
            order_index: model.order_index,
        }
    }
}

/// Reads gate inputs straight from the database on every call.
pub struct DbGateSource<'a, C> {
    db: &'a C,
}

impl<'a, C> DbGateSource<'a, C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    async fn project_row_id(&self, project_id: Uuid) -> Result<i64, GateError> {
        ids::project_id_by_uuid(self.db, project_id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("Project not found".to_string()).into())
    }
}

#[async_trait]
impl<C> GateSource for DbGateSource<'_, C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn columns(&self, project_id: Uuid) -> Result<Vec<ColumnLock>, GateError> {
        let project_row_id = self.project_row_id(project_id).await?;
        let models = board_column::Entity::find()
            .filter(board_column::Column::ProjectId.eq(project_row_id))
            .order_by_asc(board_column::Column::OrderIndex)
            .order_by_asc(board_column::Column::Id)
            .all(self.db)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| ColumnLock {
                name: model.name,
                order_index: model.order_index,
                is_locked: model.is_locked,
            })
            .collect())
    }

    async fn nearest_unfinished_predecessor(
        &self,
        project_id: Uuid,
        order_index: i32,
    ) -> Result<Option<TaskRef>, GateError> {
        let project_row_id = self.project_row_id(project_id).await?;
        let nearest = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .filter(task::Column::OrderIndex.lt(order_index))
            .filter(task::Column::Status.ne(TaskStatus::Done))
            .order_by_desc(task::Column::OrderIndex)
            .order_by_asc(task::Column::Id)
            .one(self.db)
            .await?;
        Ok(nearest.map(|model| TaskRef {
            id: model.uuid,
            title: model.title,
        }))
    }

    async fn blocking_dependencies(&self, task_id: Uuid) -> Result<Vec<TaskRef>, GateError> {
        let Some(task_row_id) = ids::task_id_by_uuid(self.db, task_id).await? else {
            return Ok(Vec::new());
        };
        let blocking = TaskDependency::blocking_of(self.db, task_row_id).await?;
        Ok(blocking
            .into_iter()
            .map(|dep| TaskRef {
                id: dep.id,
                title: dep.title,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use db::models::{
        board_column::{BoardColumn, ColumnPosition, CreateBoardColumn},
        ids,
        project::{CreateProject, Project},
        task::{CreateTask, Task},
        task_dependency::TaskDependency,
        user::{CreateUser, User},
    };
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::gate::{BlockReason, GateDecision, TaskGate, column_for_task};

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_board(db: &sea_orm::DatabaseConnection) -> (Uuid, Uuid) {
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
                name: "Launch".to_string(),
                description: None,
            },
            owner.id,
            project_id,
        )
        .await
        .unwrap();
        BoardColumn::create_defaults(db, project_id).await.unwrap();
        (owner.id, project_id)
    }

    async fn gate_task(db: &sea_orm::DatabaseConnection, task_id: Uuid) -> GateTask {
        let model = Task::find_model_by_id(db, task_id).await.unwrap().unwrap();
        let project_id = ids::project_uuid_by_id(db, model.project_id)
            .await
            .unwrap()
            .unwrap();
        GateTask::from_model(&model, project_id)
    }

    #[tokio::test]
    async fn build_is_blocked_by_design_on_the_default_board() {
        let db = setup_db().await;
        let (owner, project_id) = seed_board(&db).await;
        let design = Task::create(
            &db,
            &CreateTask::from_title(project_id, "Design"),
            owner,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let build = Task::create(
            &db,
            &CreateTask::from_title(project_id, "Build"),
            owner,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        assert_eq!((design.order_index, build.order_index), (0, 1));

        let source = DbGateSource::new(&db);
        let task = gate_task(&db, build.id).await;
        let decision = TaskGate::evaluate(&source, &task, TaskStatus::InProgress)
            .await
            .unwrap();

        assert_eq!(
            decision.reason().map(ToString::to_string).as_deref(),
            Some("must first complete «Design»")
        );
    }

    #[tokio::test]
    async fn database_source_reports_direct_blockers_only() {
        let db = setup_db().await;
        let (owner, project_id) = seed_board(&db).await;
        let create = |title: &str| CreateTask::from_title(project_id, title);
        let a = Task::create(&db, &create("A"), owner, Uuid::new_v4()).await.unwrap();
        let mut in_review = create("B");
        in_review.status = Some(TaskStatus::Review);
        let b = Task::create(&db, &in_review, owner, Uuid::new_v4()).await.unwrap();
        let mut done = create("C");
        done.status = Some(TaskStatus::Done);
        let c = Task::create(&db, &done, owner, Uuid::new_v4()).await.unwrap();

        let a_row = ids::task_id_by_uuid(&db, a.id).await.unwrap().unwrap();
        let b_row = ids::task_id_by_uuid(&db, b.id).await.unwrap().unwrap();
        let c_row = ids::task_id_by_uuid(&db, c.id).await.unwrap().unwrap();
        TaskDependency::create(&db, a_row, b_row).await.unwrap();
        TaskDependency::create(&db, b_row, c_row).await.unwrap();

        let source = DbGateSource::new(&db);
        let task = gate_task(&db, a.id).await;
        let decision = TaskGate::evaluate(&source, &task, TaskStatus::Ready)
            .await
            .unwrap();
        assert_eq!(
            decision,
            GateDecision::Blocked(BlockReason::Dependency(TaskRef {
                id: b.id,
                title: "B".to_string(),
            }))
        );
    }

    #[tokio::test]
    async fn shared_column_index_resolves_to_the_older_column() {
        let db = setup_db().await;
        let (owner, project_id) = seed_board(&db).await;
        let triage = BoardColumn::create(
            &db,
            project_id,
            &CreateBoardColumn {
                name: "Triage".to_string(),
                is_locked: false,
            },
        )
        .await
        .unwrap();
        BoardColumn::reorder(
            &db,
            project_id,
            &[ColumnPosition {
                id: triage.id,
                order_index: 1,
            }],
        )
        .await
        .unwrap();

        Task::create(
            &db,
            &CreateTask::from_title(project_id, "Design"),
            owner,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let build = Task::create(
            &db,
            &CreateTask::from_title(project_id, "Build"),
            owner,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let source = DbGateSource::new(&db);
        let columns = source.columns(project_id).await.unwrap();
        let task = gate_task(&db, build.id).await;
        let column = column_for_task(&columns, &task).unwrap();
        assert_eq!(column.name, "Ready");
        assert!(column.is_locked);
    }
}
