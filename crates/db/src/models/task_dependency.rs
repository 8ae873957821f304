use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{task, task_dependency},
    models::task::TaskSummary,
    types::TaskStatus,
};

/// A directed edge: `task_id` stays blocked until `depends_on_id` is done.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskDependency {
    pub id: Uuid,
    pub task_id: Uuid,
    pub depends_on_id: Uuid,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateTaskDependency {
    pub depends_on_id: Uuid,
}

/// Unfinished dependency target, in edge insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingDependency {
    pub id: Uuid,
    pub title: String,
}

impl TaskDependency {
    pub async fn exists<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
        depends_on_row_id: i64,
    ) -> Result<bool, DbErr> {
        let count = task_dependency::Entity::find()
            .filter(task_dependency::Column::TaskId.eq(task_row_id))
            .filter(task_dependency::Column::DependsOnId.eq(depends_on_row_id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
        depends_on_row_id: i64,
    ) -> Result<Self, DbErr> {
        let endpoints = task::Entity::find()
            .select_only()
            .column(task::Column::Id)
            .column(task::Column::Uuid)
            .filter(task::Column::Id.is_in([task_row_id, depends_on_row_id]))
            .into_tuple::<(i64, Uuid)>()
            .all(db)
            .await?;
        let uuid_of = |row_id: i64| {
            endpoints
                .iter()
                .find(|(id, _)| *id == row_id)
                .map(|(_, uuid)| *uuid)
                .ok_or(DbErr::RecordNotFound("Task not found".to_string()))
        };
        let task_id = uuid_of(task_row_id)?;
        let depends_on_id = uuid_of(depends_on_row_id)?;

        let active = task_dependency::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            task_id: Set(task_row_id),
            depends_on_id: Set(depends_on_row_id),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        Ok(Self {
            id: model.uuid,
            task_id,
            depends_on_id,
            created_at: model.created_at.into(),
        })
    }

    pub async fn delete<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
        depends_on_row_id: i64,
    ) -> Result<u64, DbErr> {
        let result = task_dependency::Entity::delete_many()
            .filter(task_dependency::Column::TaskId.eq(task_row_id))
            .filter(task_dependency::Column::DependsOnId.eq(depends_on_row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Row ids this task points at, in insertion order.
    pub async fn depends_on_row_ids<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
    ) -> Result<Vec<i64>, DbErr> {
        task_dependency::Entity::find()
            .select_only()
            .column(task_dependency::Column::DependsOnId)
            .filter(task_dependency::Column::TaskId.eq(task_row_id))
            .order_by_asc(task_dependency::Column::Id)
            .into_tuple()
            .all(db)
            .await
    }

    async fn dependent_row_ids<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
    ) -> Result<Vec<i64>, DbErr> {
        task_dependency::Entity::find()
            .select_only()
            .column(task_dependency::Column::TaskId)
            .filter(task_dependency::Column::DependsOnId.eq(task_row_id))
            .order_by_asc(task_dependency::Column::Id)
            .into_tuple()
            .all(db)
            .await
    }

    async fn tasks_in_order<C: ConnectionTrait>(
        db: &C,
        row_ids: Vec<i64>,
    ) -> Result<Vec<task::Model>, DbErr> {
        if row_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut by_id: HashMap<i64, task::Model> = task::Entity::find()
            .filter(task::Column::Id.is_in(row_ids.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|model| (model.id, model))
            .collect();
        Ok(row_ids
            .into_iter()
            .filter_map(|row_id| by_id.remove(&row_id))
            .collect())
    }

    pub async fn dependencies_of<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
    ) -> Result<Vec<TaskSummary>, DbErr> {
        let row_ids = Self::depends_on_row_ids(db, task_row_id).await?;
        let models = Self::tasks_in_order(db, row_ids).await?;
        Ok(models.iter().map(TaskSummary::from).collect())
    }

    pub async fn dependents_of<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
    ) -> Result<Vec<TaskSummary>, DbErr> {
        let row_ids = Self::dependent_row_ids(db, task_row_id).await?;
        let models = Self::tasks_in_order(db, row_ids).await?;
        Ok(models.iter().map(TaskSummary::from).collect())
    }

    /// Direct dependencies that are not done yet. Only one hop is followed.
    pub async fn blocking_of<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
    ) -> Result<Vec<BlockingDependency>, DbErr> {
        let row_ids = Self::depends_on_row_ids(db, task_row_id).await?;
        let models = Self::tasks_in_order(db, row_ids).await?;
        Ok(models
            .into_iter()
            .filter(|model| model.status != TaskStatus::Done)
            .map(|model| BlockingDependency {
                id: model.uuid,
                title: model.title,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::{
        ids,
        project::{CreateProject, Project},
        task::{CreateTask, Task},
        user::{CreateUser, User},
    };

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_tasks(db: &sea_orm::DatabaseConnection, titles: &[&str]) -> Vec<i64> {
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

        let mut rows = Vec::new();
        for title in titles {
            let task = Task::create(
                db,
                &CreateTask::from_title(project_id, *title),
                owner.id,
                Uuid::new_v4(),
            )
            .await
            .unwrap();
            rows.push(ids::task_id_by_uuid(db, task.id).await.unwrap().unwrap());
        }
        rows
    }

    #[tokio::test]
    async fn blocking_ignores_finished_targets() {
        let db = setup_db().await;
        let rows = seed_tasks(&db, &["A", "B", "C"]).await;
        TaskDependency::create(&db, rows[0], rows[1]).await.unwrap();
        TaskDependency::create(&db, rows[0], rows[2]).await.unwrap();

        Task::update_status_if_version(&db, rows[1], 0, TaskStatus::Done)
            .await
            .unwrap();

        let blocking = TaskDependency::blocking_of(&db, rows[0]).await.unwrap();
        assert_eq!(blocking.len(), 1);
        assert_eq!(blocking[0].title, "C");
    }

    #[tokio::test]
    async fn blocking_is_single_hop() {
        let db = setup_db().await;
        let rows = seed_tasks(&db, &["A", "B", "C"]).await;
        TaskDependency::create(&db, rows[0], rows[1]).await.unwrap();
        TaskDependency::create(&db, rows[1], rows[2]).await.unwrap();

        Task::update_status_if_version(&db, rows[1], 0, TaskStatus::Done)
            .await
            .unwrap();

        assert!(TaskDependency::blocking_of(&db, rows[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_edges_hit_the_unique_index() {
        let db = setup_db().await;
        let rows = seed_tasks(&db, &["A", "B"]).await;
        TaskDependency::create(&db, rows[0], rows[1]).await.unwrap();

        assert!(TaskDependency::exists(&db, rows[0], rows[1]).await.unwrap());
        assert!(!TaskDependency::exists(&db, rows[1], rows[0]).await.unwrap());
        assert!(TaskDependency::create(&db, rows[0], rows[1]).await.is_err());
    }

    #[tokio::test]
    async fn listing_preserves_insertion_order() {
        let db = setup_db().await;
        let rows = seed_tasks(&db, &["A", "B", "C"]).await;
        TaskDependency::create(&db, rows[0], rows[2]).await.unwrap();
        TaskDependency::create(&db, rows[0], rows[1]).await.unwrap();

        let titles: Vec<String> = TaskDependency::dependencies_of(&db, rows[0])
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["C", "B"]);

        let dependents = TaskDependency::dependents_of(&db, rows[1]).await.unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].title, "A");

        assert_eq!(TaskDependency::delete(&db, rows[0], rows[2]).await.unwrap(), 1);
        assert_eq!(TaskDependency::delete(&db, rows[0], rows[2]).await.unwrap(), 0);
    }
}
