use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use sea_orm::sea_query::Query;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{board_column, project, project_member, task, task_dependency},
    models::ids,
    types::TaskStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct TaskTotals {
    pub total: u64,
    pub done: u64,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct ProjectSummary {
    #[serde(flatten)]
    #[ts(flatten)]
    pub project: Project,
    pub member_count: u64,
    pub tasks: TaskTotals,
}

impl Project {
    async fn from_model<C: ConnectionTrait>(db: &C, model: project::Model) -> Result<Self, DbErr> {
        let owner_id = ids::require_user_uuid(db, model.owner_id).await?;
        Ok(Self {
            id: model.uuid,
            name: model.name,
            description: model.description,
            owner_id,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Projects the user belongs to, most recently updated first.
    pub async fn find_for_member<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(user_row_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(Vec::new());
        };

        let models = project::Entity::find()
            .filter(
                project::Column::Id.in_subquery(
                    Query::select()
                        .column(project_member::Column::ProjectId)
                        .from(project_member::Entity)
                        .and_where(project_member::Column::UserId.eq(user_row_id))
                        .to_owned(),
                ),
            )
            .order_by_desc(project::Column::UpdatedAt)
            .all(db)
            .await?;

        let mut projects = Vec::with_capacity(models.len());
        for model in models {
            projects.push(Self::from_model(db, model).await?);
        }
        Ok(projects)
    }

    pub async fn summarize<C: ConnectionTrait>(
        db: &C,
        project: Project,
    ) -> Result<ProjectSummary, DbErr> {
        let project_row_id = ids::require_project_id(db, project.id).await?;
        let member_count = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .count(db)
            .await?;
        let total = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .count(db)
            .await?;
        let done = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .filter(task::Column::Status.eq(TaskStatus::Done))
            .count(db)
            .await?;

        Ok(ProjectSummary {
            project,
            member_count,
            tasks: TaskTotals { total, done },
        })
    }

    /// Inserts the project row only; membership and columns are the caller's job.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateProject,
        owner_id: Uuid,
        project_id: Uuid,
    ) -> Result<Self, DbErr> {
        let owner_row_id = ids::user_id_by_uuid(db, owner_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        let now = Utc::now();
        let active = project::ActiveModel {
            uuid: Set(project_id),
            name: Set(data.name.trim().to_string()),
            description: Set(data.description.clone()),
            owner_id: Set(owner_row_id),
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
        payload: &UpdateProject,
    ) -> Result<Self, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let mut active: project::ActiveModel = record.into();
        if let Some(name) = payload.name.as_ref() {
            active.name = Set(name.trim().to_string());
        }
        if payload.description.is_some() {
            active.description = Set(payload.description.clone());
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    pub async fn touch<C: ConnectionTrait>(db: &C, project_row_id: i64) -> Result<(), DbErr> {
        project::Entity::update_many()
            .col_expr(
                project::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(project::Column::Id.eq(project_row_id))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Removes the project with its edges, tasks, columns and memberships.
    /// Run inside a transaction to make the cascade atomic.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let Some(project_row_id) = ids::project_id_by_uuid(db, id).await? else {
            return Ok(0);
        };

        let project_tasks = Query::select()
            .column(task::Column::Id)
            .from(task::Entity)
            .and_where(task::Column::ProjectId.eq(project_row_id))
            .to_owned();
        task_dependency::Entity::delete_many()
            .filter(task_dependency::Column::TaskId.in_subquery(project_tasks.clone()))
            .exec(db)
            .await?;
        task_dependency::Entity::delete_many()
            .filter(task_dependency::Column::DependsOnId.in_subquery(project_tasks))
            .exec(db)
            .await?;
        task::Entity::delete_many()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .exec(db)
            .await?;
        board_column::Entity::delete_many()
            .filter(board_column::Column::ProjectId.eq(project_row_id))
            .exec(db)
            .await?;
        project_member::Entity::delete_many()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .exec(db)
            .await?;

        let result = project::Entity::delete_many()
            .filter(project::Column::Id.eq(project_row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn row_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<i64, DbErr> {
        ids::require_project_id(db, id).await
    }
}
