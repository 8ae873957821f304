use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::board_column,
    models::{ids, ordering},
};

/// Columns every new project starts with, as `(name, is_locked)`.
pub const DEFAULT_COLUMNS: [(&str, bool); 5] = [
    ("Backlog", false),
    ("Ready", true),
    ("In Progress", true),
    ("Review", true),
    ("Done", false),
];

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardColumn {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub order_index: i32,
    pub is_locked: bool,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateBoardColumn {
    pub name: String,
    #[serde(default)]
    pub is_locked: bool,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UpdateBoardColumn {
    pub name: Option<String>,
    pub is_locked: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct ColumnPosition {
    pub id: Uuid,
    pub order_index: i32,
}

impl BoardColumn {
    fn from_model(model: board_column::Model, project_id: Uuid) -> Self {
        Self {
            id: model.uuid,
            project_id,
            name: model.name,
            order_index: model.order_index,
            is_locked: model.is_locked,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    async fn from_model_lookup<C: ConnectionTrait>(
        db: &C,
        model: board_column::Model,
    ) -> Result<Self, DbErr> {
        let project_id = ids::require_project_uuid(db, model.project_id).await?;
        Ok(Self::from_model(model, project_id))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = board_column::Entity::find()
            .filter(board_column::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model_lookup(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Columns of a project in board order.
    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let project_row_id = ids::require_project_id(db, project_id).await?;
        let models = board_column::Entity::find()
            .filter(board_column::Column::ProjectId.eq(project_row_id))
            .order_by_asc(board_column::Column::OrderIndex)
            .order_by_asc(board_column::Column::Id)
            .all(db)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| Self::from_model(model, project_id))
            .collect())
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        data: &CreateBoardColumn,
    ) -> Result<Self, DbErr> {
        let project_row_id = ids::require_project_id(db, project_id).await?;
        let order_index = ordering::next_column_order_index(db, project_row_id).await?;

        let now = Utc::now();
        let active = board_column::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            project_id: Set(project_row_id),
            name: Set(data.name.trim().to_string()),
            order_index: Set(order_index),
            is_locked: Set(data.is_locked),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model, project_id))
    }

    pub async fn create_defaults<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let mut columns = Vec::with_capacity(DEFAULT_COLUMNS.len());
        for (name, is_locked) in DEFAULT_COLUMNS {
            let data = CreateBoardColumn {
                name: name.to_string(),
                is_locked,
            };
            columns.push(Self::create(db, project_id, &data).await?);
        }
        Ok(columns)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateBoardColumn,
    ) -> Result<Self, DbErr> {
        let record = board_column::Entity::find()
            .filter(board_column::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;

        let mut active: board_column::ActiveModel = record.into();
        if let Some(name) = payload.name.as_ref() {
            active.name = Set(name.trim().to_string());
        }
        if let Some(is_locked) = payload.is_locked {
            active.is_locked = Set(is_locked);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Self::from_model_lookup(db, updated).await
    }

    /// Deletes the column. Remaining columns keep their indices.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = board_column::Entity::delete_many()
            .filter(board_column::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Applies every position or none of them when run inside a transaction.
    /// Ids from another project fail the whole batch before anything is written.
    pub async fn reorder<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        positions: &[ColumnPosition],
    ) -> Result<Vec<Self>, DbErr> {
        let project_row_id = ids::require_project_id(db, project_id).await?;
        let owned = board_column::Entity::find()
            .filter(board_column::Column::ProjectId.eq(project_row_id))
            .filter(board_column::Column::Uuid.is_in(positions.iter().map(|p| p.id)))
            .all(db)
            .await?;

        for position in positions {
            if !owned.iter().any(|model| model.uuid == position.id) {
                return Err(DbErr::RecordNotFound(format!(
                    "Column {} not found",
                    position.id
                )));
            }
        }

        let now = Utc::now();
        for position in positions {
            board_column::Entity::update_many()
                .col_expr(
                    board_column::Column::OrderIndex,
                    sea_orm::sea_query::Expr::value(position.order_index),
                )
                .col_expr(
                    board_column::Column::UpdatedAt,
                    sea_orm::sea_query::Expr::value(now),
                )
                .filter(board_column::Column::Uuid.eq(position.id))
                .exec(db)
                .await?;
        }

        Self::find_by_project_id(db, project_id).await
    }
}
