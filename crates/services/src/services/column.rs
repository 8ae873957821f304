use db::{
    DbErr, TransactionTrait,
    models::{
        board_column::{BoardColumn, ColumnPosition, CreateBoardColumn, UpdateBoardColumn},
        user::User,
    },
};
use thiserror::Error;
use uuid::Uuid;

use super::{
    access::{self, AccessError},
    validation,
};

#[derive(Debug, Error)]
pub enum ColumnServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, ColumnServiceError>;

impl ColumnServiceError {
    fn column_not_found() -> Self {
        Self::NotFound("Column not found".to_string())
    }
}

#[derive(Clone, Default)]
pub struct ColumnService;

impl ColumnService {
    pub fn new() -> Self {
        Self
    }

    fn validate_name(name: &str) -> Result<String> {
        validation::bounded_text("name", name, 50).map_err(ColumnServiceError::Validation)
    }

    pub async fn list_columns(
        &self,
        pool: &db::DbPool,
        caller: &User,
        project_id: Uuid,
    ) -> Result<Vec<BoardColumn>> {
        access::require_member(pool, project_id, caller.id).await?;
        Ok(BoardColumn::find_by_project_id(pool, project_id).await?)
    }

    /// Appends a column after the current last one.
    pub async fn create_column(
        &self,
        pool: &db::DbPool,
        caller: &User,
        project_id: Uuid,
        payload: CreateBoardColumn,
    ) -> Result<BoardColumn> {
        access::require_manager(pool, project_id, caller.id).await?;
        let data = CreateBoardColumn {
            name: Self::validate_name(&payload.name)?,
            is_locked: payload.is_locked,
        };
        let column = BoardColumn::create(pool, project_id, &data).await?;
        tracing::info!(
            project_id = %project_id,
            column_id = %column.id,
            order_index = column.order_index,
            "created column"
        );
        Ok(column)
    }

    async fn load_for_manager(
        pool: &db::DbPool,
        caller: &User,
        column_id: Uuid,
    ) -> Result<BoardColumn> {
        let column = BoardColumn::find_by_id(pool, column_id)
            .await?
            .ok_or_else(ColumnServiceError::column_not_found)?;
        access::require_manager(pool, column.project_id, caller.id).await?;
        Ok(column)
    }

    pub async fn update_column(
        &self,
        pool: &db::DbPool,
        caller: &User,
        column_id: Uuid,
        payload: UpdateBoardColumn,
    ) -> Result<BoardColumn> {
        Self::load_for_manager(pool, caller, column_id).await?;
        let name = payload
            .name
            .as_deref()
            .map(Self::validate_name)
            .transpose()?;
        let column = BoardColumn::update(
            pool,
            column_id,
            &UpdateBoardColumn {
                name,
                is_locked: payload.is_locked,
            },
        )
        .await?;
        Ok(column)
    }

    /// Deletes the column without re-indexing the remaining ones.
    pub async fn delete_column(
        &self,
        pool: &db::DbPool,
        caller: &User,
        column_id: Uuid,
    ) -> Result<()> {
        let column = Self::load_for_manager(pool, caller, column_id).await?;
        BoardColumn::delete(pool, column_id).await?;
        tracing::info!(project_id = %column.project_id, column_id = %column_id, "deleted column");
        Ok(())
    }

    /// Applies the whole batch or nothing. Indices are not checked for gaps or ties.
    pub async fn reorder_columns(
        &self,
        pool: &db::DbPool,
        caller: &User,
        project_id: Uuid,
        positions: Vec<ColumnPosition>,
    ) -> Result<Vec<BoardColumn>> {
        access::require_manager(pool, project_id, caller.id).await?;
        for position in &positions {
            validation::order_index(position.order_index).map_err(ColumnServiceError::Validation)?;
        }

        let tx = pool.begin().await?;
        BoardColumn::reorder(&tx, project_id, &positions)
            .await
            .map_err(|err| match err {
                DbErr::RecordNotFound(message) => ColumnServiceError::NotFound(message),
                other => other.into(),
            })?;
        tx.commit().await?;

        Ok(BoardColumn::find_by_project_id(pool, project_id).await?)
    }
}
