//! Append positions for board columns (scoped per project) and tasks
//! (scoped per project and status lane).

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::{
    entities::{board_column, task},
    types::TaskStatus,
};

/// `max + 1`, or `0` for an empty scope.
pub fn next_order_index(current_max: Option<i32>) -> i32 {
    current_max.map_or(0, |max| max.saturating_add(1))
}

pub async fn max_column_order_index<C: ConnectionTrait>(
    db: &C,
    project_row_id: i64,
) -> Result<Option<i32>, DbErr> {
    board_column::Entity::find()
        .select_only()
        .column(board_column::Column::OrderIndex)
        .filter(board_column::Column::ProjectId.eq(project_row_id))
        .order_by_desc(board_column::Column::OrderIndex)
        .into_tuple()
        .one(db)
        .await
}

pub async fn max_task_order_index<C: ConnectionTrait>(
    db: &C,
    project_row_id: i64,
    status: TaskStatus,
) -> Result<Option<i32>, DbErr> {
    task::Entity::find()
        .select_only()
        .column(task::Column::OrderIndex)
        .filter(task::Column::ProjectId.eq(project_row_id))
        .filter(task::Column::Status.eq(status))
        .order_by_desc(task::Column::OrderIndex)
        .into_tuple()
        .one(db)
        .await
}

pub async fn next_column_order_index<C: ConnectionTrait>(
    db: &C,
    project_row_id: i64,
) -> Result<i32, DbErr> {
    Ok(next_order_index(max_column_order_index(db, project_row_id).await?))
}

pub async fn next_task_order_index<C: ConnectionTrait>(
    db: &C,
    project_row_id: i64,
    status: TaskStatus,
) -> Result<i32, DbErr> {
    Ok(next_order_index(
        max_task_order_index(db, project_row_id, status).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::next_order_index;

    #[test]
    fn empty_scope_starts_at_zero() {
        assert_eq!(next_order_index(None), 0);
    }

    #[test]
    fn appends_after_the_current_max() {
        assert_eq!(next_order_index(Some(0)), 1);
        assert_eq!(next_order_index(Some(41)), 42);
    }
}
