use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Users::Table)
                    .col(pk_id_col(manager, Users::Id))
                    .col(uuid_col(Users::Uuid))
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::AvatarUrl).string())
                    .col(timestamp_col(Users::CreatedAt))
                    .col(timestamp_col(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_uuid")
                    .table(Users::Table)
                    .col(Users::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Projects::Table)
                    .col(pk_id_col(manager, Projects::Id))
                    .col(uuid_col(Projects::Uuid))
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(ColumnDef::new(Projects::Description).text())
                    .col(fk_id_col(manager, Projects::OwnerId))
                    .col(timestamp_col(Projects::CreatedAt))
                    .col(timestamp_col(Projects::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_owner_id")
                            .from(Projects::Table, Projects::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_projects_uuid")
                    .table(Projects::Table)
                    .col(Projects::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ProjectMembers::Table)
                    .col(pk_id_col(manager, ProjectMembers::Id))
                    .col(uuid_col(ProjectMembers::Uuid))
                    .col(fk_id_col(manager, ProjectMembers::ProjectId))
                    .col(fk_id_col(manager, ProjectMembers::UserId))
                    .col(
                        ColumnDef::new(ProjectMembers::Role)
                            .string_len(16)
                            .not_null()
                            .default(Expr::val("MEMBER")),
                    )
                    .col(timestamp_col(ProjectMembers::JoinedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_members_project_id")
                            .from(ProjectMembers::Table, ProjectMembers::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_members_user_id")
                            .from(ProjectMembers::Table, ProjectMembers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_project_members_uuid")
                    .table(ProjectMembers::Table)
                    .col(ProjectMembers::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_project_members_project_user")
                    .table(ProjectMembers::Table)
                    .col(ProjectMembers::ProjectId)
                    .col(ProjectMembers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(BoardColumns::Table)
                    .col(pk_id_col(manager, BoardColumns::Id))
                    .col(uuid_col(BoardColumns::Uuid))
                    .col(fk_id_col(manager, BoardColumns::ProjectId))
                    .col(ColumnDef::new(BoardColumns::Name).string().not_null())
                    .col(
                        ColumnDef::new(BoardColumns::OrderIndex)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(
                        ColumnDef::new(BoardColumns::IsLocked)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(timestamp_col(BoardColumns::CreatedAt))
                    .col(timestamp_col(BoardColumns::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_board_columns_project_id")
                            .from(BoardColumns::Table, BoardColumns::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_board_columns_uuid")
                    .table(BoardColumns::Table)
                    .col(BoardColumns::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Not unique: reorders are applied row by row inside one transaction.
        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_board_columns_project_order")
                    .table(BoardColumns::Table)
                    .col(BoardColumns::ProjectId)
                    .col(BoardColumns::OrderIndex)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(uuid_col(Tasks::Uuid))
                    .col(fk_id_col(manager, Tasks::ProjectId))
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("BACKLOG")),
                    )
                    .col(
                        ColumnDef::new(Tasks::Priority)
                            .string_len(16)
                            .not_null()
                            .default(Expr::val("MEDIUM")),
                    )
                    .col(
                        ColumnDef::new(Tasks::OrderIndex)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(fk_id_nullable_col(manager, Tasks::AssigneeId))
                    .col(ColumnDef::new(Tasks::DueDate).timestamp())
                    .col(fk_id_col(manager, Tasks::CreatedById))
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_project_id")
                            .from(Tasks::Table, Tasks::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_assignee_id")
                            .from(Tasks::Table, Tasks::AssigneeId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_created_by_id")
                            .from(Tasks::Table, Tasks::CreatedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_uuid")
                    .table(Tasks::Table)
                    .col(Tasks::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_project_status_order")
                    .table(Tasks::Table)
                    .col(Tasks::ProjectId)
                    .col(Tasks::Status)
                    .col(Tasks::OrderIndex)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TaskDependencies::Table)
                    .col(pk_id_col(manager, TaskDependencies::Id))
                    .col(uuid_col(TaskDependencies::Uuid))
                    .col(fk_id_col(manager, TaskDependencies::TaskId))
                    .col(fk_id_col(manager, TaskDependencies::DependsOnId))
                    .col(timestamp_col(TaskDependencies::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_dependencies_task_id")
                            .from(TaskDependencies::Table, TaskDependencies::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_dependencies_depends_on_id")
                            .from(TaskDependencies::Table, TaskDependencies::DependsOnId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_dependencies_uuid")
                    .table(TaskDependencies::Table)
                    .col(TaskDependencies::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_dependencies_edge")
                    .table(TaskDependencies::Table)
                    .col(TaskDependencies::TaskId)
                    .col(TaskDependencies::DependsOnId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_dependencies_depends_on_id")
                    .table(TaskDependencies::Table)
                    .col(TaskDependencies::DependsOnId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TaskDependencies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BoardColumns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Uuid,
    Email,
    Name,
    AvatarUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    Uuid,
    Name,
    Description,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ProjectMembers {
    Table,
    Id,
    Uuid,
    ProjectId,
    UserId,
    Role,
    JoinedAt,
}

#[derive(Iden)]
enum BoardColumns {
    Table,
    Id,
    Uuid,
    ProjectId,
    Name,
    OrderIndex,
    IsLocked,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    Uuid,
    ProjectId,
    Title,
    Description,
    Status,
    Priority,
    OrderIndex,
    AssigneeId,
    DueDate,
    CreatedById,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskDependencies {
    Table,
    Id,
    Uuid,
    TaskId,
    DependsOnId,
    CreatedAt,
}
