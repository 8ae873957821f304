use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::{project, task, user};

pub async fn user_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .filter(user::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn user_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Uuid)
        .filter(user::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn project_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    project::Entity::find()
        .select_only()
        .column(project::Column::Id)
        .filter(project::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn project_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    project::Entity::find()
        .select_only()
        .column(project::Column::Uuid)
        .filter(project::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    task::Entity::find()
        .select_only()
        .column(task::Column::Id)
        .filter(task::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub(crate) async fn require_project_id<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<i64, DbErr> {
    project_id_by_uuid(db, uuid)
        .await?
        .ok_or(DbErr::RecordNotFound("Project not found".to_string()))
}

pub(crate) async fn require_project_uuid<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Uuid, DbErr> {
    project_uuid_by_id(db, id)
        .await?
        .ok_or(DbErr::RecordNotFound("Project not found".to_string()))
}

pub(crate) async fn require_user_uuid<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Uuid, DbErr> {
    user_uuid_by_id(db, id)
        .await?
        .ok_or(DbErr::RecordNotFound("User not found".to_string()))
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::{
        project::{CreateProject, Project},
        user::{CreateUser, User},
    };

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn ids_roundtrip_and_uuid_resolution() {
        let db = setup_db().await;

        let user = User::create(
            &db,
            &CreateUser {
                email: "ada@example.com".to_string(),
                name: "Ada".to_string(),
                avatar_url: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let user_row_id = user_id_by_uuid(&db, user.id)
            .await
            .unwrap()
            .expect("user row id");
        assert_eq!(user_uuid_by_id(&db, user_row_id).await.unwrap(), Some(user.id));

        let project_id = Uuid::new_v4();
        Project::create(
            &db,
            &CreateProject {
                name: "Test project".to_string(),
                description: None,
            },
            user.id,
            project_id,
        )
        .await
        .unwrap();
        let project_row_id = project_id_by_uuid(&db, project_id)
            .await
            .unwrap()
            .expect("project row id");
        assert_eq!(
            project_uuid_by_id(&db, project_row_id).await.unwrap(),
            Some(project_id)
        );

        assert_eq!(task_id_by_uuid(&db, Uuid::new_v4()).await.unwrap(), None);
    }
}
