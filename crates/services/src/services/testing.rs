use db::models::user::{CreateUser, User};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

pub(crate) async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db_migration::Migrator::up(&db, None).await.unwrap();
    db
}

/// A database file in a fresh temp dir, so several connections can contend
/// for the write lock. Keep the returned dir alive for the test's duration.
pub(crate) async fn setup_file_db() -> (tempfile::TempDir, DatabaseConnection) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("db.sqlite").display());
    let service = db::DBService::new(&url).await.unwrap();
    (dir, service.pool)
}

pub(crate) async fn user(db: &DatabaseConnection, name: &str) -> User {
    User::create(
        db,
        &CreateUser {
            email: format!("{}@example.com", name.to_lowercase()),
            name: name.to_string(),
            avatar_url: None,
        },
        Uuid::new_v4(),
    )
    .await
    .unwrap()
}
