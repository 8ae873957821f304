use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseBackend};
use sea_orm_migration::MigratorTrait;

pub mod entities;
pub mod models;
pub mod retry;
pub mod types;

pub use sea_orm::{DatabaseConnection, DbErr, TransactionTrait};

pub type DbPool = DatabaseConnection;

#[derive(Clone)]
pub struct DBService {
    pub pool: DbPool,
}

impl DBService {
    /// Connects to `database_url` and brings the schema up to date.
    pub async fn new(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_owned());
        options
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(30))
            .sqlx_logging(false);
        let pool = Database::connect(options).await?;

        if pool.get_database_backend() == DatabaseBackend::Sqlite {
            pool.execute_unprepared("PRAGMA journal_mode = WAL;").await?;
            pool.execute_unprepared("PRAGMA foreign_keys = ON;").await?;
            pool.execute_unprepared("PRAGMA busy_timeout = 5000;").await?;
        }

        db_migration::Migrator::up(&pool, None).await?;
        tracing::debug!("database ready at {database_url}");
        Ok(DBService { pool })
    }

    pub fn from_pool(pool: DbPool) -> Self {
        DBService { pool }
    }
}
