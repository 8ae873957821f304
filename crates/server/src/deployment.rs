use std::sync::Arc;

use db::{DBService, DbErr};
use services::services::{
    config::{Config, ConfigError},
    dependency::DependencyService,
    task::TaskService,
};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Shared handles every request needs.
#[derive(Clone)]
pub struct Deployment {
    db: DBService,
    config: Arc<RwLock<Config>>,
}

impl Deployment {
    pub async fn new(config: Config) -> Result<Self, DeploymentError> {
        config.validate()?;
        let database_url = match config.database_url.as_deref() {
            Some(url) => url.to_string(),
            None => utils::assets::default_database_url()?,
        };
        let db = DBService::new(&database_url).await?;
        Ok(Self::from_parts(db, config))
    }

    pub fn from_parts(db: DBService, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    pub async fn task_service(&self) -> TaskService {
        TaskService::new(self.config.read().await.transition_max_attempts)
    }

    pub async fn dependency_service(&self) -> DependencyService {
        DependencyService::new(self.config.read().await.dependency_policy.clone())
    }
}
