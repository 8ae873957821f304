use db::{
    DbErr,
    models::user::{CreateUser, User},
};
use sea_orm::SqlErr;
use thiserror::Error;
use uuid::Uuid;

use super::validation;

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("{0}")]
    Validation(String),
    #[error("A user with email {0} already exists")]
    EmailTaken(String),
}

pub type Result<T> = std::result::Result<T, UserServiceError>;

#[derive(Clone, Default)]
pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        Self
    }

    pub async fn register(&self, pool: &db::DbPool, payload: CreateUser) -> Result<User> {
        let email = validation::email(&payload.email).map_err(UserServiceError::Validation)?;
        let name =
            validation::bounded_text("name", &payload.name, 100).map_err(UserServiceError::Validation)?;

        if User::find_by_email(pool, &email).await?.is_some() {
            return Err(UserServiceError::EmailTaken(email));
        }

        let data = CreateUser {
            email: email.clone(),
            name,
            avatar_url: payload.avatar_url.filter(|url| !url.trim().is_empty()),
        };
        let user = User::create(pool, &data, Uuid::new_v4())
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    UserServiceError::EmailTaken(email.clone())
                }
                _ => err.into(),
            })?;

        tracing::info!(user_id = %user.id, "registered user");
        Ok(user)
    }

    pub async fn find(&self, pool: &db::DbPool, user_id: Uuid) -> Result<Option<User>> {
        Ok(User::find_by_id(pool, user_id).await?)
    }
}
