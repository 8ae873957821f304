//! Project membership and role checks shared by every service.

use db::{
    DbErr,
    models::{ids, project_member::ProjectMember},
    types::MemberRole,
};
use sea_orm::ConnectionTrait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    ProjectNotFound,
    #[error("You are not a member of this project")]
    NotMember,
    #[error("This action requires the {0} role")]
    InsufficientRole(&'static str),
}

pub type Result<T> = std::result::Result<T, AccessError>;

/// Role of `user_id` in the project with row id `project_row_id`.
pub async fn project_role<C: ConnectionTrait>(
    db: &C,
    project_row_id: i64,
    user_id: Uuid,
) -> Result<MemberRole> {
    let Some(user_row_id) = ids::user_id_by_uuid(db, user_id).await? else {
        return Err(AccessError::NotMember);
    };
    ProjectMember::role_by_row_ids(db, project_row_id, user_row_id)
        .await?
        .ok_or(AccessError::NotMember)
}

pub async fn require_member<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<MemberRole> {
    let project_row_id = ids::project_id_by_uuid(db, project_id)
        .await?
        .ok_or(AccessError::ProjectNotFound)?;
    project_role(db, project_row_id, user_id).await
}

pub async fn require_manager<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<MemberRole> {
    let role = require_member(db, project_id, user_id).await?;
    ensure_manager(role)?;
    Ok(role)
}

pub async fn require_owner<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<MemberRole> {
    let role = require_member(db, project_id, user_id).await?;
    if role != MemberRole::Owner {
        return Err(AccessError::InsufficientRole("OWNER"));
    }
    Ok(role)
}

pub fn ensure_manager(role: MemberRole) -> Result<()> {
    if role.can_manage() {
        Ok(())
    } else {
        Err(AccessError::InsufficientRole("OWNER or ADMIN"))
    }
}

#[cfg(test)]
mod tests {
    use db::models::project::{CreateProject, Project};

    use super::*;
    use crate::services::testing::{setup_db, user};

    #[tokio::test]
    async fn roles_gate_each_level() {
        let db = setup_db().await;
        let owner = user(&db, "Owner").await;
        let admin = user(&db, "Admin").await;
        let member = user(&db, "Member").await;
        let outsider = user(&db, "Outsider").await;

        let project_id = Uuid::new_v4();
        Project::create(
            &db,
            &CreateProject {
                name: "Roles".to_string(),
                description: None,
            },
            owner.id,
            project_id,
        )
        .await
        .unwrap();
        ProjectMember::create(&db, project_id, owner.id, MemberRole::Owner)
            .await
            .unwrap();
        ProjectMember::create(&db, project_id, admin.id, MemberRole::Admin)
            .await
            .unwrap();
        ProjectMember::create(&db, project_id, member.id, MemberRole::Member)
            .await
            .unwrap();

        assert_eq!(
            require_member(&db, project_id, member.id).await.unwrap(),
            MemberRole::Member
        );
        assert!(matches!(
            require_member(&db, project_id, outsider.id).await,
            Err(AccessError::NotMember)
        ));
        assert!(matches!(
            require_member(&db, Uuid::new_v4(), owner.id).await,
            Err(AccessError::ProjectNotFound)
        ));

        assert!(require_manager(&db, project_id, admin.id).await.is_ok());
        assert!(matches!(
            require_manager(&db, project_id, member.id).await,
            Err(AccessError::InsufficientRole(_))
        ));

        assert!(require_owner(&db, project_id, owner.id).await.is_ok());
        assert!(matches!(
            require_owner(&db, project_id, admin.id).await,
            Err(AccessError::InsufficientRole("OWNER"))
        ));
    }
}
