use db::{
    DbErr, TransactionTrait,
    models::{
        board_column::BoardColumn,
        project::{CreateProject, Project, ProjectSummary, UpdateProject},
        project_member::{AddProjectMember, ProjectMember},
        user::User,
    },
    types::MemberRole,
};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    access::{self, AccessError},
    validation,
};

#[derive(Debug, Error)]
pub enum ProjectServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("The project owner cannot be removed")]
    OwnerNotRemovable,
}

pub type Result<T> = std::result::Result<T, ProjectServiceError>;

/// A project with everything its board header needs.
#[derive(Debug, Clone, Serialize, TS)]
pub struct ProjectDetails {
    #[serde(flatten)]
    #[ts(flatten)]
    pub project: Project,
    pub members: Vec<ProjectMember>,
    pub columns: Vec<BoardColumn>,
}

#[derive(Clone, Default)]
pub struct ProjectService;

impl ProjectService {
    pub fn new() -> Self {
        Self
    }

    fn validate_name(name: &str) -> Result<String> {
        validation::bounded_text("name", name, 100).map_err(ProjectServiceError::Validation)
    }

    async fn details(pool: &db::DbPool, project: Project) -> Result<ProjectDetails> {
        let members = ProjectMember::find_by_project_id(pool, project.id).await?;
        let columns = BoardColumn::find_by_project_id(pool, project.id).await?;
        Ok(ProjectDetails {
            project,
            members,
            columns,
        })
    }

    /// Creates the project with the caller as owner and the default columns.
    pub async fn create_project(
        &self,
        pool: &db::DbPool,
        caller: &User,
        payload: CreateProject,
    ) -> Result<ProjectDetails> {
        let data = CreateProject {
            name: Self::validate_name(&payload.name)?,
            description: payload.description,
        };

        let project_id = Uuid::new_v4();
        let tx = pool.begin().await?;
        let project = Project::create(&tx, &data, caller.id, project_id).await?;
        ProjectMember::create(&tx, project_id, caller.id, MemberRole::Owner).await?;
        BoardColumn::create_defaults(&tx, project_id).await?;
        tx.commit().await?;

        tracing::info!(project_id = %project.id, owner_id = %caller.id, "created project");
        Self::details(pool, project).await
    }

    pub async fn list_projects(
        &self,
        pool: &db::DbPool,
        caller: &User,
    ) -> Result<Vec<ProjectSummary>> {
        let projects = Project::find_for_member(pool, caller.id).await?;
        let mut summaries = Vec::with_capacity(projects.len());
        for project in projects {
            summaries.push(Project::summarize(pool, project).await?);
        }
        Ok(summaries)
    }

    pub async fn get_project(
        &self,
        pool: &db::DbPool,
        caller: &User,
        project_id: Uuid,
    ) -> Result<ProjectDetails> {
        access::require_member(pool, project_id, caller.id).await?;
        let project = Project::find_by_id(pool, project_id)
            .await?
            .ok_or(AccessError::ProjectNotFound)?;
        Self::details(pool, project).await
    }

    pub async fn update_project(
        &self,
        pool: &db::DbPool,
        caller: &User,
        project_id: Uuid,
        payload: UpdateProject,
    ) -> Result<Project> {
        access::require_manager(pool, project_id, caller.id).await?;
        let name = payload
            .name
            .as_deref()
            .map(Self::validate_name)
            .transpose()?;
        let project = Project::update(
            pool,
            project_id,
            &UpdateProject {
                name,
                description: payload.description,
            },
        )
        .await?;
        Ok(project)
    }

    pub async fn delete_project(
        &self,
        pool: &db::DbPool,
        caller: &User,
        project_id: Uuid,
    ) -> Result<u64> {
        access::require_owner(pool, project_id, caller.id).await?;
        let tx = pool.begin().await?;
        let rows_affected = Project::delete(&tx, project_id).await?;
        tx.commit().await?;
        tracing::info!(project_id = %project_id, "deleted project");
        Ok(rows_affected)
    }

    pub async fn list_members(
        &self,
        pool: &db::DbPool,
        caller: &User,
        project_id: Uuid,
    ) -> Result<Vec<ProjectMember>> {
        access::require_member(pool, project_id, caller.id).await?;
        Ok(ProjectMember::find_by_project_id(pool, project_id).await?)
    }

    pub async fn add_member(
        &self,
        pool: &db::DbPool,
        caller: &User,
        project_id: Uuid,
        payload: AddProjectMember,
    ) -> Result<ProjectMember> {
        access::require_manager(pool, project_id, caller.id).await?;
        if payload.role == MemberRole::Owner {
            return Err(ProjectServiceError::Validation(
                "role must be ADMIN or MEMBER".to_string(),
            ));
        }

        let user = User::find_by_email(pool, &payload.email)
            .await?
            .ok_or_else(|| ProjectServiceError::NotFound("User not found".to_string()))?;
        if ProjectMember::role_of(pool, project_id, user.id)
            .await?
            .is_some()
        {
            return Err(ProjectServiceError::Conflict(
                "User is already a member of this project".to_string(),
            ));
        }

        ProjectMember::create(pool, project_id, user.id, payload.role).await?;
        tracing::info!(
            project_id = %project_id,
            user_id = %user.id,
            role = %payload.role,
            "added project member"
        );

        ProjectMember::find_by_project_id(pool, project_id)
            .await?
            .into_iter()
            .find(|member| member.user_id == user.id)
            .ok_or_else(|| ProjectServiceError::NotFound("Member not found".to_string()))
    }

    pub async fn remove_member(
        &self,
        pool: &db::DbPool,
        caller: &User,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<()> {
        access::require_manager(pool, project_id, caller.id).await?;
        match ProjectMember::role_of(pool, project_id, user_id).await? {
            None => Err(ProjectServiceError::NotFound("Member not found".to_string())),
            Some(MemberRole::Owner) => Err(ProjectServiceError::OwnerNotRemovable),
            Some(_) => {
                ProjectMember::delete(pool, project_id, user_id).await?;
                tracing::info!(project_id = %project_id, user_id = %user_id, "removed project member");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use db::models::{
        ids,
        task::{CreateTask, Task},
        task_dependency::TaskDependency,
    };

    use super::*;
    use crate::services::testing::{setup_db, user};

    fn create(name: &str) -> CreateProject {
        CreateProject {
            name: name.to_string(),
            description: None,
        }
    }

    fn add(email: &str, role: MemberRole) -> AddProjectMember {
        AddProjectMember {
            email: email.to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn create_project_seeds_owner_and_default_columns() {
        let db = setup_db().await;
        let owner = user(&db, "Owner").await;
        let service = ProjectService::new();

        let details = service
            .create_project(&db, &owner, create("  Launch  "))
            .await
            .unwrap();
        assert_eq!(details.project.name, "Launch");
        assert_eq!(details.project.owner_id, owner.id);
        assert_eq!(details.members.len(), 1);
        assert_eq!(details.members[0].role, MemberRole::Owner);

        let columns: Vec<(String, i32, bool)> = details
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.order_index, c.is_locked))
            .collect();
        assert_eq!(
            columns,
            vec![
                ("Backlog".to_string(), 0, false),
                ("Ready".to_string(), 1, true),
                ("In Progress".to_string(), 2, true),
                ("Review".to_string(), 3, true),
                ("Done".to_string(), 4, false),
            ]
        );

        assert!(matches!(
            service.create_project(&db, &owner, create("")).await,
            Err(ProjectServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn listing_is_scoped_to_membership() {
        let db = setup_db().await;
        let owner = user(&db, "Owner").await;
        let other = user(&db, "Other").await;
        let service = ProjectService::new();

        let details = service
            .create_project(&db, &owner, create("Mine"))
            .await
            .unwrap();
        Task::create(
            &db,
            &CreateTask::from_title(details.project.id, "First"),
            owner.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let listed = service.list_projects(&db, &owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].member_count, 1);
        assert_eq!((listed[0].tasks.total, listed[0].tasks.done), (1, 0));
        assert!(service.list_projects(&db, &other).await.unwrap().is_empty());

        assert!(matches!(
            service.get_project(&db, &other, details.project.id).await,
            Err(ProjectServiceError::Access(AccessError::NotMember))
        ));
    }

    #[tokio::test]
    async fn membership_rules() {
        let db = setup_db().await;
        let owner = user(&db, "Owner").await;
        let admin = user(&db, "Admin").await;
        let member = user(&db, "Member").await;
        let service = ProjectService::new();
        let project_id = service
            .create_project(&db, &owner, create("Team"))
            .await
            .unwrap()
            .project
            .id;

        let added = service
            .add_member(&db, &owner, project_id, add("admin@example.com", MemberRole::Admin))
            .await
            .unwrap();
        assert_eq!(added.user_id, admin.id);
        service
            .add_member(&db, &admin, project_id, add("member@example.com", MemberRole::Member))
            .await
            .unwrap();

        assert!(matches!(
            service
                .add_member(&db, &owner, project_id, add("member@example.com", MemberRole::Admin))
                .await,
            Err(ProjectServiceError::Conflict(_))
        ));
        assert!(matches!(
            service
                .add_member(&db, &owner, project_id, add("ghost@example.com", MemberRole::Member))
                .await,
            Err(ProjectServiceError::NotFound(_))
        ));
        assert!(matches!(
            service
                .add_member(&db, &member, project_id, add("owner@example.com", MemberRole::Member))
                .await,
            Err(ProjectServiceError::Access(AccessError::InsufficientRole(_)))
        ));

        assert!(matches!(
            service.remove_member(&db, &admin, project_id, owner.id).await,
            Err(ProjectServiceError::OwnerNotRemovable)
        ));
        service
            .remove_member(&db, &admin, project_id, member.id)
            .await
            .unwrap();
        assert!(matches!(
            service.remove_member(&db, &admin, project_id, member.id).await,
            Err(ProjectServiceError::NotFound(_))
        ));
        assert_eq!(
            service
                .list_members(&db, &owner, project_id)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn only_owner_deletes_and_delete_cascades() {
        let db = setup_db().await;
        let owner = user(&db, "Owner").await;
        let admin = user(&db, "Admin").await;
        let service = ProjectService::new();
        let project_id = service
            .create_project(&db, &owner, create("Doomed"))
            .await
            .unwrap()
            .project
            .id;
        service
            .add_member(&db, &owner, project_id, add("admin@example.com", MemberRole::Admin))
            .await
            .unwrap();

        let a = Task::create(&db, &CreateTask::from_title(project_id, "A"), owner.id, Uuid::new_v4())
            .await
            .unwrap();
        let b = Task::create(&db, &CreateTask::from_title(project_id, "B"), owner.id, Uuid::new_v4())
            .await
            .unwrap();
        let a_row = ids::task_id_by_uuid(&db, a.id).await.unwrap().unwrap();
        let b_row = ids::task_id_by_uuid(&db, b.id).await.unwrap().unwrap();
        TaskDependency::create(&db, a_row, b_row).await.unwrap();

        assert!(matches!(
            service.delete_project(&db, &admin, project_id).await,
            Err(ProjectServiceError::Access(AccessError::InsufficientRole("OWNER")))
        ));
        assert_eq!(service.delete_project(&db, &owner, project_id).await.unwrap(), 1);
        assert!(Project::find_by_id(&db, project_id).await.unwrap().is_none());
        assert!(Task::find_by_id(&db, a.id).await.unwrap().is_none());
        assert!(service.list_projects(&db, &admin).await.unwrap().is_empty());
    }
}
