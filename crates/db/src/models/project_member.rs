use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{project_member, user},
    models::ids,
    types::MemberRole,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProjectMember {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: MemberRole,
    #[ts(type = "Date")]
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct AddProjectMember {
    pub email: String,
    pub role: MemberRole,
}

impl ProjectMember {
    pub async fn role_of<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MemberRole>, DbErr> {
        let (Some(project_row_id), Some(user_row_id)) = (
            ids::project_id_by_uuid(db, project_id).await?,
            ids::user_id_by_uuid(db, user_id).await?,
        ) else {
            return Ok(None);
        };
        Self::role_by_row_ids(db, project_row_id, user_row_id).await
    }

    pub async fn role_by_row_ids<C: ConnectionTrait>(
        db: &C,
        project_row_id: i64,
        user_row_id: i64,
    ) -> Result<Option<MemberRole>, DbErr> {
        let record = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .filter(project_member::Column::UserId.eq(user_row_id))
            .one(db)
            .await?;
        Ok(record.map(|m| m.role))
    }

    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let project_row_id = ids::require_project_id(db, project_id).await?;
        let rows = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .order_by_asc(project_member::Column::JoinedAt)
            .order_by_asc(project_member::Column::Id)
            .all(db)
            .await?;
        let users: HashMap<i64, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(rows.iter().map(|m| m.user_id)))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut members = Vec::with_capacity(rows.len());
        for member in rows {
            let user = users
                .get(&member.user_id)
                .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
            members.push(Self {
                user_id: user.uuid,
                email: user.email.clone(),
                name: user.name.clone(),
                avatar_url: user.avatar_url.clone(),
                role: member.role,
                joined_at: member.joined_at.into(),
            });
        }
        Ok(members)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), DbErr> {
        let project_row_id = ids::require_project_id(db, project_id).await?;
        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        let active = project_member::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            project_id: Set(project_row_id),
            user_id: Set(user_row_id),
            role: Set(role),
            joined_at: Set(Utc::now().into()),
            ..Default::default()
        };
        active.insert(db).await?;
        Ok(())
    }

    pub async fn delete<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, DbErr> {
        let (Some(project_row_id), Some(user_row_id)) = (
            ids::project_id_by_uuid(db, project_id).await?,
            ids::user_id_by_uuid(db, user_id).await?,
        ) else {
            return Ok(0);
        };
        let result = project_member::Entity::delete_many()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .filter(project_member::Column::UserId.eq(user_row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
