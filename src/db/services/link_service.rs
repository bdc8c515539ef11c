use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::db::entities::{link, prelude::Link};

#[derive(Debug, thiserror::Error)]
pub enum LinkServiceError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),
    #[error("Link not found: {0}")]
    NotFound(Uuid),
}

/// Fields accepted by a partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPatch {
    pub link_name: Option<String>,
    pub actual_link: Option<String>,
}

impl LinkPatch {
    pub fn is_empty(&self) -> bool {
        self.link_name.is_none() && self.actual_link.is_none()
    }
}

pub struct LinkService;

impl LinkService {
    pub async fn create_link(
        db: &DbConn,
        user_id: String,
        link_name: String,
        actual_link: String,
    ) -> Result<link::Model, LinkServiceError> {
        let new_link = link::ActiveModel {
            id: Set(Uuid::new_v4()),
            link_name: Set(link_name),
            actual_link: Set(actual_link),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        };

        Ok(new_link.insert(db).await?)
    }

    /// Newest first; ties on `created_at` fall back to id order.
    pub async fn get_links_by_user(
        db: &DbConn,
        user_id: &str,
    ) -> Result<Vec<link::Model>, LinkServiceError> {
        let links = Link::find()
            .filter(link::Column::UserId.eq(user_id))
            .order_by_desc(link::Column::CreatedAt)
            .order_by_desc(link::Column::Id)
            .all(db)
            .await?;
        Ok(links)
    }

    pub async fn get_link_by_id(
        db: &DbConn,
        link_id: Uuid,
    ) -> Result<link::Model, LinkServiceError> {
        Link::find_by_id(link_id)
            .one(db)
            .await?
            .ok_or(LinkServiceError::NotFound(link_id))
    }

    pub async fn update_link(
        db: &DbConn,
        link_id: Uuid,
        patch: LinkPatch,
    ) -> Result<link::Model, LinkServiceError> {
        let existing = Self::get_link_by_id(db, link_id).await?;
        if patch.is_empty() {
            return Ok(existing);
        }

        let mut active_link: link::ActiveModel = existing.into();
        if let Some(link_name) = patch.link_name {
            active_link.link_name = Set(link_name);
        }
        if let Some(actual_link) = patch.actual_link {
            active_link.actual_link = Set(actual_link);
        }

        Ok(active_link.update(db).await?)
    }

    /// Removes the link and hands back the row as it was before deletion.
    pub async fn delete_link(
        db: &DbConn,
        link_id: Uuid,
    ) -> Result<link::Model, LinkServiceError> {
        let existing = Self::get_link_by_id(db, link_id).await?;
        Self::delete_existing(db, existing).await
    }

    /// A concurrent delete may remove the row between lookup and delete; the
    /// loser reports `NotFound`.
    async fn delete_existing(
        db: &DbConn,
        existing: link::Model,
    ) -> Result<link::Model, LinkServiceError> {
        let result = Link::delete_by_id(existing.id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(LinkServiceError::NotFound(existing.id));
        }
        Ok(existing)
    }
}
