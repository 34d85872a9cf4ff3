use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

use super::{with_lock, Lock};
use crate::entities::asset;
use crate::entities::asset_issue::{
    self, Entity as AssetIssue, IssueCategory, IssuePriority, IssueStatus,
};
use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub tag: String,
    pub raised_by: i32,
    pub category: IssueCategory,
    pub priority: IssuePriority,
    pub description: String,
}

/// Partial update of an issue row. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuePatch {
    pub status: Option<IssueStatus>,
    pub assigned_to: Option<i32>,
    pub resolution_note: Option<Option<String>>,
    pub closed_at: Option<DateTime<Utc>>,
}

pub struct IssueRepository;

impl IssueRepository {
    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: i32,
        lock: Lock,
    ) -> Result<Option<asset_issue::Model>, ServiceError> {
        let select = AssetIssue::find_by_id(id);
        with_lock(select, db, lock)
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        fields: NewIssue,
    ) -> Result<asset_issue::Model, ServiceError> {
        asset_issue::ActiveModel {
            tag: Set(fields.tag),
            raised_by: Set(fields.raised_by),
            category: Set(fields.category),
            priority: Set(fields.priority),
            description: Set(fields.description),
            status: Set(IssueStatus::Open),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        row: asset_issue::Model,
        patch: IssuePatch,
    ) -> Result<asset_issue::Model, ServiceError> {
        let mut active = row.into_active_model();

        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(technician) = patch.assigned_to {
            active.assigned_to = Set(Some(technician));
        }
        if let Some(note) = patch.resolution_note {
            active.resolution_note = Set(note);
        }
        if let Some(at) = patch.closed_at {
            active.closed_at = Set(Some(at));
        }

        active.update(db).await.map_err(ServiceError::db_error)
    }

    /// Tickets a technician is currently working, newest first.
    pub async fn assigned_to<C: ConnectionTrait>(
        db: &C,
        technician_id: i32,
    ) -> Result<Vec<asset_issue::Model>, ServiceError> {
        AssetIssue::find()
            .filter(asset_issue::Column::AssignedTo.eq(technician_id))
            .filter(asset_issue::Column::Status.is_in([
                IssueStatus::Assigned,
                IssueStatus::InRepair,
                IssueStatus::WaitingForPart,
            ]))
            .order_by_desc(asset_issue::Column::CreatedAt)
            .order_by_desc(asset_issue::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Every ticket that has not been closed, newest first.
    pub async fn open<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Vec<asset_issue::Model>, ServiceError> {
        AssetIssue::find()
            .filter(asset_issue::Column::Status.ne(IssueStatus::Closed))
            .order_by_desc(asset_issue::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Resolved tickets joined with their asset, oldest first.
    pub async fn resolved_with_asset<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Vec<(asset_issue::Model, Option<asset::Model>)>, ServiceError> {
        AssetIssue::find()
            .filter(asset_issue::Column::Status.eq(IssueStatus::Resolved))
            .find_also_related(asset::Entity)
            .order_by_asc(asset_issue::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// The newest ticket on `tag` that has not been closed.
    pub async fn open_for_tag<C: ConnectionTrait>(
        db: &C,
        tag: &str,
        lock: Lock,
    ) -> Result<Option<asset_issue::Model>, ServiceError> {
        let select = AssetIssue::find()
            .filter(asset_issue::Column::Tag.eq(tag))
            .filter(asset_issue::Column::Status.ne(IssueStatus::Closed))
            .order_by_desc(asset_issue::Column::Id);
        with_lock(select, db, lock)
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn for_tag<C: ConnectionTrait>(
        db: &C,
        tag: &str,
    ) -> Result<Vec<asset_issue::Model>, ServiceError> {
        AssetIssue::find()
            .filter(asset_issue::Column::Tag.eq(tag))
            .order_by_asc(asset_issue::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}
