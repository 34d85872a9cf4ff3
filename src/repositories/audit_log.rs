use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entities::asset_log::{self, AuditEvent, Entity as AssetLog};
use crate::errors::ServiceError;

/// One audit entry to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub tag: String,
    pub event: AuditEvent,
    pub details: String,
    pub performed_by: i32,
    pub performed_by_role: Option<String>,
}

pub struct AuditLogRepository;

impl AuditLogRepository {
    pub async fn append<C: ConnectionTrait>(
        db: &C,
        allocation_id: Option<i32>,
        entry: NewAuditEntry,
    ) -> Result<asset_log::Model, ServiceError> {
        asset_log::ActiveModel {
            allocation_id: Set(allocation_id),
            tag: Set(entry.tag),
            event: Set(entry.event),
            details: Set(Some(entry.details)),
            performed_by: Set(entry.performed_by),
            performed_by_role: Set(entry.performed_by_role),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    /// Audit trail for `tag` in the order it was written.
    pub async fn for_tag<C: ConnectionTrait>(
        db: &C,
        tag: &str,
    ) -> Result<Vec<asset_log::Model>, ServiceError> {
        AssetLog::find()
            .filter(asset_log::Column::Tag.eq(tag))
            .order_by_asc(asset_log::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}
