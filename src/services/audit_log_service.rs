use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::db::DatabaseAccess;
use crate::entities::asset_log;
use crate::errors::ServiceError;
use crate::repositories::{AssetRepository, AuditLogRepository, Lock};

/// Read side of the audit trail. Entries are written by the engines as part
/// of each transition.
#[derive(Clone)]
pub struct AuditLogService {
    db: DatabaseAccess,
}

impl AuditLogService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self {
            db: DatabaseAccess::new(db_pool),
        }
    }

    /// Every event recorded for `tag`, oldest first.
    pub async fn asset_history(&self, tag: &str) -> Result<Vec<asset_log::Model>, ServiceError> {
        let db = self.db.get_pool();
        AssetRepository::find_by_tag(db, tag, Lock::None)
            .await?
            .ok_or_else(|| ServiceError::AssetNotFound(tag.to_string()))?;
        AuditLogRepository::for_tag(db, tag).await
    }
}
