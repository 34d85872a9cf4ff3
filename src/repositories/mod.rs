//! Store operations used by the lifecycle engines.
//!
//! Every function is generic over [`ConnectionTrait`] so it runs the same way
//! on the pool or inside an open transaction. Reads that precede a write take
//! a [`Lock`].

use sea_orm::{ConnectionTrait, DbBackend, EntityTrait, QuerySelect, Select};

pub mod acquisition;
pub mod allocation;
pub mod asset;
pub mod audit_log;
pub mod issue;

pub use acquisition::AcquisitionRepository;
pub use allocation::AllocationRepository;
pub use asset::AssetRepository;
pub use audit_log::AuditLogRepository;
pub use issue::IssueRepository;

/// Row lock requested by a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lock {
    #[default]
    None,
    /// Pessimistic write lock (`SELECT ... FOR UPDATE`) held until the
    /// surrounding transaction ends.
    Update,
}

/// Adds the row-lock clause to `select` when the backend supports it.
///
/// SQLite has no row locks; writers there are serialized by the database lock.
pub(crate) fn with_lock<E, C>(select: Select<E>, db: &C, lock: Lock) -> Select<E>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    match (lock, db.get_database_backend()) {
        (Lock::None, _) | (Lock::Update, DbBackend::Sqlite) => select,
        (Lock::Update, _) => select.lock_exclusive(),
    }
}
