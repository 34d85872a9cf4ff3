use sea_orm::error::DbErr;
use serde::Serialize;

use crate::entities::{allocation::AllocationStatus, asset::AssetStatus};

/// Coarse classification of a [`ServiceError`], used by callers that only need
/// to decide how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidInput,
    StoreFailure,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Issue not found: {0}")]
    IssueNotFound(i32),

    #[error("Line item not found: {0}")]
    LineItemNotFound(i32),

    #[error("Purchase order not found: {0}")]
    PurchaseOrderNotFound(String),

    #[error("Allocation record not found for asset {0}")]
    NoAllocationRecord(String),

    /// Raised for Condemned assets and for assets still in the repair loop
    /// (Repair or Repaired) until an admin finalizes the ticket.
    #[error("Asset {tag} is not allocatable while {status}")]
    NotAllocatable { tag: String, status: AssetStatus },

    #[error("Asset {tag} is already allocated ({status}); deallocate it first")]
    AlreadyAllocated {
        tag: String,
        status: AllocationStatus,
    },

    #[error("Asset {tag} already has an open repair ticket ({issue_id})")]
    IssueAlreadyOpen { tag: String, issue_id: i32 },

    #[error("Asset {0} is already free")]
    AlreadyFree(String),

    #[error("No available quantity left on line item {0}")]
    NoAvailableQuantity(i32),

    #[error("Invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Inconsistent state for asset {tag}: asset {asset_status} with allocation {allocation_status}")]
    InconsistentState {
        tag: String,
        asset_status: String,
        allocation_status: String,
    },

    #[error("Employee details are required for reallocation")]
    MissingEmployeeInfo,

    #[error("Invalid technician action: {0}")]
    InvalidAction(String),

    #[error("Invalid finalize action: {0}")]
    InvalidFinalizeAction(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Maps the error onto the four failure kinds callers act on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AssetNotFound(_)
            | Self::IssueNotFound(_)
            | Self::LineItemNotFound(_)
            | Self::PurchaseOrderNotFound(_)
            | Self::NoAllocationRecord(_) => ErrorKind::NotFound,
            Self::NotAllocatable { .. }
            | Self::AlreadyAllocated { .. }
            | Self::IssueAlreadyOpen { .. }
            | Self::AlreadyFree(_)
            | Self::NoAvailableQuantity(_)
            | Self::InvalidTransition { .. }
            | Self::InconsistentState { .. } => ErrorKind::InvalidState,
            Self::MissingEmployeeInfo
            | Self::InvalidAction(_)
            | Self::InvalidFinalizeAction(_)
            | Self::ValidationError(_) => ErrorKind::InvalidInput,
            Self::DatabaseError(_) | Self::InternalError(_) => ErrorKind::StoreFailure,
        }
    }

    /// Message suitable for showing to an operator.
    /// Store failures return a generic message to avoid leaking connection details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}
