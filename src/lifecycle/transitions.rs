//! Exhaustive transition tables for the three status machines.

use crate::entities::allocation::AllocationStatus;
use crate::entities::asset::AssetStatus;
use crate::entities::asset_issue::IssueStatus;
use crate::errors::ServiceError;

/// A status enum with a fixed table of legal moves.
pub trait StatusMachine: Copy + Eq + std::fmt::Display {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    fn can_transition_to(self, next: Self) -> bool;

    fn ensure_transition(self, next: Self) -> Result<(), ServiceError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(ServiceError::InvalidTransition {
                entity: Self::ENTITY,
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl StatusMachine for AssetStatus {
    const ENTITY: &'static str = "asset";

    fn can_transition_to(self, next: Self) -> bool {
        use AssetStatus::*;
        match (self, next) {
            (Free, Alloted | Reallocated | Repair) => true,
            (Alloted, Free | Repair) => true,
            (Reallocated, Free | Repair) => true,
            // Repair -> Repair is a repeated technician update; the rest are admin outcomes.
            (Repair, Repair | Repaired | Free | Alloted | Condemned) => true,
            (Repaired, Repair | Free | Alloted | Condemned) => true,
            (Condemned, _) => false,
            _ => false,
        }
    }
}

impl StatusMachine for AllocationStatus {
    const ENTITY: &'static str = "allocation";

    fn can_transition_to(self, next: Self) -> bool {
        use AllocationStatus::*;
        match (self, next) {
            (Alloted, Free | Repair) => true,
            (Reallocated, Free | Repair) => true,
            (Free, Reallocated | Repair) => true,
            (Repair, Repair | Free | Reallocated | Condemned) => true,
            (Condemned, _) => false,
            _ => false,
        }
    }
}

impl StatusMachine for IssueStatus {
    const ENTITY: &'static str = "issue";

    fn can_transition_to(self, next: Self) -> bool {
        use IssueStatus::*;
        match (self, next) {
            (Open | Assigned | InRepair | WaitingForPart, Open) => false,
            (Open | Assigned | InRepair | WaitingForPart, _) => true,
            (Resolved, Closed) => true,
            (Resolved, _) | (Closed, _) => false,
        }
    }
}

/// Statuses an asset row may be created with.
pub fn asset_creation_allowed(status: AssetStatus) -> bool {
    matches!(status, AssetStatus::Free | AssetStatus::Alloted)
}

/// Whether an asset status and the latest allocation status (if any) may be
/// committed together.
pub fn pairing_is_consistent(asset: AssetStatus, allocation: Option<AllocationStatus>) -> bool {
    match allocation {
        None => matches!(
            asset,
            AssetStatus::Free | AssetStatus::Repair | AssetStatus::Repaired | AssetStatus::Condemned
        ),
        Some(allocation) => matches!(
            (asset, allocation),
            (AssetStatus::Free, AllocationStatus::Free)
                | (AssetStatus::Alloted, AllocationStatus::Alloted)
                | (AssetStatus::Reallocated, AllocationStatus::Reallocated)
                | (AssetStatus::Repair | AssetStatus::Repaired, AllocationStatus::Repair)
                | (AssetStatus::Condemned, AllocationStatus::Condemned)
        ),
    }
}
