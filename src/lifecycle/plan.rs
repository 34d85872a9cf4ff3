//! Compute-then-apply unit for one tag.
//!
//! An engine operation reads and locks the rows it needs, records every write
//! it intends to make on a [`TransitionPlan`], and calls
//! [`TransitionPlan::validate`]. Nothing touches the store until
//! [`TransitionPlan::apply`], which runs inside the caller's transaction.

use sea_orm::ConnectionTrait;

use super::transitions::{asset_creation_allowed, pairing_is_consistent, StatusMachine};
use crate::entities::allocation::{self, AllocationStatus};
use crate::entities::asset::{self, AssetStatus};
use crate::entities::asset_issue::{self, IssueStatus};
use crate::entities::{acquisition_line_item, asset_log};
use crate::errors::ServiceError;
use crate::repositories::acquisition::LineItemPatch;
use crate::repositories::allocation::{AllocationPatch, NewAllocation};
use crate::repositories::asset::NewAsset;
use crate::repositories::audit_log::NewAuditEntry;
use crate::repositories::issue::{IssuePatch, NewIssue};
use crate::repositories::{
    AcquisitionRepository, AllocationRepository, AssetRepository, AuditLogRepository,
    IssueRepository,
};

#[derive(Debug, Clone)]
enum AssetWrite {
    Create(NewAsset),
    Status(AssetStatus),
}

#[derive(Debug, Clone)]
enum IssueWrite {
    Create(NewIssue),
    Update {
        current: asset_issue::Model,
        patch: IssuePatch,
    },
}

/// Every write one operation makes against a single tag.
#[derive(Debug, Clone)]
pub struct TransitionPlan {
    tag: String,
    asset: Option<asset::Model>,
    latest_allocation: Option<allocation::Model>,
    asset_write: Option<AssetWrite>,
    allocation_update: Option<AllocationPatch>,
    allocation_insert: Option<NewAllocation>,
    issue_write: Option<IssueWrite>,
    line_item_write: Option<(acquisition_line_item::Model, LineItemPatch)>,
    audit: Vec<NewAuditEntry>,
}

/// Rows as they stand after a plan was applied.
#[derive(Debug, Clone)]
pub struct AppliedPlan {
    pub asset: asset::Model,
    /// Latest allocation row for the tag after the writes.
    pub allocation: Option<allocation::Model>,
    /// Row that was updated when a new row was also inserted.
    pub superseded_allocation: Option<allocation::Model>,
    pub issue: Option<asset_issue::Model>,
    pub line_item: Option<acquisition_line_item::Model>,
    pub audit: Vec<asset_log::Model>,
}

impl TransitionPlan {
    /// Starts a plan from the locked baseline rows of `tag`.
    pub fn new(
        tag: impl Into<String>,
        asset: Option<asset::Model>,
        latest_allocation: Option<allocation::Model>,
    ) -> Self {
        Self {
            tag: tag.into(),
            asset,
            latest_allocation,
            asset_write: None,
            allocation_update: None,
            allocation_insert: None,
            issue_write: None,
            line_item_write: None,
            audit: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn asset(&self) -> Option<&asset::Model> {
        self.asset.as_ref()
    }

    pub fn latest_allocation(&self) -> Option<&allocation::Model> {
        self.latest_allocation.as_ref()
    }

    pub fn create_asset(&mut self, fields: NewAsset) -> &mut Self {
        self.asset_write = Some(AssetWrite::Create(fields));
        self
    }

    pub fn set_asset_status(&mut self, status: AssetStatus) -> &mut Self {
        self.asset_write = Some(AssetWrite::Status(status));
        self
    }

    pub fn update_allocation(&mut self, patch: AllocationPatch) -> &mut Self {
        self.allocation_update = Some(patch);
        self
    }

    pub fn insert_allocation(&mut self, fields: NewAllocation) -> &mut Self {
        self.allocation_insert = Some(fields);
        self
    }

    pub fn create_issue(&mut self, fields: NewIssue) -> &mut Self {
        self.issue_write = Some(IssueWrite::Create(fields));
        self
    }

    pub fn update_issue(&mut self, current: asset_issue::Model, patch: IssuePatch) -> &mut Self {
        self.issue_write = Some(IssueWrite::Update { current, patch });
        self
    }

    pub fn update_line_item(
        &mut self,
        current: acquisition_line_item::Model,
        patch: LineItemPatch,
    ) -> &mut Self {
        self.line_item_write = Some((current, patch));
        self
    }

    pub fn audit(&mut self, entry: NewAuditEntry) -> &mut Self {
        self.audit.push(entry);
        self
    }

    /// Asset status the plan leaves behind, if the asset exists afterwards.
    pub fn resulting_asset_status(&self) -> Option<AssetStatus> {
        match &self.asset_write {
            Some(AssetWrite::Create(fields)) => Some(fields.status),
            Some(AssetWrite::Status(status)) => Some(*status),
            None => self.asset.as_ref().map(|a| a.status),
        }
    }

    /// Status of the latest allocation row once the plan is applied.
    pub fn resulting_allocation_status(&self) -> Option<AllocationStatus> {
        if let Some(insert) = &self.allocation_insert {
            return Some(insert.status);
        }
        let current = self.latest_allocation.as_ref()?;
        Some(
            self.allocation_update
                .as_ref()
                .and_then(|patch| patch.status)
                .unwrap_or(current.status),
        )
    }

    fn resulting_issue_status(&self) -> Option<IssueStatus> {
        match &self.issue_write {
            Some(IssueWrite::Create(_)) => Some(IssueStatus::Open),
            Some(IssueWrite::Update { current, patch }) => {
                Some(patch.status.unwrap_or(current.status))
            }
            None => None,
        }
    }

    /// Checks every write against the transition tables and the cross-entity
    /// pairing. Returns the first violation found.
    pub fn validate(&self) -> Result<(), ServiceError> {
        match (&self.asset, &self.asset_write) {
            (Some(_), Some(AssetWrite::Create(_))) => {
                return Err(ServiceError::ValidationError(format!(
                    "asset tag {} already exists",
                    self.tag
                )));
            }
            (None, Some(AssetWrite::Status(_))) | (None, None) => {
                return Err(ServiceError::AssetNotFound(self.tag.clone()));
            }
            (None, Some(AssetWrite::Create(fields))) => {
                if !asset_creation_allowed(fields.status) {
                    return Err(ServiceError::InvalidTransition {
                        entity: AssetStatus::ENTITY,
                        from: "(new)".to_string(),
                        to: fields.status.to_string(),
                    });
                }
            }
            (Some(current), Some(AssetWrite::Status(next))) => {
                current.status.ensure_transition(*next)?;
            }
            (Some(_), None) => {}
        }

        if let Some(patch) = &self.allocation_update {
            let current = self
                .latest_allocation
                .as_ref()
                .ok_or_else(|| ServiceError::NoAllocationRecord(self.tag.clone()))?;
            if let Some(next) = patch.status {
                current.status.ensure_transition(next)?;
            }
            if let Some(cycle) = patch.cycle_count {
                if cycle < current.cycle_count {
                    return Err(ServiceError::ValidationError(format!(
                        "cycle count for {} cannot go back from {} to {}",
                        self.tag, current.cycle_count, cycle
                    )));
                }
            }
        }

        if let Some(insert) = &self.allocation_insert {
            if insert.status != AllocationStatus::Alloted {
                return Err(ServiceError::InvalidTransition {
                    entity: AllocationStatus::ENTITY,
                    from: "(new)".to_string(),
                    to: insert.status.to_string(),
                });
            }
            let previous_cycle = self.latest_allocation.as_ref().map(|row| {
                self.allocation_update
                    .as_ref()
                    .and_then(|patch| patch.cycle_count)
                    .unwrap_or(row.cycle_count)
            });
            if let Some(previous) = previous_cycle {
                if insert.cycle_count < previous {
                    return Err(ServiceError::ValidationError(format!(
                        "cycle count for {} cannot go back from {} to {}",
                        self.tag, previous, insert.cycle_count
                    )));
                }
            }
        }

        if let Some(IssueWrite::Update { current, patch }) = &self.issue_write {
            if let Some(next) = patch.status {
                current.status.ensure_transition(next)?;
            }
        }

        if let Some((row, patch)) = &self.line_item_write {
            if row.available_qty + patch.available_delta < 0 {
                return Err(ServiceError::NoAvailableQuantity(row.id));
            }
        }

        let asset_status = self
            .resulting_asset_status()
            .ok_or_else(|| ServiceError::AssetNotFound(self.tag.clone()))?;
        let allocation_status = self.resulting_allocation_status();
        if !pairing_is_consistent(asset_status, allocation_status) {
            return Err(self.inconsistent(asset_status, allocation_status));
        }

        // An open ticket keeps the asset in the repair loop.
        if self.resulting_issue_status().is_some_and(IssueStatus::is_open) {
            let in_repair = matches!(asset_status, AssetStatus::Repair | AssetStatus::Repaired)
                && matches!(allocation_status, None | Some(AllocationStatus::Repair));
            if !in_repair {
                return Err(self.inconsistent(asset_status, allocation_status));
            }
        }

        Ok(())
    }

    fn inconsistent(
        &self,
        asset_status: AssetStatus,
        allocation_status: Option<AllocationStatus>,
    ) -> ServiceError {
        ServiceError::InconsistentState {
            tag: self.tag.clone(),
            asset_status: asset_status.to_string(),
            allocation_status: allocation_status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string()),
        }
    }

    /// Validates, then performs the writes in a fixed order: asset, allocation
    /// update, allocation insert, issue, line item, audit entries.
    pub async fn apply<C: ConnectionTrait>(self, db: &C) -> Result<AppliedPlan, ServiceError> {
        self.validate()?;

        let TransitionPlan {
            tag,
            asset,
            latest_allocation,
            asset_write,
            allocation_update,
            allocation_insert,
            issue_write,
            line_item_write,
            audit,
        } = self;

        let asset = match (asset, asset_write) {
            (None, Some(AssetWrite::Create(fields))) => AssetRepository::create(db, fields).await?,
            (Some(row), Some(AssetWrite::Status(status))) => {
                AssetRepository::update_status(db, row, status).await?
            }
            (Some(row), None) => row,
            _ => return Err(ServiceError::AssetNotFound(tag)),
        };

        let mut latest = match (latest_allocation, allocation_update) {
            (Some(row), Some(patch)) => Some(AllocationRepository::update(db, row, patch).await?),
            (row, _) => row,
        };

        let mut superseded = None;
        if let Some(fields) = allocation_insert {
            let inserted = AllocationRepository::create(db, fields).await?;
            superseded = latest.replace(inserted);
        }

        let issue = match issue_write {
            Some(IssueWrite::Create(fields)) => Some(IssueRepository::create(db, fields).await?),
            Some(IssueWrite::Update { current, patch }) => {
                Some(IssueRepository::update(db, current, patch).await?)
            }
            None => None,
        };

        let line_item = match line_item_write {
            Some((row, patch)) => Some(AcquisitionRepository::update_line_item(db, row, patch).await?),
            None => None,
        };

        let allocation_id = latest.as_ref().map(|row| row.id);
        let mut written = Vec::with_capacity(audit.len());
        for entry in audit {
            written.push(AuditLogRepository::append(db, allocation_id, entry).await?);
        }

        Ok(AppliedPlan {
            asset,
            allocation: latest,
            superseded_allocation: superseded,
            issue,
            line_item,
            audit: written,
        })
    }
}
