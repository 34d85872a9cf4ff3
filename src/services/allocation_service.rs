//! Allocation engine: hand assets out, take them back, and create-and-allocate
//! straight from a purchase-order line item.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use super::acquisition_service::{asset_from_line_item, format_asset_tag, lock_line_item_and_po};
use super::{record_outcome, EmployeeInfo};
use crate::config::LifecycleConfig;
use crate::db::DatabaseAccess;
use crate::entities::allocation::{self, AllocationStatus};
use crate::entities::asset::{self, AssetStatus};
use crate::entities::asset_log::AuditEvent;
use crate::errors::ServiceError;
use crate::lifecycle::TransitionPlan;
use crate::repositories::acquisition::LineItemPatch;
use crate::repositories::allocation::{AllocationPatch, NewAllocation};
use crate::repositories::audit_log::NewAuditEntry;
use crate::repositories::{AllocationRepository, AssetRepository, Lock};

/// What an allocation operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum AllocationAction {
    Allocated,
    Reallocated,
    Deallocated,
    CreatedAndAllocated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub action: AllocationAction,
    pub asset: asset::Model,
    /// Latest allocation row after the operation.
    pub allocation: allocation::Model,
}

#[derive(Clone)]
pub struct AllocationService {
    db: DatabaseAccess,
    lifecycle: Arc<LifecycleConfig>,
}

impl AllocationService {
    pub fn new(db_pool: Arc<DatabaseConnection>, lifecycle: Arc<LifecycleConfig>) -> Self {
        Self {
            db: DatabaseAccess::new(db_pool),
            lifecycle,
        }
    }

    /// Allocates `tag` to an employee.
    ///
    /// With no custody history a first row is created. When the latest row is
    /// Free the same row is reused for the next custodian and its cycle count
    /// goes up by one.
    #[instrument(skip(self, employee), fields(employee = %employee.name))]
    pub async fn allocate(
        &self,
        tag: &str,
        employee: EmployeeInfo,
        actor_id: Option<i32>,
    ) -> Result<AllocationOutcome, ServiceError> {
        const OP: &str = "allocate";

        let tag = tag.trim();
        if tag.is_empty() {
            return Err(ServiceError::ValidationError("tag is required".to_string()));
        }
        employee.validate()?;
        let actor = self.lifecycle.resolve_actor(actor_id);

        let unit = self.db.begin(OP).await?;
        let result = self.allocate_in(unit.txn(), tag, &employee, actor).await;
        let result = unit.finish(result).await;
        record_outcome(OP, &result);
        result
    }

    async fn allocate_in<C: ConnectionTrait>(
        &self,
        txn: &C,
        tag: &str,
        employee: &EmployeeInfo,
        actor: i32,
    ) -> Result<AllocationOutcome, ServiceError> {
        let asset = AssetRepository::find_by_tag(txn, tag, Lock::Update)
            .await?
            .ok_or_else(|| ServiceError::AssetNotFound(tag.to_string()))?;

        if matches!(
            asset.status,
            AssetStatus::Condemned | AssetStatus::Repair | AssetStatus::Repaired
        ) {
            return Err(ServiceError::NotAllocatable {
                tag: tag.to_string(),
                status: asset.status,
            });
        }

        let latest = AllocationRepository::find_latest(txn, tag, Lock::Update).await?;
        let now = Utc::now();
        let assignee = employee.to_assignee(latest.as_ref(), &self.lifecycle);

        let (action, event, details) = match &latest {
            None => (
                AllocationAction::Allocated,
                AuditEvent::Allocated,
                format!("Allocated to {}", employee.audit_label()),
            ),
            Some(row) if row.status == AllocationStatus::Free => (
                AllocationAction::Reallocated,
                AuditEvent::Reallocated,
                format!(
                    "Reallocated to {}, cycle {}",
                    employee.audit_label(),
                    row.cycle_count + 1
                ),
            ),
            Some(row) => {
                return Err(ServiceError::AlreadyAllocated {
                    tag: tag.to_string(),
                    status: row.status,
                })
            }
        };

        let mut plan = TransitionPlan::new(tag, Some(asset.clone()), latest.clone());
        match latest {
            None => {
                plan.set_asset_status(AssetStatus::Alloted)
                    .insert_allocation(NewAllocation {
                        tag: tag.to_string(),
                        description: Some(asset.description.clone()),
                        value: Some(asset.value),
                        status: AllocationStatus::Alloted,
                        assignee,
                        allocated_on: now,
                        allocated_by: actor,
                        cycle_count: 0,
                    });
            }
            Some(row) => {
                plan.set_asset_status(AssetStatus::Reallocated)
                    .update_allocation(AllocationPatch {
                        status: Some(AllocationStatus::Reallocated),
                        assignee: Some(assignee),
                        allocated: Some((now, actor)),
                        cycle_count: Some(row.cycle_count + 1),
                        active: Some(true),
                        reason: Some(None),
                        ..Default::default()
                    });
            }
        }
        plan.audit(NewAuditEntry {
            tag: tag.to_string(),
            event,
            details,
            performed_by: actor,
            performed_by_role: employee.role.clone(),
        });

        let applied = plan.apply(txn).await?;
        let allocation = applied
            .allocation
            .ok_or_else(|| ServiceError::InternalError("allocation row missing after write".into()))?;

        info!(
            tag,
            allocation_id = allocation.id,
            cycle_count = allocation.cycle_count,
            %action,
            "Asset allocated"
        );

        Ok(AllocationOutcome {
            action,
            asset: applied.asset,
            allocation,
        })
    }

    /// Frees `tag`, updating the latest allocation row in place.
    #[instrument(skip(self, reason))]
    pub async fn deallocate(
        &self,
        tag: &str,
        reason: Option<String>,
        actor_id: Option<i32>,
    ) -> Result<AllocationOutcome, ServiceError> {
        const OP: &str = "deallocate";

        let tag = tag.trim();
        if tag.is_empty() {
            return Err(ServiceError::ValidationError("tag is required".to_string()));
        }
        let actor = self.lifecycle.resolve_actor(actor_id);
        let reason = reason.filter(|r| !r.trim().is_empty());

        let unit = self.db.begin(OP).await?;
        let result = self.deallocate_in(unit.txn(), tag, reason, actor).await;
        let result = unit.finish(result).await;
        record_outcome(OP, &result);
        result
    }

    async fn deallocate_in<C: ConnectionTrait>(
        &self,
        txn: &C,
        tag: &str,
        reason: Option<String>,
        actor: i32,
    ) -> Result<AllocationOutcome, ServiceError> {
        let asset = AssetRepository::find_by_tag(txn, tag, Lock::Update)
            .await?
            .ok_or_else(|| ServiceError::AssetNotFound(tag.to_string()))?;
        let latest = AllocationRepository::find_latest(txn, tag, Lock::Update)
            .await?
            .ok_or_else(|| ServiceError::NoAllocationRecord(tag.to_string()))?;

        match latest.status {
            AllocationStatus::Free => return Err(ServiceError::AlreadyFree(tag.to_string())),
            // Released only through repair finalization.
            AllocationStatus::Repair | AllocationStatus::Condemned => {
                return Err(ServiceError::InvalidTransition {
                    entity: "allocation",
                    from: latest.status.to_string(),
                    to: AllocationStatus::Free.to_string(),
                })
            }
            AllocationStatus::Alloted | AllocationStatus::Reallocated => {}
        }

        let details = reason
            .clone()
            .unwrap_or_else(|| format!("Deallocated by {}", actor));

        let mut plan = TransitionPlan::new(tag, Some(asset), Some(latest));
        plan.set_asset_status(AssetStatus::Free)
            .update_allocation(AllocationPatch {
                status: Some(AllocationStatus::Free),
                deallocated: Some((Utc::now(), actor)),
                active: Some(true),
                reason: Some(reason),
                ..Default::default()
            })
            .audit(NewAuditEntry {
                tag: tag.to_string(),
                event: AuditEvent::Deallocated,
                details,
                performed_by: actor,
                performed_by_role: None,
            });

        let applied = plan.apply(txn).await?;
        let allocation = applied
            .allocation
            .ok_or_else(|| ServiceError::InternalError("allocation row missing after write".into()))?;

        info!(tag, allocation_id = allocation.id, "Asset deallocated");

        Ok(AllocationOutcome {
            action: AllocationAction::Deallocated,
            asset: applied.asset,
            allocation,
        })
    }

    /// Creates one asset out of a line item and allocates it in the same
    /// transaction. The line item gives up one unit of available quantity.
    #[instrument(skip(self, employee), fields(employee = %employee.name))]
    pub async fn allocate_from_line_item(
        &self,
        line_item_id: i32,
        employee: EmployeeInfo,
        actor_id: Option<i32>,
    ) -> Result<AllocationOutcome, ServiceError> {
        const OP: &str = "allocate_from_line_item";

        employee.validate()?;
        let actor = self.lifecycle.resolve_actor(actor_id);

        let unit = self.db.begin(OP).await?;
        let result = self
            .allocate_from_line_item_in(unit.txn(), line_item_id, &employee, actor)
            .await;
        let result = unit.finish(result).await;
        record_outcome(OP, &result);
        result
    }

    async fn allocate_from_line_item_in<C: ConnectionTrait>(
        &self,
        txn: &C,
        line_item_id: i32,
        employee: &EmployeeInfo,
        actor: i32,
    ) -> Result<AllocationOutcome, ServiceError> {
        let (line_item, po) = lock_line_item_and_po(txn, line_item_id).await?;
        if line_item.available_qty <= 0 {
            return Err(ServiceError::NoAvailableQuantity(line_item_id));
        }

        let sequence =
            AssetRepository::next_tag_sequence(txn, self.lifecycle.tag_sequence_start, Lock::Update)
                .await?;
        let tag = format_asset_tag(&po.po_no, po.po_date, sequence);
        let new_asset = asset_from_line_item(
            &line_item,
            &po,
            tag.clone(),
            AssetStatus::Alloted,
            format!("Created and allocated from LI {}", line_item.id),
        );

        let mut plan = TransitionPlan::new(tag.clone(), None, None);
        plan.insert_allocation(NewAllocation {
            tag: tag.clone(),
            description: Some(new_asset.description.clone()),
            value: Some(new_asset.value),
            status: AllocationStatus::Alloted,
            assignee: employee.to_assignee(None, &self.lifecycle),
            allocated_on: Utc::now(),
            allocated_by: actor,
            cycle_count: 0,
        })
        .create_asset(new_asset)
        .update_line_item(
            line_item,
            LineItemPatch {
                available_delta: -1,
                allocated_delta: 1,
                ..Default::default()
            },
        )
        .audit(NewAuditEntry {
            tag: tag.clone(),
            event: AuditEvent::Allocated,
            details: format!("Allocated on creation to {}", employee.audit_label()),
            performed_by: actor,
            performed_by_role: employee.role.clone(),
        });

        let applied = plan.apply(txn).await?;
        let allocation = applied
            .allocation
            .ok_or_else(|| ServiceError::InternalError("allocation row missing after write".into()))?;

        info!(
            tag = %tag,
            line_item_id,
            allocation_id = allocation.id,
            "Asset created and allocated from line item"
        );

        Ok(AllocationOutcome {
            action: AllocationAction::CreatedAndAllocated,
            asset: applied.asset,
            allocation,
        })
    }

    /// Custody history for `tag`, oldest row first.
    pub async fn allocation_history(
        &self,
        tag: &str,
    ) -> Result<Vec<allocation::Model>, ServiceError> {
        AllocationRepository::history(self.db.get_pool(), tag).await
    }

    /// Assignee of the latest allocation row, used to prefill a reallocation.
    pub async fn last_allocation(&self, tag: &str) -> Result<Option<EmployeeInfo>, ServiceError> {
        let db = self.db.get_pool();
        AssetRepository::find_by_tag(db, tag, Lock::None)
            .await?
            .ok_or_else(|| ServiceError::AssetNotFound(tag.to_string()))?;
        Ok(AllocationRepository::find_latest(db, tag, Lock::None)
            .await?
            .as_ref()
            .map(EmployeeInfo::from))
    }

    pub async fn find_asset(&self, tag: &str) -> Result<asset::Model, ServiceError> {
        AssetRepository::find_by_tag(self.db.get_pool(), tag, Lock::None)
            .await?
            .ok_or_else(|| ServiceError::AssetNotFound(tag.to_string()))
    }

    pub async fn assets_with_status(
        &self,
        status: AssetStatus,
    ) -> Result<Vec<asset::Model>, ServiceError> {
        AssetRepository::list_by_status(self.db.get_pool(), status).await
    }
}
