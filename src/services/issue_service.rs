//! Repair workflow engine: tickets move Open -> Assigned -> InRepair /
//! WaitingForPart -> Resolved -> Closed, dragging the asset and its latest
//! allocation row through Repair and out again at admin finalization.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use super::{record_outcome, EmployeeInfo};
use crate::config::LifecycleConfig;
use crate::db::DatabaseAccess;
use crate::entities::allocation::{self, AllocationStatus};
use crate::entities::asset::{self, AssetStatus};
use crate::entities::asset_issue::{self, IssueCategory, IssuePriority, IssueStatus};
use crate::entities::asset_log::AuditEvent;
use crate::errors::ServiceError;
use crate::lifecycle::TransitionPlan;
use crate::repositories::allocation::{AllocationPatch, NewAllocation};
use crate::repositories::audit_log::NewAuditEntry;
use crate::repositories::issue::{IssuePatch, NewIssue};
use crate::repositories::{AllocationRepository, AssetRepository, IssueRepository, Lock};

const TECHNICIAN_ROLE: &str = "technician";
const ADMIN_ROLE: &str = "admin";

/// Quick status update sent by a technician working a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::EnumString, strum::Display)]
#[strum(ascii_case_insensitive)]
pub enum TechnicianAction {
    StartRepair,
    InRepair,
    WaitingForPart,
}

impl TechnicianAction {
    pub fn parse(action: &str) -> Result<Self, ServiceError> {
        Self::from_str(action.trim()).map_err(|_| ServiceError::InvalidAction(action.to_string()))
    }
}

/// Terminal disposition chosen by an admin for a repaired asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FinalizeAction {
    Free,
    Reallocate,
    Condemn,
}

impl FinalizeAction {
    pub fn parse(action: &str) -> Result<Self, ServiceError> {
        Self::from_str(action.trim())
            .map_err(|_| ServiceError::InvalidFinalizeAction(action.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeOutcome {
    pub action: FinalizeAction,
    pub issue: asset_issue::Model,
    pub asset: asset::Model,
    /// Latest allocation row after finalization.
    pub allocation: Option<allocation::Model>,
    /// Previous custody row, deactivated when a reallocation inserted a new one.
    pub superseded_allocation: Option<allocation::Model>,
}

/// A resolved ticket waiting for the admin, with its asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingFinalization {
    pub issue: asset_issue::Model,
    pub asset: Option<asset::Model>,
}

/// Rows locked at the start of every ticket operation.
struct LockedTicket {
    issue: asset_issue::Model,
    asset: asset::Model,
    latest: Option<allocation::Model>,
}

async fn lock_ticket<C: ConnectionTrait>(db: &C, issue_id: i32) -> Result<LockedTicket, ServiceError> {
    let issue = IssueRepository::find_by_id(db, issue_id, Lock::Update)
        .await?
        .ok_or(ServiceError::IssueNotFound(issue_id))?;
    let asset = AssetRepository::find_by_tag(db, &issue.tag, Lock::Update)
        .await?
        .ok_or_else(|| ServiceError::AssetNotFound(issue.tag.clone()))?;
    let latest = AllocationRepository::find_latest(db, &issue.tag, Lock::Update).await?;
    Ok(LockedTicket {
        issue,
        asset,
        latest,
    })
}

fn entry(tag: &str, event: AuditEvent, details: String, by: i32, role: &str) -> NewAuditEntry {
    NewAuditEntry {
        tag: tag.to_string(),
        event,
        details,
        performed_by: by,
        performed_by_role: Some(role.to_string()),
    }
}

fn written_issue(issue: Option<asset_issue::Model>) -> Result<asset_issue::Model, ServiceError> {
    issue.ok_or_else(|| ServiceError::InternalError("issue row missing after write".into()))
}

#[derive(Clone)]
pub struct IssueService {
    db: DatabaseAccess,
    lifecycle: Arc<LifecycleConfig>,
}

impl IssueService {
    pub fn new(db_pool: Arc<DatabaseConnection>, lifecycle: Arc<LifecycleConfig>) -> Self {
        Self {
            db: DatabaseAccess::new(db_pool),
            lifecycle,
        }
    }

    /// Opens a repair ticket with the default priority.
    pub async fn raise_issue(
        &self,
        tag: &str,
        raised_by: Option<i32>,
        category: IssueCategory,
        description: &str,
    ) -> Result<asset_issue::Model, ServiceError> {
        self.raise_issue_with_priority(tag, raised_by, category, IssuePriority::default(), description)
            .await
    }

    /// Opens a repair ticket. The asset and its latest allocation row go to Repair.
    ///
    /// A tag carries at most one ticket that is not Closed.
    #[instrument(skip(self, description))]
    pub async fn raise_issue_with_priority(
        &self,
        tag: &str,
        raised_by: Option<i32>,
        category: IssueCategory,
        priority: IssuePriority,
        description: &str,
    ) -> Result<asset_issue::Model, ServiceError> {
        const OP: &str = "raise_issue";

        let tag = tag.trim();
        let description = description.trim();
        if tag.is_empty() || description.is_empty() {
            return Err(ServiceError::ValidationError(
                "tag and description are required".to_string(),
            ));
        }
        let raised_by = self.lifecycle.resolve_actor(raised_by);

        let unit = self.db.begin(OP).await?;
        let result = async {
            let txn = unit.txn();
            let asset = AssetRepository::find_by_tag(txn, tag, Lock::Update)
                .await?
                .ok_or_else(|| ServiceError::AssetNotFound(tag.to_string()))?;
            if let Some(open) = IssueRepository::open_for_tag(txn, tag, Lock::Update).await? {
                return Err(ServiceError::IssueAlreadyOpen {
                    tag: tag.to_string(),
                    issue_id: open.id,
                });
            }
            let latest = AllocationRepository::find_latest(txn, tag, Lock::Update).await?;
            let has_allocation = latest.is_some();

            let mut plan = TransitionPlan::new(tag, Some(asset), latest);
            plan.set_asset_status(AssetStatus::Repair);
            if has_allocation {
                plan.update_allocation(AllocationPatch::status(AllocationStatus::Repair));
            }
            plan.create_issue(NewIssue {
                tag: tag.to_string(),
                raised_by,
                category,
                priority,
                description: description.to_string(),
            })
            .audit(NewAuditEntry {
                tag: tag.to_string(),
                event: AuditEvent::RepairRequested,
                details: format!("Issue raised by user {}. Category: {}", raised_by, category),
                performed_by: raised_by,
                performed_by_role: None,
            });

            let issue = written_issue(plan.apply(txn).await?.issue)?;
            info!(tag, issue_id = issue.id, "Repair ticket raised");
            Ok::<_, ServiceError>(issue)
        }
        .await;
        let result = unit.finish(result).await;
        record_outcome(OP, &result);
        result
    }

    /// Hands a ticket to a technician. Asset and allocation are left alone.
    #[instrument(skip(self))]
    pub async fn assign_technician(
        &self,
        issue_id: i32,
        technician_id: i32,
        actor_id: Option<i32>,
    ) -> Result<asset_issue::Model, ServiceError> {
        const OP: &str = "assign_technician";
        let actor = self.lifecycle.resolve_actor(actor_id);

        let unit = self.db.begin(OP).await?;
        let result = async {
            let txn = unit.txn();
            let LockedTicket {
                issue,
                asset,
                latest,
            } = lock_ticket(txn, issue_id).await?;
            let tag = issue.tag.clone();

            let mut plan = TransitionPlan::new(tag.clone(), Some(asset), latest);
            plan.update_issue(
                issue,
                IssuePatch {
                    status: Some(IssueStatus::Assigned),
                    assigned_to: Some(technician_id),
                    ..Default::default()
                },
            )
            .audit(entry(
                &tag,
                AuditEvent::RepairAssigned,
                format!("Assigned to technician {}", technician_id),
                actor,
                ADMIN_ROLE,
            ));

            let issue = written_issue(plan.apply(txn).await?.issue)?;
            info!(issue_id, technician_id, "Technician assigned");
            Ok::<_, ServiceError>(issue)
        }
        .await;
        let result = unit.finish(result).await;
        record_outcome(OP, &result);
        result
    }

    /// Applies a technician quick update: `StartRepair`/`InRepair` or
    /// `WaitingForPart`. Any other action is rejected with `InvalidAction`.
    #[instrument(skip(self, note))]
    pub async fn update_technician_status(
        &self,
        issue_id: i32,
        technician_id: i32,
        action: &str,
        note: Option<String>,
    ) -> Result<asset_issue::Model, ServiceError> {
        const OP: &str = "update_technician_status";
        let action = TechnicianAction::parse(action)?;
        let note = note.filter(|n| !n.trim().is_empty());

        let unit = self.db.begin(OP).await?;
        let result = async {
            let txn = unit.txn();
            let LockedTicket {
                issue,
                asset,
                latest,
            } = lock_ticket(txn, issue_id).await?;
            let tag = issue.tag.clone();

            let (patch, event, details) = match action {
                TechnicianAction::StartRepair | TechnicianAction::InRepair => (
                    IssuePatch {
                        status: Some(IssueStatus::InRepair),
                        ..Default::default()
                    },
                    AuditEvent::RepairStarted,
                    format!("Technician {} started repair", technician_id),
                ),
                TechnicianAction::WaitingForPart => (
                    IssuePatch {
                        status: Some(IssueStatus::WaitingForPart),
                        resolution_note: Some(note.clone()),
                        ..Default::default()
                    },
                    AuditEvent::RepairPending,
                    format!(
                        "Waiting for part: {}",
                        note.as_deref().unwrap_or("unspecified")
                    ),
                ),
            };

            let mut plan = TransitionPlan::new(tag.clone(), Some(asset), latest);
            plan.set_asset_status(AssetStatus::Repair)
                .update_issue(issue, patch)
                .audit(entry(&tag, event, details, technician_id, TECHNICIAN_ROLE));

            let issue = written_issue(plan.apply(txn).await?.issue)?;
            info!(issue_id, %action, "Technician status updated");
            Ok::<_, ServiceError>(issue)
        }
        .await;
        let result = unit.finish(result).await;
        record_outcome(OP, &result);
        result
    }

    /// Technician sign-off. The asset becomes Repaired and waits for an admin;
    /// the allocation row stays in Repair.
    #[instrument(skip(self, resolution))]
    pub async fn complete_repair(
        &self,
        issue_id: i32,
        technician_id: i32,
        resolution: &str,
    ) -> Result<asset_issue::Model, ServiceError> {
        const OP: &str = "complete_repair";
        let resolution = resolution.trim().to_string();

        let unit = self.db.begin(OP).await?;
        let result = async {
            let txn = unit.txn();
            let LockedTicket {
                issue,
                asset,
                latest,
            } = lock_ticket(txn, issue_id).await?;
            let tag = issue.tag.clone();

            let mut plan = TransitionPlan::new(tag.clone(), Some(asset), latest);
            plan.set_asset_status(AssetStatus::Repaired)
                .update_issue(
                    issue,
                    IssuePatch {
                        status: Some(IssueStatus::Resolved),
                        resolution_note: Some(Some(resolution.clone()).filter(|r| !r.is_empty())),
                        closed_at: Some(Utc::now()),
                        ..Default::default()
                    },
                )
                .audit(entry(
                    &tag,
                    AuditEvent::RepairCompletedByTech,
                    format!("Resolved by technician {}: {}", technician_id, resolution),
                    technician_id,
                    TECHNICIAN_ROLE,
                ));

            let issue = written_issue(plan.apply(txn).await?.issue)?;
            info!(issue_id, "Repair completed by technician");
            Ok::<_, ServiceError>(issue)
        }
        .await;
        let result = unit.finish(result).await;
        record_outcome(OP, &result);
        result
    }

    /// Closes a ticket with one of three outcomes.
    ///
    /// `reallocate` keeps the pre-repair custody row as history (deactivated,
    /// status Reallocated) and inserts a fresh Alloted row with the next cycle
    /// count. This differs from [`AllocationService::allocate`], which reuses
    /// the latest row.
    ///
    /// [`AllocationService::allocate`]: super::AllocationService::allocate
    #[instrument(skip(self, employee))]
    pub async fn admin_finalize_repair(
        &self,
        issue_id: i32,
        admin_id: Option<i32>,
        action: &str,
        employee: Option<EmployeeInfo>,
    ) -> Result<FinalizeOutcome, ServiceError> {
        const OP: &str = "admin_finalize_repair";
        let action = FinalizeAction::parse(action)?;
        let employee = match (action, employee) {
            (FinalizeAction::Reallocate, None) => return Err(ServiceError::MissingEmployeeInfo),
            (FinalizeAction::Reallocate, Some(employee)) => {
                employee.validate()?;
                Some(employee)
            }
            (_, employee) => employee,
        };
        let admin = self.lifecycle.resolve_actor(admin_id);

        let unit = self.db.begin(OP).await?;
        let result = self
            .finalize_in(unit.txn(), issue_id, admin, action, employee.as_ref())
            .await;
        let result = unit.finish(result).await;
        record_outcome(OP, &result);
        result
    }

    async fn finalize_in<C: ConnectionTrait>(
        &self,
        txn: &C,
        issue_id: i32,
        admin: i32,
        action: FinalizeAction,
        employee: Option<&EmployeeInfo>,
    ) -> Result<FinalizeOutcome, ServiceError> {
        let LockedTicket {
            issue,
            asset,
            latest,
        } = lock_ticket(txn, issue_id).await?;
        let tag = issue.tag.clone();
        let now = Utc::now();
        let close = IssuePatch {
            status: Some(IssueStatus::Closed),
            closed_at: issue.closed_at.is_none().then_some(now),
            ..Default::default()
        };

        let mut plan = TransitionPlan::new(tag.clone(), Some(asset.clone()), latest.clone());
        match action {
            FinalizeAction::Free => {
                plan.set_asset_status(AssetStatus::Free);
                if latest.is_some() {
                    plan.update_allocation(AllocationPatch {
                        status: Some(AllocationStatus::Free),
                        deallocated: Some((now, admin)),
                        ..Default::default()
                    });
                }
                plan.audit(entry(
                    &tag,
                    AuditEvent::FinalizedFree,
                    format!("Admin {} finalized and freed the asset.", admin),
                    admin,
                    ADMIN_ROLE,
                ));
            }
            FinalizeAction::Reallocate => {
                let employee = employee.ok_or(ServiceError::MissingEmployeeInfo)?;
                if latest.is_some() {
                    plan.update_allocation(AllocationPatch {
                        status: Some(AllocationStatus::Reallocated),
                        active: Some(false),
                        deallocated: Some((now, admin)),
                        ..Default::default()
                    });
                }
                plan.set_asset_status(AssetStatus::Alloted)
                    .insert_allocation(NewAllocation {
                        tag: tag.clone(),
                        description: Some(asset.description.clone()),
                        value: Some(asset.value),
                        status: AllocationStatus::Alloted,
                        assignee: employee.to_assignee(latest.as_ref(), &self.lifecycle),
                        allocated_on: now,
                        allocated_by: admin,
                        cycle_count: latest.as_ref().map_or(0, |row| row.cycle_count + 1),
                    })
                    .audit(entry(
                        &tag,
                        AuditEvent::FinalizedReallocated,
                        format!("Admin {} reallocated to {}", admin, employee.audit_label()),
                        admin,
                        ADMIN_ROLE,
                    ));
            }
            FinalizeAction::Condemn => {
                plan.set_asset_status(AssetStatus::Condemned);
                if latest.is_some() {
                    plan.update_allocation(AllocationPatch::status(AllocationStatus::Condemned));
                }
                plan.audit(entry(
                    &tag,
                    AuditEvent::FinalizedCondemned,
                    format!("Asset condemned by admin {}", admin),
                    admin,
                    ADMIN_ROLE,
                ));
            }
        }
        plan.update_issue(issue, close);

        let applied = plan.apply(txn).await?;
        let issue = written_issue(applied.issue)?;
        info!(issue_id, tag = %tag, %action, "Repair finalized");

        Ok(FinalizeOutcome {
            action,
            issue,
            asset: applied.asset,
            allocation: applied.allocation,
            superseded_allocation: applied.superseded_allocation,
        })
    }

    pub async fn find_issue(&self, issue_id: i32) -> Result<asset_issue::Model, ServiceError> {
        IssueRepository::find_by_id(self.db.get_pool(), issue_id, Lock::None)
            .await?
            .ok_or(ServiceError::IssueNotFound(issue_id))
    }

    pub async fn issues_for_tag(&self, tag: &str) -> Result<Vec<asset_issue::Model>, ServiceError> {
        IssueRepository::for_tag(self.db.get_pool(), tag).await
    }

    /// Tickets assigned to a technician that still need work, newest first.
    pub async fn technician_queue(
        &self,
        technician_id: i32,
    ) -> Result<Vec<asset_issue::Model>, ServiceError> {
        IssueRepository::assigned_to(self.db.get_pool(), technician_id).await
    }

    /// Every ticket not yet closed.
    pub async fn open_issues(&self) -> Result<Vec<asset_issue::Model>, ServiceError> {
        IssueRepository::open(self.db.get_pool()).await
    }

    /// Resolved tickets waiting for an admin decision.
    pub async fn pending_finalization(&self) -> Result<Vec<PendingFinalization>, ServiceError> {
        Ok(IssueRepository::resolved_with_asset(self.db.get_pool())
            .await?
            .into_iter()
            .map(|(issue, asset)| PendingFinalization { issue, asset })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case("StartRepair", TechnicianAction::StartRepair)]
    #[case("InRepair", TechnicianAction::InRepair)]
    #[case("waitingforpart", TechnicianAction::WaitingForPart)]
    fn technician_actions_parse(#[case] raw: &str, #[case] expected: TechnicianAction) {
        assert_eq!(TechnicianAction::parse(raw).unwrap(), expected);
    }

    #[test]
    fn unknown_technician_action_is_invalid() {
        assert_matches!(
            TechnicianAction::parse("Dance"),
            Err(ServiceError::InvalidAction(a)) if a == "Dance"
        );
    }

    #[rstest]
    #[case("free", FinalizeAction::Free)]
    #[case("reallocate", FinalizeAction::Reallocate)]
    #[case("Condemn", FinalizeAction::Condemn)]
    fn finalize_actions_parse(#[case] raw: &str, #[case] expected: FinalizeAction) {
        assert_eq!(FinalizeAction::parse(raw).unwrap(), expected);
    }

    #[test]
    fn unknown_finalize_action_is_invalid() {
        assert_matches!(
            FinalizeAction::parse("scrap"),
            Err(ServiceError::InvalidFinalizeAction(_))
        );
    }
}
