//! Lifecycle engines.
//!
//! Each public operation runs in its own transaction: lock the rows, build a
//! [`TransitionPlan`](crate::lifecycle::TransitionPlan), validate, apply, then
//! commit. Any error rolls the whole unit back.

use std::sync::Arc;

use metrics::counter;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::{Validate, ValidationError};

use crate::config::LifecycleConfig;
use crate::entities::allocation;
use crate::errors::{ErrorKind, ServiceError};
use crate::repositories::allocation::Assignee;

pub mod acquisition_service;
pub mod allocation_service;
pub mod audit_log_service;
pub mod issue_service;

pub use acquisition_service::{AcquisitionService, LineItemInput, PurchaseOrderInput};
pub use allocation_service::{AllocationAction, AllocationOutcome, AllocationService};
pub use audit_log_service::AuditLogService;
pub use issue_service::{
    FinalizeAction, FinalizeOutcome, IssueService, PendingFinalization, TechnicianAction,
};

/// Custodian details supplied when an asset is handed out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmployeeInfo {
    #[validate(length(max = 200), custom = "validate_not_blank")]
    pub name: String,
    pub sap_id: Option<i32>,
    pub designation: Option<String>,
    pub division: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub building: Option<String>,
    /// Role of the person performing the allocation, copied to the audit entry.
    pub role: Option<String>,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Must contain a non-whitespace character".into());
        return Err(err);
    }
    Ok(())
}

impl EmployeeInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_sap_id(mut self, sap_id: i32) -> Self {
        self.sap_id = Some(sap_id);
        self
    }

    /// Resolves the stored assignee. Division and department fall back to the
    /// previous custody row, then to the configured defaults.
    pub(crate) fn to_assignee(
        &self,
        previous: Option<&allocation::Model>,
        defaults: &LifecycleConfig,
    ) -> Assignee {
        let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();

        let division = non_empty(&self.division)
            .or_else(|| previous.and_then(|p| non_empty(&p.division)))
            .unwrap_or_else(|| defaults.default_division.clone());
        let department = non_empty(&self.department)
            .or_else(|| previous.and_then(|p| non_empty(&p.department)))
            .unwrap_or_else(|| defaults.default_department.clone());

        Assignee {
            name: self.name.trim().to_string(),
            sap_id: self.sap_id,
            designation: non_empty(&self.designation),
            division,
            department,
            building: non_empty(&self.building),
            phone: non_empty(&self.phone),
        }
    }

    /// `name (sap_id)` as written into audit details.
    pub(crate) fn audit_label(&self) -> String {
        match self.sap_id {
            Some(sap_id) => format!("{} ({})", self.name.trim(), sap_id),
            None => format!("{} (N/A)", self.name.trim()),
        }
    }
}

impl From<&allocation::Model> for EmployeeInfo {
    fn from(row: &allocation::Model) -> Self {
        Self {
            name: row.allocated_to.clone().unwrap_or_default(),
            sap_id: row.sap_id,
            designation: row.designation.clone(),
            division: row.division.clone(),
            department: row.department.clone(),
            phone: row.phone.clone(),
            building: row.building.clone(),
            role: None,
        }
    }
}

/// Records the result of one engine operation on the metrics facade and log.
pub(crate) fn record_outcome<T>(operation: &'static str, result: &Result<T, ServiceError>) {
    match result {
        Ok(_) => {
            counter!("ams_lifecycle.transition.committed", 1, "operation" => operation);
            info!(operation, "lifecycle transition committed");
        }
        Err(err) => {
            counter!("ams_lifecycle.transition.rejected", 1, "operation" => operation);
            match err.kind() {
                ErrorKind::StoreFailure => {
                    tracing::error!(operation, error = %err, "lifecycle transition failed")
                }
                _ => warn!(operation, error = %err, "lifecycle transition rejected"),
            }
        }
    }
}

/// All engines wired to one pool and one set of lifecycle defaults.
#[derive(Clone)]
pub struct AppServices {
    pub allocations: AllocationService,
    pub issues: IssueService,
    pub acquisitions: AcquisitionService,
    pub audit_log: AuditLogService,
}

impl AppServices {
    pub fn new(db_pool: Arc<DatabaseConnection>, lifecycle: LifecycleConfig) -> Self {
        let lifecycle = Arc::new(lifecycle);
        Self {
            allocations: AllocationService::new(db_pool.clone(), lifecycle.clone()),
            issues: IssueService::new(db_pool.clone(), lifecycle.clone()),
            acquisitions: AcquisitionService::new(db_pool.clone(), lifecycle),
            audit_log: AuditLogService::new(db_pool),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn previous_row() -> allocation::Model {
        allocation::Model {
            id: 1,
            tag: "X1".into(),
            description: None,
            value: None,
            status: allocation::AllocationStatus::Free,
            sap_id: Some(7),
            allocated_to: Some("Bob".into()),
            designation: None,
            division: Some("OPS".into()),
            department: Some("Stores".into()),
            building: None,
            phone: None,
            allocated_on: None,
            allocated_by: None,
            deallocated_on: None,
            deallocated_by: None,
            cycle_count: 0,
            active: true,
            reason: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn assignee_falls_back_to_configured_defaults() {
        let assignee = EmployeeInfo::named("Bob").to_assignee(None, &LifecycleConfig::default());
        assert_eq!(assignee.division, "BDL");
        assert_eq!(assignee.department, "UNKNOWN");
    }

    #[test]
    fn assignee_prefers_previous_row_over_defaults() {
        let mut employee = EmployeeInfo::named("Carol");
        employee.department = Some("  ".into());
        let assignee = employee.to_assignee(Some(&previous_row()), &LifecycleConfig::default());
        assert_eq!(assignee.division, "OPS");
        assert_eq!(assignee.department, "Stores");
        assert_eq!(assignee.name, "Carol");
    }

    #[test]
    fn audit_label_marks_missing_sap_id() {
        assert_eq!(EmployeeInfo::named("Carol").audit_label(), "Carol (N/A)");
        assert_eq!(
            EmployeeInfo::named("Bob").with_sap_id(7).audit_label(),
            "Bob (7)"
        );
    }

    #[test]
    fn blank_name_fails_validation() {
        assert!(EmployeeInfo::named("").validate().is_err());
        assert!(EmployeeInfo::named("   ").validate().is_err());
        assert!(EmployeeInfo::named("\t\n").validate().is_err());
        assert!(EmployeeInfo::named(" Bob ").validate().is_ok());
        assert!(EmployeeInfo::named("x".repeat(201)).validate().is_err());
    }
}
