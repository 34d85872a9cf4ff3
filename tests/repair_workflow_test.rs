mod common;

use assert_matches::assert_matches;
use asset_lifecycle::{
    entities::{
        allocation::AllocationStatus,
        asset::AssetStatus,
        asset_issue::{IssueCategory, IssuePriority, IssueStatus},
        asset_log::AuditEvent,
    },
    services::FinalizeAction,
    ErrorKind, ServiceError,
};
use common::{employee, TestContext};

/// Seeds `tag` allocated to Bob.
async fn allocated_asset(ctx: &TestContext, tag: &str) {
    ctx.seed_asset(tag).await;
    ctx.services
        .allocations
        .allocate(tag, employee("Bob", 7), None)
        .await
        .expect("allocate");
}

#[tokio::test]
async fn repair_then_condemn() {
    let ctx = TestContext::new().await;
    allocated_asset(&ctx, "X1").await;
    let issues = &ctx.services.issues;

    let issue = issues
        .raise_issue("X1", Some(7), IssueCategory::Hardware, "Battery swollen")
        .await
        .expect("raise");
    assert_eq!(issue.status, IssueStatus::Open);
    assert_eq!(issue.priority, IssuePriority::Medium);
    assert_eq!(issue.raised_by, 7);
    assert_eq!(ctx.asset("X1").await.status, AssetStatus::Repair);
    assert_eq!(
        ctx.latest_allocation("X1").await.map(|r| r.status),
        Some(AllocationStatus::Repair)
    );

    let resolved = issues
        .complete_repair(issue.id, 300, "Battery cannot be replaced")
        .await
        .expect("complete");
    assert_eq!(resolved.status, IssueStatus::Resolved);
    assert!(resolved.closed_at.is_some());
    assert_eq!(
        resolved.resolution_note.as_deref(),
        Some("Battery cannot be replaced")
    );
    assert_eq!(ctx.asset("X1").await.status, AssetStatus::Repaired);
    assert_eq!(
        ctx.latest_allocation("X1").await.map(|r| r.status),
        Some(AllocationStatus::Repair)
    );

    let outcome = issues
        .admin_finalize_repair(issue.id, Some(1), "condemn", None)
        .await
        .expect("finalize");
    assert_eq!(outcome.action, FinalizeAction::Condemn);
    assert_eq!(outcome.issue.status, IssueStatus::Closed);
    assert_eq!(outcome.asset.status, AssetStatus::Condemned);
    assert_eq!(
        outcome.allocation.map(|r| r.status),
        Some(AllocationStatus::Condemned)
    );

    let events: Vec<_> = ctx
        .audit_entries("X1")
        .await
        .into_iter()
        .map(|e| e.event)
        .collect();
    assert_eq!(
        events,
        vec![
            AuditEvent::Allocated,
            AuditEvent::RepairRequested,
            AuditEvent::RepairCompletedByTech,
            AuditEvent::FinalizedCondemned,
        ]
    );
}

#[tokio::test]
async fn finalize_reallocate_keeps_history_and_inserts_a_new_cycle() {
    let ctx = TestContext::new().await;
    allocated_asset(&ctx, "X1").await;
    let allocations = &ctx.services.allocations;
    for name in ["Carol", "Erin"] {
        allocations
            .deallocate("X1", None, None)
            .await
            .expect("deallocate");
        allocations
            .allocate("X1", employee(name, 9), None)
            .await
            .expect("reallocate");
    }
    let before = ctx.latest_allocation("X1").await.expect("row");
    assert_eq!(before.cycle_count, 2);

    let issue = ctx
        .services
        .issues
        .raise_issue("X1", None, IssueCategory::Network, "No wifi")
        .await
        .expect("raise");
    let outcome = ctx
        .services
        .issues
        .admin_finalize_repair(issue.id, Some(1), "reallocate", Some(employee("Dave", 12)))
        .await
        .expect("finalize");

    assert_eq!(outcome.asset.status, AssetStatus::Alloted);
    let new_row = outcome.allocation.expect("new row");
    assert_eq!(new_row.status, AllocationStatus::Alloted);
    assert_eq!(new_row.cycle_count, 3);
    assert_eq!(new_row.allocated_to.as_deref(), Some("Dave"));
    assert!(new_row.active);

    let old_row = outcome.superseded_allocation.expect("old row");
    assert_eq!(old_row.id, before.id);
    assert!(!old_row.active);
    assert_eq!(old_row.status, AllocationStatus::Reallocated);
    assert_eq!(old_row.deallocated_by, Some(1));

    assert_eq!(ctx.allocation_rows("X1").await.len(), 2);
    let audit = ctx.audit_entries("X1").await;
    let last = audit.last().expect("audit");
    assert_eq!(last.event, AuditEvent::FinalizedReallocated);
    assert_eq!(
        last.details.as_deref(),
        Some("Admin 1 reallocated to Dave (12)")
    );
    assert_eq!(last.allocation_id, Some(new_row.id));
}

#[tokio::test]
async fn finalize_free_releases_asset_and_allocation() {
    let ctx = TestContext::new().await;
    allocated_asset(&ctx, "X1").await;
    let issues = &ctx.services.issues;

    let issue = issues
        .raise_issue("X1", None, IssueCategory::Hardware, "Keyboard")
        .await
        .expect("raise");
    issues
        .complete_repair(issue.id, 300, "Keyboard replaced")
        .await
        .expect("complete");
    let outcome = issues
        .admin_finalize_repair(issue.id, Some(2), "free", None)
        .await
        .expect("finalize");

    assert_eq!(outcome.asset.status, AssetStatus::Free);
    let row = outcome.allocation.expect("row");
    assert_eq!(row.status, AllocationStatus::Free);
    assert_eq!(row.deallocated_by, Some(2));
    assert_eq!(outcome.issue.status, IssueStatus::Closed);

    let again = ctx
        .services
        .allocations
        .allocate("X1", employee("Carol", 8), None)
        .await
        .expect("allocate after repair");
    assert_eq!(again.allocation.id, row.id);
    assert_eq!(again.allocation.cycle_count, 1);
}

#[tokio::test]
async fn repair_of_an_unallocated_asset_never_creates_allocation_rows() {
    let ctx = TestContext::new().await;
    ctx.seed_asset("X2").await;
    let issues = &ctx.services.issues;

    let issue = issues
        .raise_issue("X2", None, IssueCategory::Other, "Dented chassis")
        .await
        .expect("raise");
    assert_eq!(ctx.asset("X2").await.status, AssetStatus::Repair);

    let outcome = issues
        .admin_finalize_repair(issue.id, None, "free", None)
        .await
        .expect("finalize");
    assert_eq!(outcome.asset.status, AssetStatus::Free);
    assert!(outcome.allocation.is_none());
    assert!(ctx.allocation_rows("X2").await.is_empty());

    let audit = ctx.audit_entries("X2").await;
    assert!(audit.iter().all(|e| e.allocation_id.is_none()));
    assert_eq!(
        audit.last().and_then(|e| e.details.as_deref()),
        Some("Admin 999999 finalized and freed the asset.")
    );
}

#[tokio::test]
async fn technician_workflow_updates_issue_and_queue() {
    let ctx = TestContext::new().await;
    allocated_asset(&ctx, "X1").await;
    let issues = &ctx.services.issues;
    let issue = issues
        .raise_issue("X1", None, IssueCategory::Hardware, "Fan noise")
        .await
        .expect("raise");

    let assigned = issues
        .assign_technician(issue.id, 300, Some(1))
        .await
        .expect("assign");
    assert_eq!(assigned.status, IssueStatus::Assigned);
    assert_eq!(assigned.assigned_to, Some(300));
    assert_eq!(issues.technician_queue(300).await.expect("queue").len(), 1);
    assert!(issues.technician_queue(301).await.expect("queue").is_empty());

    let started = issues
        .update_technician_status(issue.id, 300, "StartRepair", None)
        .await
        .expect("start");
    assert_eq!(started.status, IssueStatus::InRepair);

    let waiting = issues
        .update_technician_status(issue.id, 300, "WaitingForPart", Some("Fan assembly".into()))
        .await
        .expect("waiting");
    assert_eq!(waiting.status, IssueStatus::WaitingForPart);
    assert_eq!(waiting.resolution_note.as_deref(), Some("Fan assembly"));
    assert_eq!(ctx.asset("X1").await.status, AssetStatus::Repair);

    issues
        .complete_repair(issue.id, 300, "Fan replaced")
        .await
        .expect("complete");
    assert!(issues.technician_queue(300).await.expect("queue").is_empty());

    let pending = issues.pending_finalization().await.expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].issue.id, issue.id);
    assert_eq!(
        pending[0].asset.as_ref().map(|a| a.status),
        Some(AssetStatus::Repaired)
    );

    let details: Vec<_> = ctx
        .audit_entries("X1")
        .await
        .into_iter()
        .filter_map(|e| e.details)
        .collect();
    assert!(details.contains(&"Assigned to technician 300".to_string()));
    assert!(details.contains(&"Technician 300 started repair".to_string()));
    assert!(details.contains(&"Waiting for part: Fan assembly".to_string()));
    assert!(details.contains(&"Resolved by technician 300: Fan replaced".to_string()));
}

#[tokio::test]
async fn unknown_technician_action_changes_nothing() {
    let ctx = TestContext::new().await;
    allocated_asset(&ctx, "X1").await;
    let issue = ctx
        .services
        .issues
        .raise_issue("X1", None, IssueCategory::Hardware, "Hinge")
        .await
        .expect("raise");
    let audit_before = ctx.audit_entries("X1").await.len();

    let err = ctx
        .services
        .issues
        .update_technician_status(issue.id, 300, "Teleport", None)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InvalidAction(ref a) if a == "Teleport");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let stored = ctx.services.issues.find_issue(issue.id).await.expect("issue");
    assert_eq!(stored.status, IssueStatus::Open);
    assert_eq!(ctx.audit_entries("X1").await.len(), audit_before);
}

#[tokio::test]
async fn invalid_finalize_requests_are_rejected_without_mutation() {
    let ctx = TestContext::new().await;
    allocated_asset(&ctx, "X1").await;
    let issues = &ctx.services.issues;
    let issue = issues
        .raise_issue("X1", None, IssueCategory::Hardware, "Dead pixel")
        .await
        .expect("raise");

    assert_matches!(
        issues
            .admin_finalize_repair(issue.id, Some(1), "scrap", None)
            .await,
        Err(ServiceError::InvalidFinalizeAction(_))
    );
    assert_matches!(
        issues
            .admin_finalize_repair(issue.id, Some(1), "reallocate", None)
            .await,
        Err(ServiceError::MissingEmployeeInfo)
    );
    assert_matches!(
        issues.admin_finalize_repair(9_999, Some(1), "free", None).await,
        Err(ServiceError::IssueNotFound(9_999))
    );

    assert_eq!(ctx.asset("X1").await.status, AssetStatus::Repair);
    assert_eq!(
        issues.find_issue(issue.id).await.expect("issue").status,
        IssueStatus::Open
    );
}

#[tokio::test]
async fn closed_issue_cannot_be_finalized_twice() {
    let ctx = TestContext::new().await;
    allocated_asset(&ctx, "X1").await;
    let issues = &ctx.services.issues;
    let issue = issues
        .raise_issue("X1", None, IssueCategory::Hardware, "Cracked lid")
        .await
        .expect("raise");
    issues
        .admin_finalize_repair(issue.id, Some(1), "condemn", None)
        .await
        .expect("condemn");

    let err = issues
        .admin_finalize_repair(issue.id, Some(1), "free", None)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InvalidTransition { .. });
    assert_eq!(ctx.asset("X1").await.status, AssetStatus::Condemned);
}

#[tokio::test]
async fn condemned_assets_accept_no_further_changes() {
    let ctx = TestContext::new().await;
    allocated_asset(&ctx, "X1").await;
    let issues = &ctx.services.issues;
    let issue = issues
        .raise_issue("X1", None, IssueCategory::Hardware, "Water damage")
        .await
        .expect("raise");
    issues
        .admin_finalize_repair(issue.id, Some(1), "condemn", None)
        .await
        .expect("condemn");

    assert_matches!(
        issues
            .raise_issue("X1", None, IssueCategory::Hardware, "Still broken")
            .await,
        Err(ServiceError::InvalidTransition { entity: "asset", .. })
    );
    assert_matches!(
        ctx.services
            .allocations
            .allocate("X1", employee("Carol", 8), None)
            .await,
        Err(ServiceError::NotAllocatable {
            status: AssetStatus::Condemned,
            ..
        })
    );
    assert_eq!(issues.issues_for_tag("X1").await.expect("issues").len(), 1);
}

#[tokio::test]
async fn open_issues_lists_everything_not_closed() {
    let ctx = TestContext::new().await;
    allocated_asset(&ctx, "X1").await;
    ctx.seed_asset("X2").await;
    let issues = &ctx.services.issues;

    let first = issues
        .raise_issue("X1", None, IssueCategory::Hardware, "Hinge")
        .await
        .expect("raise");
    issues
        .raise_issue_with_priority("X2", None, IssueCategory::Software, IssuePriority::High, "OS")
        .await
        .expect("raise");
    issues
        .admin_finalize_repair(first.id, None, "free", None)
        .await
        .expect("finalize");

    let open = issues.open_issues().await.expect("open");
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].tag, "X2");
    assert_eq!(open[0].priority, IssuePriority::High);
}

#[tokio::test]
async fn blank_issue_description_is_rejected() {
    let ctx = TestContext::new().await;
    ctx.seed_asset("X1").await;

    let err = ctx
        .services
        .issues
        .raise_issue("X1", None, IssueCategory::Hardware, "   ")
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(_));
    assert_eq!(ctx.asset("X1").await.status, AssetStatus::Free);
}

#[tokio::test]
async fn second_ticket_is_rejected_while_one_is_open() {
    let ctx = TestContext::new().await;
    allocated_asset(&ctx, "X1").await;
    let issues = &ctx.services.issues;
    let first = issues
        .raise_issue("X1", None, IssueCategory::Hardware, "Battery")
        .await
        .expect("raise");

    let err = issues
        .raise_issue("X1", None, IssueCategory::Software, "Drivers")
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::IssueAlreadyOpen { ref tag, issue_id } if tag == "X1" && issue_id == first.id
    );
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(issues.issues_for_tag("X1").await.expect("issues").len(), 1);
    assert_eq!(ctx.audit_entries("X1").await.len(), 2);

    // A resolved ticket still counts until the admin closes it.
    issues
        .complete_repair(first.id, 300, "Battery replaced")
        .await
        .expect("complete");
    assert_matches!(
        issues
            .raise_issue("X1", None, IssueCategory::Software, "Drivers")
            .await,
        Err(ServiceError::IssueAlreadyOpen { .. })
    );

    issues
        .admin_finalize_repair(first.id, None, "free", None)
        .await
        .expect("finalize");
    assert!(issues.open_issues().await.expect("open").is_empty());
    assert_eq!(ctx.asset("X1").await.status, AssetStatus::Free);

    let second = issues
        .raise_issue("X1", None, IssueCategory::Software, "Drivers")
        .await
        .expect("raise after close");
    assert_eq!(second.status, IssueStatus::Open);
    assert_eq!(ctx.asset("X1").await.status, AssetStatus::Repair);
    assert_eq!(
        ctx.latest_allocation("X1").await.map(|row| row.status),
        Some(AllocationStatus::Repair)
    );
}
