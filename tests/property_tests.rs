//! Property-based tests for the lifecycle engines.
//!
//! Random operation sequences are replayed against a fresh store and the
//! asset/allocation pairing, open-ticket and audit invariants are checked
//! after every step.

mod common;

use asset_lifecycle::{
    entities::{
        allocation::AllocationStatus,
        asset::AssetStatus,
        asset_issue::{IssueCategory, IssueStatus},
    },
    lifecycle::{pairing_is_consistent, StatusMachine},
    services::acquisition_service::unit_value,
};
use common::{employee, TestContext};
use proptest::prelude::*;
use rust_decimal::Decimal;
use sea_orm::Iterable;

#[derive(Debug, Clone)]
enum Op {
    Allocate(u8),
    Deallocate,
    Raise,
    Assign,
    Complete,
    Finalize(&'static str),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..4).prop_map(Op::Allocate),
        2 => Just(Op::Deallocate),
        2 => Just(Op::Raise),
        1 => Just(Op::Assign),
        1 => Just(Op::Complete),
        2 => prop_oneof![Just("free"), Just("reallocate"), Just("condemn")].prop_map(Op::Finalize),
    ]
}

/// Replays `ops` on one asset, checking the invariants after each step.
async fn replay(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let ctx = TestContext::new().await;
    ctx.seed_asset("P1").await;
    let services = &ctx.services;
    let mut accepted = 0usize;
    let mut last_cycle = -1;

    for op in ops {
        let open_issue = services
            .issues
            .issues_for_tag("P1")
            .await
            .expect("issues")
            .into_iter()
            .rev()
            .find(|i| i.status.is_open());

        let ok = match op {
            Op::Allocate(n) => services
                .allocations
                .allocate("P1", employee(&format!("E{}", n), n as i32), None)
                .await
                .is_ok(),
            Op::Deallocate => services
                .allocations
                .deallocate("P1", None, None)
                .await
                .is_ok(),
            Op::Raise => services
                .issues
                .raise_issue("P1", None, IssueCategory::Hardware, "broken")
                .await
                .is_ok(),
            Op::Assign => match &open_issue {
                Some(issue) => services
                    .issues
                    .assign_technician(issue.id, 300, None)
                    .await
                    .is_ok(),
                None => false,
            },
            Op::Complete => match &open_issue {
                Some(issue) if issue.status != IssueStatus::Resolved => services
                    .issues
                    .complete_repair(issue.id, 300, "fixed")
                    .await
                    .is_ok(),
                _ => false,
            },
            Op::Finalize(action) => match &open_issue {
                Some(issue) => services
                    .issues
                    .admin_finalize_repair(issue.id, None, action, Some(employee("Admin pick", 1)))
                    .await
                    .is_ok(),
                None => false,
            },
        };
        if ok {
            accepted += 1;
        }

        let asset = ctx.asset("P1").await;
        let latest = ctx.latest_allocation("P1").await;
        prop_assert!(
            pairing_is_consistent(asset.status, latest.as_ref().map(|r| r.status)),
            "asset {} paired with {:?}",
            asset.status,
            latest.as_ref().map(|r| r.status)
        );
        let open: Vec<_> = services
            .issues
            .issues_for_tag("P1")
            .await
            .expect("issues")
            .into_iter()
            .filter(|i| i.status != IssueStatus::Closed)
            .collect();
        prop_assert!(open.len() <= 1, "{} tickets open at once", open.len());
        if !open.is_empty() {
            prop_assert!(
                matches!(asset.status, AssetStatus::Repair | AssetStatus::Repaired),
                "open ticket with asset {}",
                asset.status
            );
            prop_assert!(
                matches!(latest.as_ref().map(|r| r.status), None | Some(AllocationStatus::Repair)),
                "open ticket with allocation {:?}",
                latest.as_ref().map(|r| r.status)
            );
        }
        if let Some(row) = &latest {
            prop_assert!(row.cycle_count >= last_cycle);
            last_cycle = row.cycle_count;
        }
        prop_assert_eq!(ctx.audit_entries("P1").await.len(), accepted);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn random_operation_sequences_keep_invariants(ops in prop::collection::vec(op_strategy(), 1..25)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        runtime.block_on(replay(ops))?;
    }

    #[test]
    fn unit_value_times_quantity_stays_within_rounding(
        cents in 0i64..10_000_000_000,
        qty in 1i32..10_000,
    ) {
        let po_value = Decimal::new(cents, 2);
        let unit = unit_value(po_value, qty);
        let drift = (unit * Decimal::from(qty) - po_value).abs();
        prop_assert!(drift <= Decimal::new(5, 5) * Decimal::from(qty));
    }

    #[test]
    fn non_positive_quantity_counts_as_one(cents in 0i64..1_000_000, qty in -50i32..=0) {
        let po_value = Decimal::new(cents, 2);
        prop_assert_eq!(unit_value(po_value, qty), po_value.round_dp(4));
    }
}

#[test]
fn condemned_is_terminal_for_assets_and_allocations() {
    for next in AssetStatus::iter() {
        assert!(!AssetStatus::Condemned.can_transition_to(next));
    }
    for next in AllocationStatus::iter() {
        assert!(!AllocationStatus::Condemned.can_transition_to(next));
    }
}

#[test]
fn no_issue_status_returns_to_open() {
    for from in IssueStatus::iter() {
        assert!(!from.can_transition_to(IssueStatus::Open));
    }
}
