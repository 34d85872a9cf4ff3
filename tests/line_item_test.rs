mod common;

use assert_matches::assert_matches;
use asset_lifecycle::{
    entities::{allocation::AllocationStatus, asset::AssetStatus, asset_log::AuditEvent},
    services::{acquisition_service::format_asset_tag, AllocationAction, LineItemInput},
    ServiceError,
};
use common::{employee, po_date, TestContext};
use rust_decimal_macros::dec;

#[tokio::test]
async fn allocate_from_line_item_creates_tagged_allocated_asset() {
    let ctx = TestContext::new().await;
    let line = ctx.seed_line_item("PO-1", 3, dec!(3000)).await;
    assert_eq!(line.available_qty, 3);

    let outcome = ctx
        .services
        .allocations
        .allocate_from_line_item(line.id, employee("Bob", 7), Some(11))
        .await
        .expect("allocate from line item");

    assert_eq!(outcome.action, AllocationAction::CreatedAndAllocated);
    assert_eq!(outcome.asset.tag, "PO-1/2024-03/100001");
    assert_eq!(outcome.asset.status, AssetStatus::Alloted);
    assert_eq!(outcome.asset.value, dec!(1000));
    assert_eq!(outcome.asset.description, "ThinkPad T14");
    assert_eq!(outcome.asset.vendor.as_deref(), Some("Acme Computers"));
    assert_eq!(outcome.asset.acquisition_li_id, Some(line.id));
    assert_eq!(outcome.allocation.status, AllocationStatus::Alloted);
    assert_eq!(outcome.allocation.cycle_count, 0);
    assert_eq!(outcome.allocation.value, Some(dec!(1000)));

    let line = ctx.line_item(line.id).await;
    assert_eq!(line.available_qty, 2);
    assert_eq!(line.allocated_qty, 1);

    let audit = ctx.audit_entries(&outcome.asset.tag).await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event, AuditEvent::Allocated);
    assert_eq!(
        audit[0].details.as_deref(),
        Some("Allocated on creation to Bob (7)")
    );
}

#[tokio::test]
async fn exhausted_line_item_mutates_nothing() {
    let ctx = TestContext::new().await;
    let line = ctx.seed_line_item("PO-1", 1, dec!(900)).await;
    let allocations = &ctx.services.allocations;
    allocations
        .allocate_from_line_item(line.id, employee("Bob", 7), None)
        .await
        .expect("first allocation");
    let assets_before = ctx.asset_count().await;

    let err = allocations
        .allocate_from_line_item(line.id, employee("Carol", 8), None)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NoAvailableQuantity(id) if id == line.id);
    assert_eq!(ctx.asset_count().await, assets_before);
    let line = ctx.line_item(line.id).await;
    assert_eq!(line.available_qty, 0);
    assert_eq!(line.allocated_qty, 1);
}

#[tokio::test]
async fn unknown_line_item_is_not_found() {
    let ctx = TestContext::new().await;

    assert_matches!(
        ctx.services
            .allocations
            .allocate_from_line_item(404, employee("Bob", 7), None)
            .await,
        Err(ServiceError::LineItemNotFound(404))
    );
}

#[tokio::test]
async fn bulk_tagging_assigns_consecutive_sequences() {
    let ctx = TestContext::new().await;
    let line = ctx.seed_line_item("PO-7", 4, dec!(1000)).await;

    let assets = ctx
        .services
        .acquisitions
        .create_assets_from_line_item(line.id, 3, Some(11))
        .await
        .expect("tag assets");

    let tags: Vec<_> = assets.iter().map(|a| a.tag.as_str()).collect();
    assert_eq!(
        tags,
        vec![
            "PO-7/2024-03/100001",
            "PO-7/2024-03/100002",
            "PO-7/2024-03/100003"
        ]
    );
    assert!(assets.iter().all(|a| a.status == AssetStatus::Free));
    assert!(assets.iter().all(|a| a.value == dec!(250)));

    let line = ctx.line_item(line.id).await;
    assert_eq!(line.created_assets, 3);
    assert!(line.is_tagged);
    assert_eq!(line.available_qty, 4);

    let audit = ctx.audit_entries(&assets[0].tag).await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event, AuditEvent::Tagged);

    let next = ctx
        .services
        .allocations
        .allocate_from_line_item(line.id, employee("Bob", 7), None)
        .await
        .expect("allocate from line item");
    assert_eq!(next.asset.tag, "PO-7/2024-03/100004");
}

#[tokio::test]
async fn tagged_assets_follow_the_allocation_lifecycle() {
    let ctx = TestContext::new().await;
    let line = ctx.seed_line_item("PO-9", 1, dec!(500)).await;
    let assets = ctx
        .services
        .acquisitions
        .create_assets_from_line_item(line.id, 1, None)
        .await
        .expect("tag assets");

    let outcome = ctx
        .services
        .allocations
        .allocate(&assets[0].tag, employee("Bob", 7), None)
        .await
        .expect("allocate");
    assert_eq!(outcome.asset.status, AssetStatus::Alloted);
    assert_eq!(outcome.allocation.description.as_deref(), Some("ThinkPad T14"));
}

#[tokio::test]
async fn tagging_rejects_non_positive_quantity() {
    let ctx = TestContext::new().await;
    let line = ctx.seed_line_item("PO-3", 2, dec!(100)).await;

    assert_matches!(
        ctx.services
            .acquisitions
            .create_assets_from_line_item(line.id, 0, None)
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_eq!(ctx.asset_count().await, 0);
}

#[tokio::test]
async fn line_items_require_an_existing_purchase_order() {
    let ctx = TestContext::new().await;

    let err = ctx
        .services
        .acquisitions
        .add_line_item(LineItemInput {
            po_no: "PO-404".into(),
            li_type: None,
            material_code: None,
            material_description: None,
            qty: 1,
            po_value: dec!(10),
        })
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::PurchaseOrderNotFound(ref po) if po == "PO-404");
}

#[test]
fn tag_embeds_purchase_order_month() {
    assert_eq!(format_asset_tag("PO-1", po_date(), 100_042), "PO-1/2024-03/100042");
}

#[tokio::test]
async fn tagging_beyond_untagged_units_mutates_nothing() {
    let ctx = TestContext::new().await;
    let line = ctx.seed_line_item("PO-4", 3, dec!(300)).await;
    let acquisitions = &ctx.services.acquisitions;

    assert_matches!(
        acquisitions
            .create_assets_from_line_item(line.id, 2_000_000_000, None)
            .await,
        Err(ServiceError::NoAvailableQuantity(id)) if id == line.id
    );

    ctx.services
        .allocations
        .allocate_from_line_item(line.id, employee("Bob", 7), None)
        .await
        .expect("allocate from line item");
    acquisitions
        .create_assets_from_line_item(line.id, 1, None)
        .await
        .expect("tag one unit");
    assert_matches!(
        acquisitions.create_assets_from_line_item(line.id, 2, None).await,
        Err(ServiceError::NoAvailableQuantity(_))
    );

    let line = ctx.line_item(line.id).await;
    assert_eq!(line.created_assets, 1);
    assert_eq!(line.untagged_qty(), 1);
    assert_eq!(ctx.asset_count().await, 2);
}

#[tokio::test]
async fn fractional_unit_values_survive_the_store() {
    let ctx = TestContext::new().await;
    let line = ctx.seed_line_item("PO-5", 8, dec!(1001)).await;

    let outcome = ctx
        .services
        .allocations
        .allocate_from_line_item(line.id, employee("Bob", 7), None)
        .await
        .expect("allocate from line item");

    assert_eq!(ctx.asset(&outcome.asset.tag).await.value, dec!(125.125));
    assert_eq!(ctx.line_item(line.id).await.po_value, dec!(1001));
}
