#![allow(dead_code)]

use std::sync::Arc;

use asset_lifecycle::{
    config::LifecycleConfig,
    db::{self, DbConfig, DbPool},
    entities::{
        acquisition, acquisition_line_item, allocation,
        asset::{self, AssetStatus},
        asset_log,
    },
    repositories::{
        asset::NewAsset, AcquisitionRepository, AllocationRepository, AssetRepository,
        AuditLogRepository, Lock,
    },
    services::{AppServices, EmployeeInfo, LineItemInput, PurchaseOrderInput},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Services wired to a fresh, migrated in-memory SQLite store.
pub struct TestContext {
    pub db: Arc<DbPool>,
    pub services: AppServices,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_lifecycle(LifecycleConfig::default()).await
    }

    pub async fn with_lifecycle(lifecycle: LifecycleConfig) -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::in_memory())
            .await
            .expect("failed to open in-memory database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let db = Arc::new(pool);
        let services = AppServices::new(db.clone(), lifecycle);
        Self { db, services }
    }

    /// Inserts a Free asset with a caller-chosen tag and no purchase order.
    pub async fn seed_asset(&self, tag: &str) -> asset::Model {
        AssetRepository::create(
            self.db.as_ref(),
            NewAsset {
                tag: tag.to_string(),
                asset_type: Some("Laptop".into()),
                description: "Latitude 7440".into(),
                po_no: None,
                po_date: None,
                material_code: None,
                value: Decimal::new(125_000, 2),
                vendor: None,
                acquisition_li_id: None,
                status: AssetStatus::Free,
                warranty_upto: None,
                remarks: None,
            },
        )
        .await
        .expect("failed to seed asset")
    }

    pub async fn seed_purchase_order(&self, po_no: &str, qty: i32) -> acquisition::Model {
        self.services
            .acquisitions
            .create_purchase_order(PurchaseOrderInput {
                po_no: po_no.to_string(),
                po_date: po_date(),
                qty,
                vendor_code: Some("V100".into()),
                vendor_name: Some("Acme Computers".into()),
                po_value: Decimal::new(3_000, 0),
                sap_id: Some(4_001),
                dept: Some("IT".into()),
            })
            .await
            .expect("failed to seed purchase order")
    }

    /// Purchase order plus one line item of `qty` units worth `value` in total.
    pub async fn seed_line_item(
        &self,
        po_no: &str,
        qty: i32,
        value: Decimal,
    ) -> acquisition_line_item::Model {
        self.seed_purchase_order(po_no, qty).await;
        self.services
            .acquisitions
            .add_line_item(LineItemInput {
                po_no: po_no.to_string(),
                li_type: Some("Laptop".into()),
                material_code: Some("MAT-77".into()),
                material_description: Some("ThinkPad T14".into()),
                qty,
                po_value: value,
            })
            .await
            .expect("failed to seed line item")
    }

    pub async fn asset(&self, tag: &str) -> asset::Model {
        AssetRepository::find_by_tag(self.db.as_ref(), tag, Lock::None)
            .await
            .expect("asset query failed")
            .expect("asset missing")
    }

    pub async fn latest_allocation(&self, tag: &str) -> Option<allocation::Model> {
        AllocationRepository::find_latest(self.db.as_ref(), tag, Lock::None)
            .await
            .expect("allocation query failed")
    }

    pub async fn allocation_rows(&self, tag: &str) -> Vec<allocation::Model> {
        AllocationRepository::history(self.db.as_ref(), tag)
            .await
            .expect("allocation history query failed")
    }

    pub async fn audit_entries(&self, tag: &str) -> Vec<asset_log::Model> {
        AuditLogRepository::for_tag(self.db.as_ref(), tag)
            .await
            .expect("audit query failed")
    }

    pub async fn line_item(&self, id: i32) -> acquisition_line_item::Model {
        AcquisitionRepository::find_line_item(self.db.as_ref(), id, Lock::None)
            .await
            .expect("line item query failed")
            .expect("line item missing")
    }

    pub async fn asset_count(&self) -> usize {
        let mut total = 0;
        for status in [
            AssetStatus::Free,
            AssetStatus::Alloted,
            AssetStatus::Reallocated,
            AssetStatus::Repair,
            AssetStatus::Repaired,
            AssetStatus::Condemned,
        ] {
            total += AssetRepository::list_by_status(self.db.as_ref(), status)
                .await
                .expect("asset list failed")
                .len();
        }
        total
    }
}

pub fn po_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
}

pub fn employee(name: &str, sap_id: i32) -> EmployeeInfo {
    EmployeeInfo::named(name).with_sap_id(sap_id)
}
