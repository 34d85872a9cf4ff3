//! Purchase-order intake and bulk tagging of line items into assets.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use super::record_outcome;
use crate::config::LifecycleConfig;
use crate::db::DatabaseAccess;
use crate::entities::asset::AssetStatus;
use crate::entities::asset_log::AuditEvent;
use crate::entities::{acquisition, acquisition_line_item, asset};
use crate::errors::ServiceError;
use crate::lifecycle::TransitionPlan;
use crate::repositories::acquisition::{LineItemPatch, NewLineItem, NewPurchaseOrder};
use crate::repositories::asset::NewAsset;
use crate::repositories::audit_log::NewAuditEntry;
use crate::repositories::{AcquisitionRepository, AssetRepository, Lock};

/// Builds an asset tag: `{po_no}/{YYYY-MM of po_date}/{sequence}`.
pub fn format_asset_tag(po_no: &str, po_date: NaiveDate, sequence: i32) -> String {
    format!("{}/{}/{}", po_no, po_date.format("%Y-%m"), sequence)
}

/// Value of one unit of a line item. A zero or negative quantity counts as one.
pub fn unit_value(po_value: Decimal, qty: i32) -> Decimal {
    (po_value / Decimal::from(qty.max(1))).round_dp(4)
}

/// Field set for an asset cut from `line_item`.
pub(crate) fn asset_from_line_item(
    line_item: &acquisition_line_item::Model,
    po: &acquisition::Model,
    tag: String,
    status: AssetStatus,
    remarks: String,
) -> NewAsset {
    let description = line_item
        .material_description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| "UNKNOWN".to_string());

    NewAsset {
        tag,
        asset_type: line_item.li_type.clone(),
        description,
        po_no: Some(po.po_no.clone()),
        po_date: Some(po.po_date),
        material_code: line_item.material_code.clone(),
        value: unit_value(line_item.po_value, line_item.qty),
        vendor: po.vendor_name.clone(),
        acquisition_li_id: Some(line_item.id),
        status,
        warranty_upto: None,
        remarks: Some(remarks),
    }
}

/// Locks a line item and its purchase order.
///
/// The PO row lock also serializes tag generation: every tag carries the PO
/// number, so two writers can only collide while tagging the same PO.
pub(crate) async fn lock_line_item_and_po<C: ConnectionTrait>(
    db: &C,
    line_item_id: i32,
) -> Result<(acquisition_line_item::Model, acquisition::Model), ServiceError> {
    let line_item = AcquisitionRepository::find_line_item(db, line_item_id, Lock::Update)
        .await?
        .ok_or(ServiceError::LineItemNotFound(line_item_id))?;
    let po = AcquisitionRepository::find_purchase_order(db, &line_item.po_no, Lock::Update)
        .await?
        .ok_or_else(|| ServiceError::PurchaseOrderNotFound(line_item.po_no.clone()))?;
    Ok((line_item, po))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PurchaseOrderInput {
    #[validate(length(min = 1, max = 64))]
    pub po_no: String,
    pub po_date: NaiveDate,
    #[validate(range(min = 0))]
    pub qty: i32,
    pub vendor_code: Option<String>,
    pub vendor_name: Option<String>,
    pub po_value: Decimal,
    pub sap_id: Option<i32>,
    pub dept: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineItemInput {
    #[validate(length(min = 1, max = 64))]
    pub po_no: String,
    pub li_type: Option<String>,
    pub material_code: Option<String>,
    pub material_description: Option<String>,
    #[validate(range(min = 1))]
    pub qty: i32,
    pub po_value: Decimal,
}

#[derive(Clone)]
pub struct AcquisitionService {
    db: DatabaseAccess,
    lifecycle: Arc<LifecycleConfig>,
}

impl AcquisitionService {
    pub fn new(db_pool: Arc<DatabaseConnection>, lifecycle: Arc<LifecycleConfig>) -> Self {
        Self {
            db: DatabaseAccess::new(db_pool),
            lifecycle,
        }
    }

    #[instrument(skip(self, input), fields(po_no = %input.po_no))]
    pub async fn create_purchase_order(
        &self,
        input: PurchaseOrderInput,
    ) -> Result<acquisition::Model, ServiceError> {
        input.validate()?;
        if input.po_value.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "po_value cannot be negative".to_string(),
            ));
        }

        let po = AcquisitionRepository::create_purchase_order(
            self.db.get_pool(),
            NewPurchaseOrder {
                po_no: input.po_no.trim().to_string(),
                po_date: input.po_date,
                qty: input.qty,
                vendor_code: input.vendor_code,
                vendor_name: input.vendor_name,
                po_value: input.po_value,
                sap_id: input.sap_id,
                dept: input.dept,
            },
        )
        .await?;

        info!(po_id = po.id, "Purchase order recorded");
        Ok(po)
    }

    /// Adds a line item to an existing purchase order. The whole quantity
    /// starts out available.
    #[instrument(skip(self, input), fields(po_no = %input.po_no))]
    pub async fn add_line_item(
        &self,
        input: LineItemInput,
    ) -> Result<acquisition_line_item::Model, ServiceError> {
        input.validate()?;
        if input.po_value.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "po_value cannot be negative".to_string(),
            ));
        }

        let db = self.db.get_pool();
        let po_no = input.po_no.trim().to_string();
        AcquisitionRepository::find_purchase_order(db, &po_no, Lock::None)
            .await?
            .ok_or_else(|| ServiceError::PurchaseOrderNotFound(po_no.clone()))?;

        let line_item = AcquisitionRepository::create_line_item(
            db,
            NewLineItem {
                po_no,
                li_type: input.li_type,
                material_code: input.material_code,
                material_description: input.material_description,
                qty: input.qty,
                po_value: input.po_value,
            },
        )
        .await?;

        info!(line_item_id = line_item.id, "Line item recorded");
        Ok(line_item)
    }

    pub async fn line_items(
        &self,
        po_no: &str,
    ) -> Result<Vec<acquisition_line_item::Model>, ServiceError> {
        AcquisitionRepository::line_items_for(self.db.get_pool(), po_no).await
    }

    /// Tags `quantity` new Free assets out of a line item.
    ///
    /// Fails with `NoAvailableQuantity` when the line item has fewer untagged
    /// units than requested.
    #[instrument(skip(self))]
    pub async fn create_assets_from_line_item(
        &self,
        line_item_id: i32,
        quantity: i32,
        actor_id: Option<i32>,
    ) -> Result<Vec<asset::Model>, ServiceError> {
        const OP: &str = "create_assets_from_line_item";

        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }
        let actor = self.lifecycle.resolve_actor(actor_id);

        let unit = self.db.begin(OP).await?;
        let result = self
            .create_assets_in(unit.txn(), line_item_id, quantity, actor)
            .await;
        let result = unit.finish(result).await;
        record_outcome(OP, &result);
        result
    }

    async fn create_assets_in<C: ConnectionTrait>(
        &self,
        txn: &C,
        line_item_id: i32,
        quantity: i32,
        actor: i32,
    ) -> Result<Vec<asset::Model>, ServiceError> {
        let (line_item, po) = lock_line_item_and_po(txn, line_item_id).await?;
        if quantity > line_item.untagged_qty() {
            return Err(ServiceError::NoAvailableQuantity(line_item.id));
        }
        let first =
            AssetRepository::next_tag_sequence(txn, self.lifecycle.tag_sequence_start, Lock::Update)
                .await?;

        let mut plans = Vec::with_capacity(usize::try_from(quantity).unwrap_or_default());
        for offset in 0..quantity {
            let sequence = first.checked_add(offset).ok_or_else(|| {
                ServiceError::InternalError("asset tag sequence overflowed".to_string())
            })?;
            let tag = format_asset_tag(&po.po_no, po.po_date, sequence);
            let mut plan = TransitionPlan::new(tag.clone(), None, None);
            plan.create_asset(asset_from_line_item(
                &line_item,
                &po,
                tag.clone(),
                AssetStatus::Free,
                format!("Created from LI {}", line_item.id),
            ))
            .audit(NewAuditEntry {
                tag,
                event: AuditEvent::Tagged,
                details: format!("Tagged from line item {} of PO {}", line_item.id, po.po_no),
                performed_by: actor,
                performed_by_role: None,
            });
            plans.push(plan);
        }

        if let Some(last) = plans.last_mut() {
            last.update_line_item(
                line_item,
                LineItemPatch {
                    created_delta: quantity,
                    mark_tagged: true,
                    ..Default::default()
                },
            );
        }

        for plan in &plans {
            plan.validate()?;
        }

        let mut created = Vec::with_capacity(plans.len());
        for plan in plans {
            created.push(plan.apply(txn).await?.asset);
        }

        info!(line_item_id, count = created.len(), "Assets tagged from line item");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tag_uses_po_year_month() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(format_asset_tag("PO-77", date, 100_001), "PO-77/2024-03/100001");
    }

    #[test]
    fn unit_value_splits_po_value() {
        assert_eq!(unit_value(dec!(1000), 4), dec!(250));
        assert_eq!(unit_value(dec!(1000), 3), dec!(333.3333));
    }

    #[test]
    fn unit_value_treats_zero_quantity_as_one() {
        assert_eq!(unit_value(dec!(120.50), 0), dec!(120.50));
    }
}
