use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

use super::{with_lock, Lock};
use crate::entities::acquisition::{self, Entity as Acquisition};
use crate::entities::acquisition_line_item::{self, Entity as AcquisitionLineItem};
use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchaseOrder {
    pub po_no: String,
    pub po_date: NaiveDate,
    pub qty: i32,
    pub vendor_code: Option<String>,
    pub vendor_name: Option<String>,
    pub po_value: Decimal,
    pub sap_id: Option<i32>,
    pub dept: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLineItem {
    pub po_no: String,
    pub li_type: Option<String>,
    pub material_code: Option<String>,
    pub material_description: Option<String>,
    pub qty: i32,
    pub po_value: Decimal,
}

/// Counter movement on a line item. Deltas are added to the stored values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineItemPatch {
    pub available_delta: i32,
    pub allocated_delta: i32,
    pub created_delta: i32,
    pub mark_tagged: bool,
}

pub struct AcquisitionRepository;

impl AcquisitionRepository {
    pub async fn find_purchase_order<C: ConnectionTrait>(
        db: &C,
        po_no: &str,
        lock: Lock,
    ) -> Result<Option<acquisition::Model>, ServiceError> {
        let select = Acquisition::find().filter(acquisition::Column::PoNo.eq(po_no));
        with_lock(select, db, lock)
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn find_line_item<C: ConnectionTrait>(
        db: &C,
        id: i32,
        lock: Lock,
    ) -> Result<Option<acquisition_line_item::Model>, ServiceError> {
        let select = AcquisitionLineItem::find_by_id(id);
        with_lock(select, db, lock)
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn line_items_for<C: ConnectionTrait>(
        db: &C,
        po_no: &str,
    ) -> Result<Vec<acquisition_line_item::Model>, ServiceError> {
        AcquisitionLineItem::find()
            .filter(acquisition_line_item::Column::PoNo.eq(po_no))
            .order_by_asc(acquisition_line_item::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn create_purchase_order<C: ConnectionTrait>(
        db: &C,
        fields: NewPurchaseOrder,
    ) -> Result<acquisition::Model, ServiceError> {
        acquisition::ActiveModel {
            po_no: Set(fields.po_no),
            po_date: Set(fields.po_date),
            qty: Set(fields.qty),
            vendor_code: Set(fields.vendor_code),
            vendor_name: Set(fields.vendor_name),
            po_value: Set(fields.po_value),
            sap_id: Set(fields.sap_id),
            dept: Set(fields.dept),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    /// Inserts a line item with its whole quantity available and nothing allocated.
    pub async fn create_line_item<C: ConnectionTrait>(
        db: &C,
        fields: NewLineItem,
    ) -> Result<acquisition_line_item::Model, ServiceError> {
        acquisition_line_item::ActiveModel {
            po_no: Set(fields.po_no),
            li_type: Set(fields.li_type),
            material_code: Set(fields.material_code),
            material_description: Set(fields.material_description),
            qty: Set(fields.qty),
            po_value: Set(fields.po_value),
            allocated_qty: Set(0),
            available_qty: Set(fields.qty),
            created_assets: Set(0),
            is_tagged: Set(false),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn update_line_item<C: ConnectionTrait>(
        db: &C,
        row: acquisition_line_item::Model,
        patch: LineItemPatch,
    ) -> Result<acquisition_line_item::Model, ServiceError> {
        let available = row.available_qty + patch.available_delta;
        let allocated = row.allocated_qty + patch.allocated_delta;
        let created = row.created_assets + patch.created_delta;
        let tagged = row.is_tagged || patch.mark_tagged;

        let mut active = row.into_active_model();
        active.available_qty = Set(available);
        active.allocated_qty = Set(allocated);
        active.created_assets = Set(created);
        active.is_tagged = Set(tagged);
        active.update(db).await.map_err(ServiceError::db_error)
    }
}
