use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use super::{with_lock, Lock};
use crate::entities::asset::{self, AssetStatus, Entity as Asset};
use crate::errors::ServiceError;

/// Field set for a new asset row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset {
    pub tag: String,
    pub asset_type: Option<String>,
    pub description: String,
    pub po_no: Option<String>,
    pub po_date: Option<NaiveDate>,
    pub material_code: Option<String>,
    pub value: Decimal,
    pub vendor: Option<String>,
    pub acquisition_li_id: Option<i32>,
    pub status: AssetStatus,
    pub warranty_upto: Option<NaiveDate>,
    pub remarks: Option<String>,
}

pub struct AssetRepository;

impl AssetRepository {
    pub async fn find_by_tag<C: ConnectionTrait>(
        db: &C,
        tag: &str,
        lock: Lock,
    ) -> Result<Option<asset::Model>, ServiceError> {
        let select = Asset::find().filter(asset::Column::Tag.eq(tag));
        with_lock(select, db, lock)
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        fields: NewAsset,
    ) -> Result<asset::Model, ServiceError> {
        asset::ActiveModel {
            tag: Set(fields.tag),
            asset_type: Set(fields.asset_type),
            description: Set(fields.description),
            po_no: Set(fields.po_no),
            po_date: Set(fields.po_date),
            material_code: Set(fields.material_code),
            value: Set(fields.value),
            vendor: Set(fields.vendor),
            acquisition_li_id: Set(fields.acquisition_li_id),
            status: Set(fields.status),
            warranty_upto: Set(fields.warranty_upto),
            remarks: Set(fields.remarks),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    /// Writes a new status onto an existing asset row.
    pub async fn update_status<C: ConnectionTrait>(
        db: &C,
        row: asset::Model,
        status: AssetStatus,
    ) -> Result<asset::Model, ServiceError> {
        let mut active = row.into_active_model();
        active.status = Set(status);
        active.update(db).await.map_err(ServiceError::db_error)
    }

    /// Next tag sequence number: `start` plus the highest asset id so far.
    ///
    /// Callers hold a lock on the purchase order being tagged, which keeps two
    /// writers on the same PO from reading the same maximum.
    pub async fn next_tag_sequence<C: ConnectionTrait>(
        db: &C,
        start: i32,
        lock: Lock,
    ) -> Result<i32, ServiceError> {
        let select = Asset::find()
            .select_only()
            .column(asset::Column::Id)
            .order_by_desc(asset::Column::Id)
            .limit(1);
        let max_id: Option<i32> = with_lock(select, db, lock)
            .into_tuple()
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        start
            .checked_add(max_id.unwrap_or(0))
            .ok_or_else(|| ServiceError::InternalError("asset tag sequence overflowed".to_string()))
    }

    pub async fn list_by_status<C: ConnectionTrait>(
        db: &C,
        status: AssetStatus,
    ) -> Result<Vec<asset::Model>, ServiceError> {
        Asset::find()
            .filter(asset::Column::Status.eq(status))
            .order_by_asc(asset::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}
