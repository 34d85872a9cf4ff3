use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a physical asset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum AssetStatus {
    #[sea_orm(string_value = "Free")]
    Free,
    #[sea_orm(string_value = "Alloted")]
    Alloted,
    #[sea_orm(string_value = "Reallocated")]
    Reallocated,
    #[sea_orm(string_value = "Repair")]
    Repair,
    /// Technician signed off; waiting for an admin to finalize.
    #[sea_orm(string_value = "Repaired")]
    Repaired,
    #[sea_orm(string_value = "Condemned")]
    Condemned,
}

/// The `assets` table. One row per individually tagged item.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub tag: String,
    pub asset_type: Option<String>,
    pub description: String,
    pub po_no: Option<String>,
    pub po_date: Option<NaiveDate>,
    pub material_code: Option<String>,
    #[sea_orm(column_type = "Decimal(None)")]
    pub value: Decimal,
    pub vendor: Option<String>,
    pub acquisition_li_id: Option<i32>,
    pub status: AssetStatus,
    pub warranty_upto: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::allocation::Entity")]
    Allocation,
    #[sea_orm(has_many = "super::asset_issue::Entity")]
    AssetIssue,
    #[sea_orm(has_many = "super::asset_log::Entity")]
    AssetLog,
}

impl Related<super::allocation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allocation.def()
    }
}

impl Related<super::asset_issue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssetIssue.def()
    }
}

impl Related<super::asset_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssetLog.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
            if let ActiveValue::NotSet = active_model.status {
                active_model.status = Set(AssetStatus::Free);
            }
        } else if active_model.tag.is_set() {
            return Err(DbErr::Custom("asset tag is immutable".to_string()));
        }

        active_model.updated_at = Set(Some(now));
        Ok(active_model)
    }
}
