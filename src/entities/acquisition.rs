use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The `acquisition` table: one purchase order header per row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "acquisition")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub po_no: String,
    pub po_date: NaiveDate,
    pub qty: i32,
    pub vendor_code: Option<String>,
    pub vendor_name: Option<String>,
    #[sea_orm(column_type = "Decimal(None)")]
    pub po_value: Decimal,
    pub sap_id: Option<i32>,
    pub dept: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::acquisition_line_item::Entity")]
    LineItems,
}

impl Related<super::acquisition_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
