use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, Set};
use serde::{Deserialize, Serialize};

/// Custody status carried by an allocation row.
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
pub enum AllocationStatus {
    #[sea_orm(string_value = "Free")]
    Free,
    #[sea_orm(string_value = "Alloted")]
    Alloted,
    #[sea_orm(string_value = "Reallocated")]
    Reallocated,
    #[sea_orm(string_value = "Repair")]
    Repair,
    #[sea_orm(string_value = "Condemned")]
    Condemned,
}

/// The `allocation` table.
///
/// History is multi-row per tag. The row with the highest `id` for a tag is the
/// current custody record; timestamps are for display only.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "allocation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tag: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(None)", nullable)]
    pub value: Option<Decimal>,
    pub status: AllocationStatus,
    pub sap_id: Option<i32>,
    pub allocated_to: Option<String>,
    pub designation: Option<String>,
    pub division: Option<String>,
    pub department: Option<String>,
    pub building: Option<String>,
    pub phone: Option<String>,
    pub allocated_on: Option<DateTime<Utc>>,
    pub allocated_by: Option<i32>,
    pub deallocated_on: Option<DateTime<Utc>>,
    pub deallocated_by: Option<i32>,
    pub cycle_count: i32,
    pub active: bool,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::asset::Entity",
        from = "Column::Tag",
        to = "super::asset::Column::Tag"
    )]
    Asset,
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asset.def()
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
        }

        active_model.updated_at = Set(Some(now));
        Ok(active_model)
    }
}
