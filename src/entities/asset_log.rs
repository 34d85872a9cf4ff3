use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, Set};
use serde::{Deserialize, Serialize};

/// Kind of state transition recorded in the audit trail.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(40))")]
pub enum AuditEvent {
    #[sea_orm(string_value = "Tagged")]
    Tagged,
    #[sea_orm(string_value = "Allocated")]
    Allocated,
    #[sea_orm(string_value = "Reallocated")]
    Reallocated,
    #[sea_orm(string_value = "Deallocated")]
    Deallocated,
    #[sea_orm(string_value = "RepairRequested")]
    RepairRequested,
    #[sea_orm(string_value = "RepairAssigned")]
    RepairAssigned,
    #[sea_orm(string_value = "RepairStarted")]
    RepairStarted,
    #[sea_orm(string_value = "RepairPending")]
    RepairPending,
    #[sea_orm(string_value = "RepairCompletedByTech")]
    RepairCompletedByTech,
    #[sea_orm(string_value = "FinalizedFree")]
    FinalizedFree,
    #[sea_orm(string_value = "FinalizedReallocated")]
    FinalizedReallocated,
    #[sea_orm(string_value = "FinalizedCondemned")]
    FinalizedCondemned,
}

/// The `asset_log` table. Rows are written once and never touched again.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "asset_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Latest allocation row for the tag at the time of the event.
    pub allocation_id: Option<i32>,
    pub tag: String,
    pub event: AuditEvent,
    #[sea_orm(column_type = "Text", nullable)]
    pub details: Option<String>,
    pub performed_by: i32,
    pub performed_by_role: Option<String>,
    pub created_at: DateTime<Utc>,
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
        if !insert {
            return Err(DbErr::Custom("asset_log rows are append-only".to_string()));
        }

        let mut active_model = self;
        active_model.created_at = Set(Utc::now());
        Ok(active_model)
    }

    async fn before_delete<C>(self, _db: &C) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        Err(DbErr::Custom("asset_log rows are append-only".to_string()))
    }
}
