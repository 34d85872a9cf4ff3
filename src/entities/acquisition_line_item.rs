use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, Set};
use serde::{Deserialize, Serialize};

/// The `acquisition_line_items` table.
///
/// `available_qty` counts units not yet handed out; `allocated_qty` and
/// `created_assets` only grow.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "acquisition_line_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub po_no: String,
    pub li_type: Option<String>,
    pub material_code: Option<String>,
    pub material_description: Option<String>,
    pub qty: i32,
    #[sea_orm(column_type = "Decimal(None)")]
    pub po_value: Decimal,
    pub allocated_qty: i32,
    pub available_qty: i32,
    pub created_assets: i32,
    pub is_tagged: bool,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Units that have not been turned into an asset yet, by tagging or by
    /// allocation on creation.
    pub fn untagged_qty(&self) -> i32 {
        (self.qty - self.created_assets - self.allocated_qty).max(0)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::acquisition::Entity",
        from = "Column::PoNo",
        to = "super::acquisition::Column::PoNo"
    )]
    Acquisition,
}

impl Related<super::acquisition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Acquisition.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if insert {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
