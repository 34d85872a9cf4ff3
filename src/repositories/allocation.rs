use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

use super::{with_lock, Lock};
use crate::entities::allocation::{self, AllocationStatus, Entity as Allocation};
use crate::errors::ServiceError;

/// Custodian fields written onto an allocation row, with defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignee {
    pub name: String,
    pub sap_id: Option<i32>,
    pub designation: Option<String>,
    pub division: String,
    pub department: String,
    pub building: Option<String>,
    pub phone: Option<String>,
}

/// Field set for a new allocation row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAllocation {
    pub tag: String,
    pub description: Option<String>,
    pub value: Option<Decimal>,
    pub status: AllocationStatus,
    pub assignee: Assignee,
    pub allocated_on: DateTime<Utc>,
    pub allocated_by: i32,
    pub cycle_count: i32,
}

/// Partial update of an existing allocation row. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationPatch {
    pub status: Option<AllocationStatus>,
    pub assignee: Option<Assignee>,
    pub allocated: Option<(DateTime<Utc>, i32)>,
    pub deallocated: Option<(DateTime<Utc>, i32)>,
    pub cycle_count: Option<i32>,
    pub active: Option<bool>,
    pub reason: Option<Option<String>>,
}

impl AllocationPatch {
    pub fn status(status: AllocationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

pub struct AllocationRepository;

impl AllocationRepository {
    /// Latest custody row for `tag`: the highest id, never the newest timestamp.
    pub async fn find_latest<C: ConnectionTrait>(
        db: &C,
        tag: &str,
        lock: Lock,
    ) -> Result<Option<allocation::Model>, ServiceError> {
        let select = Allocation::find()
            .filter(allocation::Column::Tag.eq(tag))
            .order_by_desc(allocation::Column::Id);
        with_lock(select, db, lock)
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Full custody history for `tag`, oldest first.
    pub async fn history<C: ConnectionTrait>(
        db: &C,
        tag: &str,
    ) -> Result<Vec<allocation::Model>, ServiceError> {
        Allocation::find()
            .filter(allocation::Column::Tag.eq(tag))
            .order_by_asc(allocation::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        fields: NewAllocation,
    ) -> Result<allocation::Model, ServiceError> {
        let Assignee {
            name,
            sap_id,
            designation,
            division,
            department,
            building,
            phone,
        } = fields.assignee;

        allocation::ActiveModel {
            tag: Set(fields.tag),
            description: Set(fields.description),
            value: Set(fields.value),
            status: Set(fields.status),
            sap_id: Set(sap_id),
            allocated_to: Set(Some(name)),
            designation: Set(designation),
            division: Set(Some(division)),
            department: Set(Some(department)),
            building: Set(building),
            phone: Set(phone),
            allocated_on: Set(Some(fields.allocated_on)),
            allocated_by: Set(Some(fields.allocated_by)),
            deallocated_on: Set(None),
            deallocated_by: Set(None),
            cycle_count: Set(fields.cycle_count),
            active: Set(true),
            reason: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        row: allocation::Model,
        patch: AllocationPatch,
    ) -> Result<allocation::Model, ServiceError> {
        let mut active = row.into_active_model();

        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(assignee) = patch.assignee {
            active.allocated_to = Set(Some(assignee.name));
            active.sap_id = Set(assignee.sap_id);
            active.designation = Set(assignee.designation);
            active.division = Set(Some(assignee.division));
            active.department = Set(Some(assignee.department));
            active.building = Set(assignee.building);
            active.phone = Set(assignee.phone);
        }
        if let Some((on, by)) = patch.allocated {
            active.allocated_on = Set(Some(on));
            active.allocated_by = Set(Some(by));
        }
        if let Some((on, by)) = patch.deallocated {
            active.deallocated_on = Set(Some(on));
            active.deallocated_by = Set(Some(by));
        }
        if let Some(cycle_count) = patch.cycle_count {
            active.cycle_count = Set(cycle_count);
        }
        if let Some(flag) = patch.active {
            active.active = Set(flag);
        }
        if let Some(reason) = patch.reason {
            active.reason = Set(reason);
        }

        active.update(db).await.map_err(ServiceError::db_error)
    }
}
