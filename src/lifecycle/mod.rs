//! Status machines for assets, allocations and repair tickets, and the plan
//! type every engine operation goes through before it writes.

pub mod plan;
pub mod transitions;

pub use plan::{AppliedPlan, TransitionPlan};
pub use transitions::{asset_creation_allowed, pairing_is_consistent, StatusMachine};
