pub mod acquisition;
pub mod acquisition_line_item;
pub mod allocation;
pub mod asset;
pub mod asset_issue;
pub mod asset_log;

pub use acquisition::Entity as Acquisition;
pub use acquisition_line_item::Entity as AcquisitionLineItem;
pub use allocation::Entity as Allocation;
pub use asset::Entity as Asset;
pub use asset_issue::Entity as AssetIssue;
pub use asset_log::Entity as AssetLog;
