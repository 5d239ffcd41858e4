//! Sea-ORM entity definitions

pub mod canvas_sync_status;
pub mod network_node;

pub use canvas_sync_status::Entity as CanvasSyncStatus;
pub use network_node::Entity as NetworkNode;

pub use canvas_sync_status::ActiveModel as CanvasSyncStatusActive;
pub use network_node::ActiveModel as NetworkNodeActive;
