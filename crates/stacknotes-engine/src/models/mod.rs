pub mod active_registry;
pub mod region_list;
pub mod toolbar;

pub use active_registry::{ActiveRegistry, Subscription};
pub use region_list::{Region, RegionId, RegionList, RegionListChange};
pub use toolbar::{Toolbar, ToolbarAction, ToolbarState};
