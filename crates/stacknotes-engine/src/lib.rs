pub mod editing;
pub mod io;
pub mod models;
pub mod workspace;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use editing::*;
pub use io::{autosave::*, *};
pub use models::{active_registry::*, region_list::*, toolbar::*};
pub use workspace::{DEFAULT_NAMESPACE, Workspace, WorkspaceOptions};
