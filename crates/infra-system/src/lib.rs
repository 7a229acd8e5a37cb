// cogdb Infrastructure - System Adapters
// Implements: MigrationTool

pub mod executable;
pub mod piccolo_cli;

pub use executable::{find_executable_in, find_piccolo_executable};
pub use piccolo_cli::PiccoloCli;
