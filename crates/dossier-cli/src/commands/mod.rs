//! Command implementations.

pub mod process;
pub mod report;
pub mod schemas;

pub use self::process::{execute_process, provider_from_config};
pub use self::report::execute_report;
pub use self::schemas::execute_schemas;
