//! CLI command handlers, one per file.

mod bundle;
mod config;
mod fetch;
mod upload;

pub use bundle::run_bundle;
pub use config::run_config;
pub use fetch::run_fetch;
pub use upload::run_upload;
