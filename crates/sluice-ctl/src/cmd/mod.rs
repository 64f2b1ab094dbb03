//! CLI command modules.

pub mod files;
pub mod http;
pub mod status;
