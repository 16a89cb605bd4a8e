//! CLI command implementations.

pub mod lint;
pub mod migrate;
pub mod reverse;
pub mod status;
pub mod version;
