//! strata CLI - command-line interface for strata migrations.
//!
//! Wraps the `strata-migrate` engine: loads `strata.toml`, merges flags and
//! environment variables into a `MigratorConfig`, and prints results.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
