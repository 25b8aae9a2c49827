//! CLI module
//!
//! Command-line interface for running a paginated fetch.
//!
//! # Commands
//!
//! - `fetch` - Fetch every page of a listing and print the items as JSON
//! - `config` - Print the effective configuration as YAML

mod commands;
mod runner;

pub use commands::{Cli, Commands, FetchArgs};
pub use runner::Runner;
