//! CLI module
//!
//! Command-line interface for ad-hoc API calls.
//!
//! # Commands
//!
//! - `get` - Fetch an endpoint, optionally following every page
//! - `health` - Probe the API with the configured credentials
//! - `me` - Show the authenticated person

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
