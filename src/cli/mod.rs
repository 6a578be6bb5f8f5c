//! CLI module
//!
//! Command-line interface over the fetch engine.
//!
//! # Commands
//!
//! - `get` - Fetch one URL (or a whole collection) and print the JSON
//! - `clear` - Remove every cached response of a repository

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
