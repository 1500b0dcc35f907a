//! CLI module
//!
//! Command-line interface for paging through a data source.
//!
//! # Commands
//!
//! - `page` - Fetch a single page
//! - `walk` - Follow the cursor and print every page

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, QueryArgs};
pub use runner::Runner;
