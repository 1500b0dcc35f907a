// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # cursor-paginate
//!
//! Keyset ("cursor") pagination over document collections and tables.
//!
//! A page is requested with a key field, a page size, a sort and an optional
//! cursor: `startingAfter` walks forward from a key value and `endingBefore`
//! walks backward. Every page is fetched with a single query and reports
//! whether more records exist beyond it.
//!
//! ## Features
//!
//! - **Keyset Pagination**: Strict range conditions on a key, no offsets
//! - **Bidirectional Cursors**: Forward and backward walks, results always in
//!   the requested order
//! - **Pluggable Engines**: Anything implementing [`QueryEngine`]
//! - **Built-in Stores**: In-memory documents and DuckDB tables
//! - **Page Streams**: Walk a whole collection page by page
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cursor_paginate::{Filter, MemoryStore, PageOptions, Paginator, SortDirection};
//!
//! #[tokio::main]
//! async fn main() -> cursor_paginate::Result<()> {
//!     let store = MemoryStore::new();
//!     store.insert_many(records).await?;
//!
//!     let paginator = Paginator::with_defaults(store);
//!     let options = PageOptions::new()
//!         .with_key("value")
//!         .with_limit(5)
//!         .sort_by("value", SortDirection::Ascending)
//!         .after(4);
//!
//!     let page = paginator.paginate(&Filter::new(), options).await?;
//!     println!("{} items, more: {}", page.len(), page.has_more);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        Paginator                           │
//! │  paginate() → PageResult   paginate_with(handler)  pages() │
//! └────────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────────┬──────────────┴──────────┬───────────────────┐
//! │    Config    │         Plan            │      Engines      │
//! ├──────────────┼─────────────────────────┼───────────────────┤
//! │ Key, lean    │ Cursor → range filter   │ QueryEngine trait │
//! │ Limit range  │ Sort flip + reverse     │ MemoryStore       │
//! │ PageOptions  │ Fetch limit + 1         │ DuckDbStore       │
//! └──────────────┴─────────────────────────┴───────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Query model and the engine trait
pub mod query;

/// Pagination defaults and per-call options
pub mod config;

/// Keyset pagination
pub mod pagination;

/// Query engines
pub mod store;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{PageOptions, PaginationConfig};
pub use error::{Error, Result};
pub use pagination::{Cursor, PageResult, Paginator};
pub use query::{Condition, Filter, Projection, Query, QueryEngine, Sort};
pub use store::{DuckDbStore, MemoryStore};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
