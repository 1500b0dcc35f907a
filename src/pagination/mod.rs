//! Pagination module
//!
//! Keyset pagination on a single key field, forward (`startingAfter`) and
//! backward (`endingBefore`).
//!
//! # Overview
//!
//! A page is fetched with one query: the cursor becomes a strict range
//! condition on the key, the sort on the key may be flipped so the fetch
//! starts at the cursor, and one extra record is requested to learn whether
//! another page exists. The fetched records are then trimmed to the page
//! size and put back into the caller's order.

mod paginator;
mod types;

pub use paginator::Paginator;
pub use types::{Cursor, CursorSource, PagePlan, PageRequest, PageResult};
