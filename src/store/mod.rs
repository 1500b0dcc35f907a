//! Query engines
//!
//! Two [`QueryEngine`](crate::query::QueryEngine) implementations:
//!
//! - [`MemoryStore`] - an in-process document collection
//! - [`DuckDbStore`] - a DuckDB table
//!
//! Both return `serde_json::Value` objects. Unless a query is lean, records
//! are hydrated with an `id` string mirroring `_id`.

mod duckdb;
mod memory;

pub use self::duckdb::DuckDbStore;
pub use memory::MemoryStore;

use crate::types::{JsonValue, IDENTITY_FIELD};

/// Virtual field added to hydrated records
pub const VIRTUAL_ID_FIELD: &str = "id";

/// Add the `id` virtual to a record that has an identity
pub(crate) fn hydrate(record: &mut JsonValue) {
    let Some(object) = record.as_object_mut() else {
        return;
    };
    if object.contains_key(VIRTUAL_ID_FIELD) {
        return;
    }
    let id = match object.get(IDENTITY_FIELD) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => return,
        Some(other) => other.to_string(),
    };
    object.insert(VIRTUAL_ID_FIELD.to_string(), JsonValue::String(id));
}
