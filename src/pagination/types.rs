//! Pagination types
//!
//! A [`PageRequest`] is the fully resolved input of one call. Planning it
//! yields a [`PagePlan`]: the query to send plus the bookkeeping needed to
//! turn the fetched records into a [`PageResult`].

use crate::query::{Condition, Filter, Projection, Query, Sort};
use crate::types::{JsonObject, JsonValue, SortDirection};
use serde::{Deserialize, Serialize};

// ============================================================================
// Cursor
// ============================================================================

/// Position to page from, expressed as a value of the key field
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cursor {
    /// Start from the beginning of the requested order
    #[default]
    None,
    /// Records whose key is strictly greater than the value
    After(JsonValue),
    /// Records whose key is strictly less than the value
    Before(JsonValue),
}

impl Cursor {
    /// Pick the cursor from optional bounds; `before` wins when both are set
    pub fn from_bounds(after: Option<JsonValue>, before: Option<JsonValue>) -> Self {
        match (after, before) {
            (_, Some(before)) => Cursor::Before(before),
            (Some(after), None) => Cursor::After(after),
            (None, None) => Cursor::None,
        }
    }

    /// Cursor value, if any
    pub fn value(&self) -> Option<&JsonValue> {
        match self {
            Cursor::None => None,
            Cursor::After(v) | Cursor::Before(v) => Some(v),
        }
    }

    /// Check if no cursor is set
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

// ============================================================================
// Request
// ============================================================================

/// One resolved pagination call
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// Caller's filter (a private copy)
    pub filter: Filter,
    /// Sort/cursor field
    pub key: String,
    /// Caller's requested sort
    pub sort: Sort,
    /// Where to page from
    pub cursor: Cursor,
    /// Page size, already normalized
    pub limit: usize,
    /// Fields to return
    pub projection: Option<Projection>,
    /// Relations to expand
    pub populate: Vec<String>,
    /// Return plain data
    pub lean: bool,
}

impl PageRequest {
    /// Requested direction on the key, if the caller sorted on it
    pub fn sort_direction(&self) -> Option<SortDirection> {
        self.sort.get(&self.key)
    }

    /// Translate the cursor into a range filter, fetch order and fetch size
    ///
    /// `Before` fetches descending from the cursor and `After` fetches
    /// ascending from it. The page is reversed after fetching unless the
    /// caller sorted the key in the fetch direction, so a cursor without a
    /// sort on the key returns records in the opposite order of the fetch.
    pub fn plan(&self) -> PagePlan {
        let mut sort = self.sort.clone();
        let requested = self.sort_direction();

        let (filter, reverse) = match &self.cursor {
            Cursor::None => (self.filter.clone(), false),
            Cursor::Before(value) => {
                let filter = self.filter.with(&self.key, Condition::Lt(value.clone()));
                let reverse = requested != Some(SortDirection::Descending);
                sort.set(&self.key, SortDirection::Descending);
                (filter, reverse)
            }
            Cursor::After(value) => {
                let filter = self.filter.with(&self.key, Condition::Gt(value.clone()));
                let reverse = requested != Some(SortDirection::Ascending);
                sort.set(&self.key, SortDirection::Ascending);
                (filter, reverse)
            }
        };

        let mut query = Query::new()
            .with_filter(filter)
            .with_projection(self.projection.clone())
            .with_sort(sort)
            .with_limit(self.limit.saturating_add(1))
            .with_lean(self.lean);
        for relation in &self.populate {
            query = query.with_populate(relation.clone());
        }

        PagePlan {
            query,
            key: self.key.clone(),
            limit: self.limit,
            reverse,
        }
    }
}

// ============================================================================
// Plan
// ============================================================================

/// A query ready to run, plus how to reconcile its results
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    /// Query to send to the engine (limit is page size + 1)
    pub query: Query,
    /// Sort/cursor field
    pub key: String,
    /// Page size
    pub limit: usize,
    /// Whether the fetch runs against the caller's order
    pub reverse: bool,
}

impl PagePlan {
    /// Direction the fetch runs on the key, if it is sorted on
    pub fn fetch_direction(&self) -> Option<SortDirection> {
        self.query.sort.get(&self.key)
    }

    /// Turn fetched records into a page
    ///
    /// More than `limit` records means another page exists; the extra
    /// record is dropped. Reversed fetches are flipped back into the
    /// caller's order.
    pub fn finish<T>(&self, mut records: Vec<T>) -> PageResult<T> {
        let has_more = records.len() > self.limit;
        records.truncate(self.limit);

        if self.reverse {
            records.reverse();
        }

        PageResult::new(records, has_more)
    }
}

// ============================================================================
// Result
// ============================================================================

/// A bounded page of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    /// Records in the caller's requested order
    pub items: Vec<T>,
    /// Whether more records exist past this page
    pub has_more: bool,
}

impl<T> PageResult<T> {
    /// Create a page
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }

    /// An empty, final page
    pub fn empty() -> Self {
        Self::new(Vec::new(), false)
    }

    /// Number of records on the page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the page has no records
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take the records
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Convert every record
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            has_more: self.has_more,
        }
    }
}

impl<T> Default for PageResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// Cursor Extraction
// ============================================================================

/// Records that can report the value of their key field
pub trait CursorSource {
    /// Value of `key` on this record
    fn cursor_value(&self, key: &str) -> Option<JsonValue>;
}

impl CursorSource for JsonValue {
    fn cursor_value(&self, key: &str) -> Option<JsonValue> {
        crate::query::value::lookup(self, key).cloned()
    }
}

impl CursorSource for JsonObject {
    fn cursor_value(&self, key: &str) -> Option<JsonValue> {
        let (head, rest) = match key.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (key, None),
        };
        let value = self.get(head)?;
        match rest {
            Some(rest) => value.cursor_value(rest),
            None => Some(value.clone()),
        }
    }
}
