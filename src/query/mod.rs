//! Query model
//!
//! The paginator never talks to a store directly. It builds a [`Query`]
//! (filter, projection, relations to expand, sort, limit, lean flag) and
//! hands it to a [`QueryEngine`], which returns the matching records in
//! order.

mod filter;
mod projection;
mod sort;
pub mod value;

pub use filter::{Condition, Filter};
pub use projection::Projection;
pub use sort::Sort;

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// A single read against a query engine
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Query {
    /// Predicate every returned record satisfies
    pub filter: Filter,
    /// Fields to return (all when `None`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Projection>,
    /// Relations to expand, in registration order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub populate: Vec<String>,
    /// Result order (natural order when empty)
    pub sort: Sort,
    /// Maximum number of records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Return plain data instead of hydrated records
    pub lean: bool,
}

impl Query {
    /// Create a query matching everything in natural order
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the projection
    #[must_use]
    pub fn with_projection(mut self, projection: Option<Projection>) -> Self {
        self.projection = projection;
        self
    }

    /// Expand one more relation
    #[must_use]
    pub fn with_populate(mut self, relation: impl Into<String>) -> Self {
        self.populate.push(relation.into());
        self
    }

    /// Set the sort
    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Set the limit
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set lean mode
    #[must_use]
    pub fn with_lean(mut self, lean: bool) -> Self {
        self.lean = lean;
        self
    }
}

/// A store that can execute [`Query`] values
///
/// Implementations return records in the order the query's sort demands,
/// at most `limit` of them, or a [`crate::Error::QueryFailure`].
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Record type handed back to callers
    type Record: Send;

    /// Execute a query
    async fn find(&self, query: &Query) -> Result<Vec<Self::Record>>;
}

#[async_trait]
impl<E: QueryEngine + ?Sized> QueryEngine for Arc<E> {
    type Record = E::Record;

    async fn find(&self, query: &Query) -> Result<Vec<Self::Record>> {
        (**self).find(query).await
    }
}
