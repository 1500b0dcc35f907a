//! Sort specifications

use super::value::{compare_values, lookup};
use crate::error::{Error, Result};
use crate::types::{JsonValue, SortDirection};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ordered mapping of field to sort direction
///
/// Earlier fields take priority. An empty sort means the store's natural
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sort(IndexMap<String, SortDirection>);

impl Sort {
    /// Create an empty sort
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, consuming the sort
    #[must_use]
    pub fn by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.set(field, direction);
        self
    }

    /// Ascending on a field
    #[must_use]
    pub fn asc(self, field: impl Into<String>) -> Self {
        self.by(field, SortDirection::Ascending)
    }

    /// Descending on a field
    #[must_use]
    pub fn desc(self, field: impl Into<String>) -> Self {
        self.by(field, SortDirection::Descending)
    }

    /// Set the direction for a field, keeping its position if already present
    pub fn set(&mut self, field: impl Into<String>, direction: SortDirection) {
        self.0.insert(field.into(), direction);
    }

    /// Direction for a field, if sorted on
    pub fn get(&self, field: &str) -> Option<SortDirection> {
        self.0.get(field).copied()
    }

    /// Whether no fields are sorted on
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of sort fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over fields in priority order
    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.0.iter().map(|(field, dir)| (field.as_str(), *dir))
    }

    /// Parse a `field:direction` pair (direction defaults to ascending)
    pub fn parse_pair(pair: &str) -> Result<(String, SortDirection)> {
        let (field, direction) = match pair.split_once(':') {
            Some((field, direction)) => (field.trim(), direction),
            None => (pair.trim(), "asc"),
        };

        if field.is_empty() {
            return Err(Error::invalid_sort(pair, "missing field name"));
        }

        let direction = direction
            .parse::<SortDirection>()
            .map_err(|e| Error::invalid_sort(field, e))?;

        Ok((field.to_string(), direction))
    }

    /// Compare two documents under this sort
    pub fn compare(&self, a: &JsonValue, b: &JsonValue) -> Ordering {
        for (field, direction) in self.iter() {
            let left = lookup(a, field).unwrap_or(&JsonValue::Null);
            let right = lookup(b, field).unwrap_or(&JsonValue::Null);
            let ord = compare_values(left, right);
            let ord = match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl<K: Into<String>> FromIterator<(K, SortDirection)> for Sort {
    fn from_iter<I: IntoIterator<Item = (K, SortDirection)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, d)| (k.into(), d)).collect())
    }
}
