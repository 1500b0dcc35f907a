//! Common types used throughout cursor-paginate
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Name of the identity field every stored document carries
pub const IDENTITY_FIELD: &str = "_id";

// ============================================================================
// Sort Direction
// ============================================================================

/// Direction of a sort on a single field
///
/// Serialized as `1` (ascending) or `-1` (descending). Deserialization also
/// accepts any positive or negative number and the strings `asc`, `desc`,
/// `ascending`, `descending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

impl SortDirection {
    /// Return the opposite direction
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// Numeric form (`1` or `-1`)
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    /// SQL keyword for this direction
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }

    /// Interpret a JSON value as a sort direction
    pub fn from_value(value: &JsonValue) -> std::result::Result<Self, String> {
        match value {
            JsonValue::Number(n) => match n.as_f64() {
                Some(v) if v > 0.0 => Ok(SortDirection::Ascending),
                Some(v) if v < 0.0 => Ok(SortDirection::Descending),
                _ => Err(format!("invalid sort direction: {n}")),
            },
            JsonValue::String(s) => s.parse(),
            other => Err(format!("invalid sort direction: {other}")),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "asc"),
            SortDirection::Descending => write!(f, "desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "asc" | "ascending" => Ok(SortDirection::Ascending),
            "-1" | "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(format!("invalid sort direction: {other}")),
        }
    }
}

impl Serialize for SortDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        SortDirection::from_value(&value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Lenient Numbers
// ============================================================================

/// Coerce a loosely-typed JSON value into a positive integer
///
/// Numbers and numeric strings are accepted; anything that is not a
/// positive whole number (zero, negatives, fractions, booleans, objects)
/// yields `None`.
pub fn positive_integer(value: &JsonValue) -> Option<usize> {
    let number = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if number.is_finite() && number >= 1.0 && number.fract() == 0.0 {
        Some(number as usize)
    } else {
        None
    }
}

/// Serde helper for fields that accept any value but keep only positive integers
pub(crate) fn deserialize_lenient_count<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(positive_integer))
}
