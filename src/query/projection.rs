//! Field projections

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, IDENTITY_FIELD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which fields of a record to return
///
/// Written as a space-separated list where a leading `-` excludes a field:
/// `"name value -_id"`. When any field is included only included fields
/// (plus the identity field, unless excluded) are returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl Projection {
    /// Parse a space- or comma-separated field list
    pub fn parse(spec: &str) -> Self {
        let mut projection = Self::default();
        for token in spec.split(|c: char| c.is_whitespace() || c == ',') {
            if let Some(field) = token.strip_prefix('-') {
                if !field.is_empty() {
                    projection.exclude.push(field.to_string());
                }
            } else if let Some(field) = token.strip_prefix('+') {
                if !field.is_empty() {
                    projection.include.push(field.to_string());
                }
            } else if !token.is_empty() {
                projection.include.push(token.to_string());
            }
        }
        projection
    }

    /// Build from a JSON value: a string, a list of names, or `{field: 0|1}`
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        match value {
            JsonValue::String(spec) => Ok(Self::parse(spec)),
            JsonValue::Array(items) => {
                let mut projection = Self::default();
                for item in items {
                    let name = item.as_str().ok_or_else(|| {
                        Error::config(format!("projection entries must be strings, got {item}"))
                    })?;
                    projection.merge(&Self::parse(name));
                }
                Ok(projection)
            }
            JsonValue::Object(fields) => {
                let mut projection = Self::default();
                for (field, flag) in fields {
                    let keep = match flag {
                        JsonValue::Bool(b) => *b,
                        JsonValue::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
                        other => {
                            return Err(Error::config(format!(
                                "projection flag for '{field}' must be 0/1, got {other}"
                            )))
                        }
                    };
                    if keep {
                        projection.include.push(field.clone());
                    } else {
                        projection.exclude.push(field.clone());
                    }
                }
                Ok(projection)
            }
            other => Err(Error::config(format!("invalid projection: {other}"))),
        }
    }

    fn merge(&mut self, other: &Self) {
        self.include.extend(other.include.iter().cloned());
        self.exclude.extend(other.exclude.iter().cloned());
    }

    /// Included field names
    pub fn included(&self) -> &[String] {
        &self.include
    }

    /// Excluded field names
    pub fn excluded(&self) -> &[String] {
        &self.exclude
    }

    /// The same projection, changed so that it keeps `field`
    #[must_use]
    pub fn keeping(mut self, field: &str) -> Self {
        self.exclude.retain(|f| f != field);
        if !self.include.is_empty() && !self.include.iter().any(|f| f == field) {
            self.include.push(field.to_string());
        }
        self
    }

    /// Whether this projection keeps the given top-level field
    pub fn keeps(&self, field: &str) -> bool {
        if self.exclude.iter().any(|f| f == field) {
            return false;
        }
        self.include.is_empty() || field == IDENTITY_FIELD || self.include.iter().any(|f| f == field)
    }

    /// Apply to a document
    pub fn apply(&self, document: JsonObject) -> JsonObject {
        document
            .into_iter()
            .filter(|(field, _)| self.keeps(field))
            .collect()
    }

    /// Select the kept columns out of a table's column list, preserving order
    pub fn columns<'a>(&self, all: &'a [String]) -> Vec<&'a str> {
        all.iter()
            .map(String::as_str)
            .filter(|c| self.keeps(c))
            .collect()
    }
}

impl Serialize for Projection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let rendered: Vec<String> = self
            .include
            .iter()
            .cloned()
            .chain(self.exclude.iter().map(|f| format!("-{f}")))
            .collect();
        serializer.serialize_str(&rendered.join(" "))
    }
}

impl<'de> Deserialize<'de> for Projection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Projection::from_json(&value).map_err(serde::de::Error::custom)
    }
}
