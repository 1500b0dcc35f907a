//! Filter predicates
//!
//! A [`Filter`] maps field paths to the conditions their values must meet.
//! All conditions are ANDed. Filters are plain values: adding a condition
//! produces a new filter and never touches the one it was derived from.

use super::value::{compare_same_type, lookup, values_equal};
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;

/// A single constraint on a field value
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Equal to (or, for array fields, containing) the value
    Eq(JsonValue),
    /// Not equal to the value
    Ne(JsonValue),
    /// Strictly greater than the value
    Gt(JsonValue),
    /// Greater than or equal to the value
    Gte(JsonValue),
    /// Strictly less than the value
    Lt(JsonValue),
    /// Less than or equal to the value
    Lte(JsonValue),
    /// Equal to any of the values
    In(Vec<JsonValue>),
    /// Equal to none of the values
    Nin(Vec<JsonValue>),
    /// Field presence
    Exists(bool),
}

impl Condition {
    /// Operator name as written in Mongo-style JSON
    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Eq(_) => "$eq",
            Condition::Ne(_) => "$ne",
            Condition::Gt(_) => "$gt",
            Condition::Gte(_) => "$gte",
            Condition::Lt(_) => "$lt",
            Condition::Lte(_) => "$lte",
            Condition::In(_) => "$in",
            Condition::Nin(_) => "$nin",
            Condition::Exists(_) => "$exists",
        }
    }

    /// Operand as a JSON value
    pub fn operand(&self) -> JsonValue {
        match self {
            Condition::Eq(v)
            | Condition::Ne(v)
            | Condition::Gt(v)
            | Condition::Gte(v)
            | Condition::Lt(v)
            | Condition::Lte(v) => v.clone(),
            Condition::In(vs) | Condition::Nin(vs) => JsonValue::Array(vs.clone()),
            Condition::Exists(b) => JsonValue::Bool(*b),
        }
    }

    /// Parse an `$op: operand` pair
    pub fn parse(operator: &str, operand: &JsonValue) -> Result<Self> {
        let list = |operand: &JsonValue| -> Result<Vec<JsonValue>> {
            operand.as_array().cloned().ok_or_else(|| {
                Error::invalid_filter(format!("{operator} expects an array, got {operand}"))
            })
        };

        Ok(match operator {
            "$eq" => Condition::Eq(operand.clone()),
            "$ne" => Condition::Ne(operand.clone()),
            "$gt" => Condition::Gt(operand.clone()),
            "$gte" => Condition::Gte(operand.clone()),
            "$lt" => Condition::Lt(operand.clone()),
            "$lte" => Condition::Lte(operand.clone()),
            "$in" => Condition::In(list(operand)?),
            "$nin" => Condition::Nin(list(operand)?),
            "$exists" => Condition::Exists(operand.as_bool().ok_or_else(|| {
                Error::invalid_filter(format!("$exists expects a boolean, got {operand}"))
            })?),
            other => {
                return Err(Error::invalid_filter(format!(
                    "unsupported operator '{other}'"
                )))
            }
        })
    }

    /// Check whether a (possibly missing) field value satisfies this condition
    pub fn matches(&self, field: Option<&JsonValue>) -> bool {
        match self {
            Condition::Eq(target) => equals(field, target),
            Condition::Ne(target) => !equals(field, target),
            Condition::Gt(target) => ranges(field, target, |o| o == Ordering::Greater),
            Condition::Gte(target) => ranges(field, target, |o| o != Ordering::Less),
            Condition::Lt(target) => ranges(field, target, |o| o == Ordering::Less),
            Condition::Lte(target) => ranges(field, target, |o| o != Ordering::Greater),
            Condition::In(targets) => targets.iter().any(|t| equals(field, t)),
            Condition::Nin(targets) => !targets.iter().any(|t| equals(field, t)),
            Condition::Exists(expected) => field.is_some() == *expected,
        }
    }
}

fn equals(field: Option<&JsonValue>, target: &JsonValue) -> bool {
    match field {
        None => target.is_null(),
        Some(JsonValue::Array(items)) if !target.is_array() => {
            items.iter().any(|item| values_equal(item, target))
        }
        Some(value) => values_equal(value, target),
    }
}

fn ranges(field: Option<&JsonValue>, target: &JsonValue, accept: impl Fn(Ordering) -> bool) -> bool {
    match field {
        None => false,
        Some(JsonValue::Array(items)) if !target.is_array() => items
            .iter()
            .any(|item| compare_same_type(item, target).is_some_and(&accept)),
        Some(value) => compare_same_type(value, target).is_some_and(accept),
    }
}

/// A conjunction of field conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: IndexMap<String, Vec<Condition>>,
}

impl Filter {
    /// Create an empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the filter has no conditions
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Iterate over fields and their conditions
    pub fn clauses(&self) -> impl Iterator<Item = (&str, &[Condition])> {
        self.clauses
            .iter()
            .map(|(field, conditions)| (field.as_str(), conditions.as_slice()))
    }

    /// Conditions on a single field
    pub fn conditions(&self, field: &str) -> &[Condition] {
        self.clauses.get(field).map_or(&[][..], Vec::as_slice)
    }

    /// Add a condition, consuming the filter
    #[must_use]
    pub fn and(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.entry(field.into()).or_default().push(condition);
        self
    }

    /// Derive a new filter with one more condition, leaving `self` untouched
    #[must_use]
    pub fn with(&self, field: impl Into<String>, condition: Condition) -> Self {
        self.clone().and(field, condition)
    }

    /// Add an equality condition
    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.and(field, Condition::Eq(value.into()))
    }

    /// Add a greater-than condition
    #[must_use]
    pub fn gt(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.and(field, Condition::Gt(value.into()))
    }

    /// Add a greater-than-or-equal condition
    #[must_use]
    pub fn gte(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.and(field, Condition::Gte(value.into()))
    }

    /// Add a less-than condition
    #[must_use]
    pub fn lt(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.and(field, Condition::Lt(value.into()))
    }

    /// Add a less-than-or-equal condition
    #[must_use]
    pub fn lte(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.and(field, Condition::Lte(value.into()))
    }

    /// Check a document against every condition
    pub fn matches(&self, document: &JsonValue) -> bool {
        self.clauses.iter().all(|(field, conditions)| {
            let value = lookup(document, field);
            conditions.iter().all(|c| c.matches(value))
        })
    }

    /// Parse a Mongo-style JSON filter
    ///
    /// `{"name": "Ada", "value": {"$gte": 10, "$lt": 20}}`
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let object = match value {
            JsonValue::Null => return Ok(Self::new()),
            JsonValue::Object(object) => object,
            other => {
                return Err(Error::invalid_filter(format!(
                    "filter must be an object, got {other}"
                )))
            }
        };

        let mut filter = Self::new();
        for (field, spec) in object {
            if field.starts_with('$') {
                return Err(Error::invalid_filter(format!(
                    "unsupported top-level operator '{field}'"
                )));
            }

            match spec {
                JsonValue::Object(ops) if is_operator_object(ops) => {
                    for (operator, operand) in ops {
                        filter = filter.and(field.clone(), Condition::parse(operator, operand)?);
                    }
                }
                other => filter = filter.and(field.clone(), Condition::Eq(other.clone())),
            }
        }

        Ok(filter)
    }

    /// Render as Mongo-style JSON
    pub fn to_json(&self) -> JsonValue {
        let mut object = JsonObject::new();
        for (field, conditions) in &self.clauses {
            let rendered = match conditions.as_slice() {
                [Condition::Eq(value)] if !is_operator_like(value) => value.clone(),
                _ => {
                    let mut ops = JsonObject::new();
                    for condition in conditions {
                        ops.insert(condition.operator().to_string(), condition.operand());
                    }
                    JsonValue::Object(ops)
                }
            };
            object.insert(field.clone(), rendered);
        }
        JsonValue::Object(object)
    }
}

fn is_operator_object(ops: &JsonObject) -> bool {
    !ops.is_empty() && ops.keys().all(|k| k.starts_with('$'))
}

fn is_operator_like(value: &JsonValue) -> bool {
    value.as_object().is_some_and(is_operator_object)
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Filter::from_json(&value).map_err(serde::de::Error::custom)
    }
}
