//! Pagination configuration
//!
//! [`PaginationConfig`] holds the defaults attached to one collection and
//! is read-only after setup. [`PageOptions`] carries the per-call overrides.
//! [`PaginationConfig::resolve`] merges the two into a [`PageRequest`].

use crate::error::{Error, Result};
use crate::pagination::{Cursor, PageRequest};
use crate::query::{Filter, Projection, Sort};
use crate::types::{deserialize_lenient_count, JsonValue, SortDirection, IDENTITY_FIELD};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Default page size
pub const DEFAULT_LIMIT: usize = 20;

/// Default smallest accepted page size
pub const DEFAULT_MIN_LIMIT: usize = 1;

/// Default largest accepted page size
pub const DEFAULT_MAX_LIMIT: usize = 100;

// ============================================================================
// Collection Defaults
// ============================================================================

/// Pagination defaults for one collection
///
/// Numeric settings that are missing, zero, or not numbers fall back to
/// their defaults, as does an empty key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPaginationConfig", rename_all = "camelCase")]
pub struct PaginationConfig {
    /// Default sort/cursor field
    pub key: String,
    /// Return plain data instead of hydrated records
    pub lean: bool,
    /// Page size used when the caller's limit is unusable
    pub limit: usize,
    /// Smallest accepted caller limit
    pub min_limit: usize,
    /// Largest accepted caller limit
    pub max_limit: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPaginationConfig {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    lean: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_lenient_count")]
    limit: Option<usize>,
    #[serde(default, alias = "min_limit", deserialize_with = "deserialize_lenient_count")]
    min_limit: Option<usize>,
    #[serde(default, alias = "max_limit", deserialize_with = "deserialize_lenient_count")]
    max_limit: Option<usize>,
}

impl From<RawPaginationConfig> for PaginationConfig {
    fn from(raw: RawPaginationConfig) -> Self {
        Self::default()
            .with_key(raw.key.unwrap_or_default())
            .with_lean(raw.lean.unwrap_or(false))
            .with_limit(raw.limit.unwrap_or(0))
            .with_limit_range(raw.min_limit.unwrap_or(0), raw.max_limit.unwrap_or(0))
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            key: IDENTITY_FIELD.to_string(),
            lean: false,
            limit: DEFAULT_LIMIT,
            min_limit: DEFAULT_MIN_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

impl PaginationConfig {
    /// Create a config with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default key (empty resets to the identity field)
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.key = if key.is_empty() {
            IDENTITY_FIELD.to_string()
        } else {
            key
        };
        self
    }

    /// Set lean mode
    #[must_use]
    pub fn with_lean(mut self, lean: bool) -> Self {
        self.lean = lean;
        self
    }

    /// Set the default page size (zero resets to 20)
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = or_default(limit, DEFAULT_LIMIT);
        self
    }

    /// Set the accepted limit range (zero bounds reset to 1 and 100)
    #[must_use]
    pub fn with_limit_range(mut self, min_limit: usize, max_limit: usize) -> Self {
        self.min_limit = or_default(min_limit, DEFAULT_MIN_LIMIT);
        self.max_limit = or_default(max_limit, DEFAULT_MAX_LIMIT);
        self
    }

    /// Parse from YAML (JSON is valid YAML too)
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse from JSON
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Page size to use for a caller-supplied limit
    ///
    /// Missing or zero limits, and limits outside `[min_limit, max_limit]`,
    /// all yield the configured default. Out-of-range values are replaced,
    /// not clamped. A default outside the range is clamped into it.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(limit) if limit > 0 && (self.min_limit..=self.max_limit).contains(&limit) => limit,
            _ => self.default_limit(),
        }
    }

    /// The configured default page size, pulled into `[min_limit, max_limit]`
    ///
    /// An inverted range resolves to `max_limit`.
    pub fn default_limit(&self) -> usize {
        self.limit.max(self.min_limit).min(self.max_limit)
    }

    /// Merge call-time options over these defaults
    ///
    /// The filter is cloned, never modified.
    pub fn resolve(&self, filter: &Filter, options: PageOptions) -> PageRequest {
        let key = options
            .key
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| self.key.clone());

        PageRequest {
            filter: filter.clone(),
            key,
            sort: options.sort,
            cursor: Cursor::from_bounds(options.starting_after, options.ending_before),
            limit: self.effective_limit(options.limit),
            projection: options.select,
            populate: options.populate,
            lean: options.lean.unwrap_or(self.lean),
        }
    }
}

fn or_default(value: usize, default: usize) -> usize {
    if value == 0 {
        default
    } else {
        value
    }
}

// ============================================================================
// Call-Time Options
// ============================================================================

/// Per-call overrides
///
/// Deserializes from camelCase JSON such as
/// `{"key": "value", "limit": "5", "sort": {"value": -1}, "endingBefore": 995}`.
/// A limit that is not a positive whole number is dropped, which makes the
/// configured default apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOptions {
    /// Sort/cursor field (defaults to the configured key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Fields to return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Projection>,

    /// Relations to expand (a single name or a list)
    #[serde(
        default,
        deserialize_with = "deserialize_populate",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub populate: Vec<String>,

    /// Override lean mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lean: Option<bool>,

    /// Requested page size
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<usize>,

    /// Requested order
    #[serde(default, skip_serializing_if = "Sort::is_empty")]
    pub sort: Sort,

    /// Return records strictly after this key value
    #[serde(default, alias = "starting_after", skip_serializing_if = "Option::is_none")]
    pub starting_after: Option<JsonValue>,

    /// Return records strictly before this key value (wins over `starting_after`)
    #[serde(default, alias = "ending_before", skip_serializing_if = "Option::is_none")]
    pub ending_before: Option<JsonValue>,
}

impl PageOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the limit
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sort on one more field
    #[must_use]
    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.set(field, direction);
        self
    }

    /// Replace the whole sort
    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Set the forward cursor
    #[must_use]
    pub fn after(mut self, value: impl Into<JsonValue>) -> Self {
        self.starting_after = Some(value.into());
        self
    }

    /// Set the backward cursor
    #[must_use]
    pub fn before(mut self, value: impl Into<JsonValue>) -> Self {
        self.ending_before = Some(value.into());
        self
    }

    /// Set the projection
    #[must_use]
    pub fn select(mut self, projection: Projection) -> Self {
        self.select = Some(projection);
        self
    }

    /// Expand one more relation
    #[must_use]
    pub fn populate(mut self, relation: impl Into<String>) -> Self {
        self.populate.push(relation.into());
        self
    }

    /// Override lean mode
    #[must_use]
    pub fn lean(mut self, lean: bool) -> Self {
        self.lean = Some(lean);
        self
    }

    /// Parse from a JSON string
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

fn deserialize_populate<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(name)) => vec![name],
        Some(OneOrMany::Many(names)) => names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_config_defaults() {
        let config = PaginationConfig::default();
        assert_eq!(config.key, "_id");
        assert!(!config.lean);
        assert_eq!(config.limit, 20);
        assert_eq!(config.min_limit, 1);
        assert_eq!(config.max_limit, 100);
    }

    #[test]
    fn test_config_from_yaml() {
        let config = PaginationConfig::from_yaml_str(
            r"
key: value
lean: true
limit: 5
minLimit: 2
maxLimit: 50
",
        )
        .unwrap();

        assert_eq!(
            config,
            PaginationConfig::new()
                .with_key("value")
                .with_lean(true)
                .with_limit(5)
                .with_limit_range(2, 50)
        );
    }

    #[test]
    fn test_config_bad_numbers_fall_back() {
        let config =
            PaginationConfig::from_json_str(r#"{"key": "", "limit": "abc", "minLimit": 0, "maxLimit": -3}"#)
                .unwrap();
        assert_eq!(config, PaginationConfig::default());
    }

    #[test]
    fn test_config_numeric_strings() {
        let config = PaginationConfig::from_json_str(r#"{"limit": "7", "max_limit": "30"}"#).unwrap();
        assert_eq!(config.limit, 7);
        assert_eq!(config.max_limit, 30);
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagination.yaml");
        std::fs::write(&path, "limit: 5\nkey: value\n").unwrap();

        let config = PaginationConfig::from_file(&path).unwrap();
        assert_eq!(config.limit, 5);
        assert_eq!(config.key, "value");

        let missing = PaginationConfig::from_file(dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(Error::FileNotFound { .. })));
    }

    #[test_case(None => 20 ; "absent")]
    #[test_case(Some(0) => 20 ; "zero")]
    #[test_case(Some(1) => 1 ; "min bound")]
    #[test_case(Some(37) => 37 ; "in range")]
    #[test_case(Some(100) => 100 ; "max bound")]
    #[test_case(Some(101) => 20 ; "above max reverts to default")]
    #[test_case(Some(10_000) => 20 ; "far above max reverts to default")]
    fn test_effective_limit(requested: Option<usize>) -> usize {
        PaginationConfig::default().effective_limit(requested)
    }

    #[test]
    fn test_effective_limit_below_min_reverts_to_default() {
        let config = PaginationConfig::new().with_limit(10).with_limit_range(5, 50);
        assert_eq!(config.effective_limit(Some(4)), 10);
        assert_eq!(config.effective_limit(Some(5)), 5);
    }

    #[test_case(5, 10, 100 => 10 ; "default below min")]
    #[test_case(500, 1, 100 => 100 ; "default above max")]
    #[test_case(30, 10, 50 => 30 ; "default in range")]
    #[test_case(30, 60, 50 => 50 ; "inverted range")]
    fn test_default_limit_stays_in_range(limit: usize, min: usize, max: usize) -> usize {
        let config = PaginationConfig::new()
            .with_limit(limit)
            .with_limit_range(min, max);
        config.effective_limit(None)
    }

    #[test_case(json!(5) => Some(5) ; "number")]
    #[test_case(json!("5") => Some(5) ; "numeric string")]
    #[test_case(json!(-5) => None ; "negative")]
    #[test_case(json!(0) => None ; "zero")]
    #[test_case(json!("five") => None ; "non numeric")]
    #[test_case(json!(2.5) => None ; "fraction")]
    #[test_case(json!(null) => None ; "null")]
    fn test_options_limit_coercion(limit: JsonValue) -> Option<usize> {
        let options: PageOptions = serde_json::from_value(json!({ "limit": limit })).unwrap();
        options.limit
    }

    #[test]
    fn test_options_from_json() {
        let options = PageOptions::from_json_str(
            r#"{
                "key": "value",
                "select": "name value",
                "populate": "owner",
                "lean": true,
                "limit": 5,
                "sort": {"value": -1},
                "startingAfter": 4,
                "endingBefore": 995
            }"#,
        )
        .unwrap();

        assert_eq!(options.key.as_deref(), Some("value"));
        assert_eq!(options.select, Some(Projection::parse("name value")));
        assert_eq!(options.populate, vec!["owner".to_string()]);
        assert_eq!(options.lean, Some(true));
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.sort.get("value"), Some(SortDirection::Descending));
        assert_eq!(options.starting_after, Some(json!(4)));
        assert_eq!(options.ending_before, Some(json!(995)));
    }

    #[test]
    fn test_options_populate_list() {
        let options: PageOptions =
            serde_json::from_value(json!({"populate": ["owner", "tags"]})).unwrap();
        assert_eq!(options.populate, vec!["owner".to_string(), "tags".to_string()]);
    }

    #[test]
    fn test_resolve_merges_over_defaults() {
        let config = PaginationConfig::new().with_key("value").with_limit(5).with_lean(true);
        let filter = Filter::new().eq("name", "Ada");

        let request = config.resolve(&filter, PageOptions::new());
        assert_eq!(request.key, "value");
        assert_eq!(request.limit, 5);
        assert!(request.lean);
        assert_eq!(request.cursor, Cursor::None);
        assert_eq!(request.filter, filter);

        let request = config.resolve(
            &filter,
            PageOptions::new().with_key("name").with_limit(8).lean(false),
        );
        assert_eq!(request.key, "name");
        assert_eq!(request.limit, 8);
        assert!(!request.lean);
    }

    #[test]
    fn test_resolve_before_wins_over_after() {
        let request = PaginationConfig::default().resolve(
            &Filter::new(),
            PageOptions::new().after(4).before(995),
        );
        assert_eq!(request.cursor, Cursor::Before(json!(995)));
    }
}
