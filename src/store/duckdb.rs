//! DuckDB-backed table store
//!
//! Translates a [`Query`] into parameterized SQL against one table. DuckDB
//! calls are blocking, so every query runs on the blocking thread pool.

use super::hydrate;
use crate::error::{Error, Result};
use crate::query::{Condition, Query, QueryEngine};
use crate::types::{JsonObject, JsonValue, SortDirection, IDENTITY_FIELD};
use async_trait::async_trait;
use duckdb::types::{TimeUnit, Value as SqlValue};
use duckdb::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Query engine over a single DuckDB table
#[derive(Clone)]
pub struct DuckDbStore {
    /// Shared DuckDB connection
    conn: Arc<Mutex<Connection>>,
    /// Table queried by `find`
    table: String,
    /// Populatable columns and the tables their ids point into
    relations: HashMap<String, String>,
}

impl std::fmt::Debug for DuckDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbStore")
            .field("table", &self.table)
            .field("relations", &self.relations)
            .finish_non_exhaustive()
    }
}

impl DuckDbStore {
    /// Open an in-memory database
    pub fn open_in_memory(table: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::config(format!("Failed to create DuckDB connection: {e}")))?;
        Ok(Self::from_connection(conn, table))
    }

    /// Open a database file
    pub fn open(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            Error::config(format!(
                "Failed to open DuckDB database {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self::from_connection(conn, table))
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: Connection, table: impl Into<String>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.into(),
            relations: HashMap::new(),
        }
    }

    /// Another table on the same connection
    #[must_use]
    pub fn table(&self, table: impl Into<String>) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            table: table.into(),
            relations: HashMap::new(),
        }
    }

    /// Register a relation: column `field` holds `_id`s of rows in `table`
    #[must_use]
    pub fn with_relation(mut self, field: impl Into<String>, table: impl Into<String>) -> Self {
        self.relations.insert(field.into(), table.into());
        self
    }

    /// Name of the queried table
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Run raw SQL (schema setup, seeding)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Column names of the queried table, in declaration order
    pub fn columns(&self) -> Result<Vec<String>> {
        let conn = lock(&self.conn)?;
        table_columns(&conn, &self.table)
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| Error::query("DuckDB connection lock poisoned"))
}

#[async_trait]
impl QueryEngine for DuckDbStore {
    type Record = JsonValue;

    async fn find(&self, query: &Query) -> Result<Vec<JsonValue>> {
        let conn = Arc::clone(&self.conn);
        let table = self.table.clone();
        let relations = self.relations.clone();
        let query = query.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            run_query(&conn, &table, &relations, &query)
        })
        .await
        .map_err(|e| Error::query(format!("DuckDB task failed: {e}")))?
    }
}

fn run_query(
    conn: &Connection,
    table: &str,
    relations: &HashMap<String, String>,
    query: &Query,
) -> Result<Vec<JsonValue>> {
    let all_columns = table_columns(conn, table)?;
    let columns: Vec<&str> = match &query.projection {
        Some(projection) => projection.columns(&all_columns),
        None => all_columns.iter().map(String::as_str).collect(),
    };

    let (sql, params) = build_select(table, &columns, query)?;
    tracing::debug!("Executing query: {}", sql);

    let mut records = select_rows(conn, &sql, params, &columns)?;

    for field in &query.populate {
        let target = relations
            .get(field)
            .ok_or_else(|| Error::query(format!("cannot populate unknown relation '{field}'")))?;
        populate(conn, &mut records, field, target, query.lean)?;
    }

    if !query.lean {
        records.iter_mut().for_each(hydrate);
    }

    Ok(records)
}

/// Column names of a table, failing if it does not exist
fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns
         WHERE table_name = ? ORDER BY ordinal_position",
    )?;
    let columns: Vec<String> = stmt
        .query_map([table], |row| row.get(0))?
        .collect::<std::result::Result<_, _>>()?;

    if columns.is_empty() {
        return Err(Error::query(format!("table '{table}' not found")));
    }
    Ok(columns)
}

fn select_rows(
    conn: &Connection,
    sql: &str,
    params: Vec<SqlValue>,
    columns: &[&str],
) -> Result<Vec<JsonValue>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(duckdb::params_from_iter(params), |row| {
        let mut object = JsonObject::new();
        for (i, column) in columns.iter().enumerate() {
            let value: SqlValue = row.get(i)?;
            object.insert((*column).to_string(), sql_value_to_json(value));
        }
        Ok(JsonValue::Object(object))
    })?;

    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn populate(
    conn: &Connection,
    records: &mut [JsonValue],
    field: &str,
    target: &str,
    lean: bool,
) -> Result<()> {
    let target_columns = table_columns(conn, target)?;
    let columns: Vec<&str> = target_columns.iter().map(String::as_str).collect();
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ? LIMIT 1",
        column_list(&columns),
        quote_identifier(target),
        quote_identifier(IDENTITY_FIELD)
    );

    let fetch = |id: &JsonValue| -> Result<Option<JsonValue>> {
        let mut row = select_rows(conn, &sql, vec![json_to_sql(id)], &columns)?;
        let mut doc = row.pop();
        if !lean {
            doc.iter_mut().for_each(hydrate);
        }
        Ok(doc)
    };

    for record in records.iter_mut() {
        let Some(slot) = record.as_object_mut().and_then(|o| o.get_mut(field)) else {
            continue;
        };
        let resolved = match &*slot {
            JsonValue::Null => continue,
            JsonValue::Array(ids) => {
                let mut docs = Vec::with_capacity(ids.len());
                for id in ids {
                    docs.extend(fetch(id)?);
                }
                JsonValue::Array(docs)
            }
            id => fetch(id)?.unwrap_or(JsonValue::Null),
        };
        *slot = resolved;
    }

    Ok(())
}

// ============================================================================
// SQL Generation
// ============================================================================

/// Build `SELECT ... FROM ... WHERE ... ORDER BY ... LIMIT ...` plus its parameters
fn build_select(table: &str, columns: &[&str], query: &Query) -> Result<(String, Vec<SqlValue>)> {
    let mut params = Vec::new();
    let mut clauses = Vec::new();

    for (field, conditions) in query.filter.clauses() {
        if field.contains('.') {
            return Err(Error::query(format!(
                "nested field '{field}' is not supported by the DuckDB store"
            )));
        }
        let column = quote_identifier(field);
        for condition in conditions {
            clauses.push(condition_sql(&column, condition, &mut params));
        }
    }

    let mut sql = format!(
        "SELECT {} FROM {}",
        column_list(columns),
        quote_identifier(table)
    );

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let mut order: Vec<String> = query
        .sort
        .iter()
        .map(|(field, direction)| {
            let nulls = match direction {
                SortDirection::Ascending => "NULLS FIRST",
                SortDirection::Descending => "NULLS LAST",
            };
            format!("{} {} {nulls}", quote_identifier(field), direction.as_sql())
        })
        .collect();
    order.push("rowid ASC".to_string());
    sql.push_str(" ORDER BY ");
    sql.push_str(&order.join(", "));

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    Ok((sql, params))
}

fn condition_sql(column: &str, condition: &Condition, params: &mut Vec<SqlValue>) -> String {
    let mut bind = |value: &JsonValue| {
        params.push(json_to_sql(value));
        "?".to_string()
    };

    match condition {
        Condition::Eq(JsonValue::Null) | Condition::Exists(false) => format!("{column} IS NULL"),
        Condition::Ne(JsonValue::Null) | Condition::Exists(true) => {
            format!("{column} IS NOT NULL")
        }
        Condition::Eq(v) => format!("{column} = {}", bind(v)),
        Condition::Ne(v) => format!("({column} IS NULL OR {column} <> {})", bind(v)),
        Condition::Gt(v) => format!("{column} > {}", bind(v)),
        Condition::Gte(v) => format!("{column} >= {}", bind(v)),
        Condition::Lt(v) => format!("{column} < {}", bind(v)),
        Condition::Lte(v) => format!("{column} <= {}", bind(v)),
        Condition::In(values) if values.is_empty() => "FALSE".to_string(),
        Condition::Nin(values) if values.is_empty() => "TRUE".to_string(),
        Condition::In(values) => {
            let placeholders: Vec<String> = values.iter().map(&mut bind).collect();
            format!("{column} IN ({})", placeholders.join(", "))
        }
        Condition::Nin(values) => {
            let placeholders: Vec<String> = values.iter().map(&mut bind).collect();
            format!(
                "({column} IS NULL OR {column} NOT IN ({}))",
                placeholders.join(", ")
            )
        }
    }
}

fn column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Double-quote an identifier, doubling embedded quotes
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ============================================================================
// Value Conversion
// ============================================================================

/// Convert a JSON value into a bind parameter
fn json_to_sql(value: &JsonValue) -> SqlValue {
    match value {
        JsonValue::Null => SqlValue::Null,
        JsonValue::Bool(b) => SqlValue::Boolean(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::BigInt(i)
            } else if let Some(u) = n.as_u64() {
                SqlValue::UBigInt(u)
            } else {
                SqlValue::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Convert a DuckDB value into JSON
fn sql_value_to_json(value: SqlValue) -> JsonValue {
    match value {
        SqlValue::Null => JsonValue::Null,
        SqlValue::Boolean(b) => JsonValue::Bool(b),
        SqlValue::TinyInt(i) => JsonValue::Number(i.into()),
        SqlValue::SmallInt(i) => JsonValue::Number(i.into()),
        SqlValue::Int(i) => JsonValue::Number(i.into()),
        SqlValue::BigInt(i) => JsonValue::Number(i.into()),
        SqlValue::HugeInt(i) => JsonValue::String(i.to_string()),
        SqlValue::UTinyInt(i) => JsonValue::Number(i.into()),
        SqlValue::USmallInt(i) => JsonValue::Number(i.into()),
        SqlValue::UInt(i) => JsonValue::Number(i.into()),
        SqlValue::UBigInt(i) => JsonValue::Number(i.into()),
        SqlValue::Float(f) => {
            serde_json::Number::from_f64(f64::from(f)).map_or(JsonValue::Null, JsonValue::Number)
        }
        SqlValue::Double(f) => {
            serde_json::Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number)
        }
        SqlValue::Text(s) => JsonValue::String(s),
        SqlValue::Blob(b) => JsonValue::String(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            b,
        )),
        SqlValue::Timestamp(unit, value) => {
            let micros = match unit {
                TimeUnit::Second => value.checked_mul(1_000_000),
                TimeUnit::Millisecond => value.checked_mul(1_000),
                TimeUnit::Microsecond => Some(value),
                TimeUnit::Nanosecond => Some(value.div_euclid(1_000)),
            };
            micros
                .and_then(chrono::DateTime::from_timestamp_micros)
                .map(|dt| JsonValue::String(dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()))
                .unwrap_or(JsonValue::Number(value.into()))
        }
        SqlValue::Date32(days) => {
            // 719163 days separate 0001-01-01 from 1970-01-01
            chrono::NaiveDate::from_num_days_from_ce_opt(days + 719_163)
                .map(|date| JsonValue::String(date.format("%Y-%m-%d").to_string()))
                .unwrap_or(JsonValue::Number(days.into()))
        }
        other => JsonValue::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Filter, Projection, Sort};
    use serde_json::json;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("value"), "\"value\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_build_select_with_range_and_sort() {
        let query = Query::new()
            .with_filter(Filter::new().eq("name", "Ada").lt("value", 995))
            .with_sort(Sort::new().desc("value"))
            .with_limit(6);

        let (sql, params) = build_select("users", &["_id", "value"], &query).unwrap();

        assert_eq!(
            sql,
            "SELECT \"_id\", \"value\" FROM \"users\" WHERE \"name\" = ? AND \"value\" < ? \
             ORDER BY \"value\" DESC NULLS LAST, rowid ASC LIMIT 6"
        );
        assert_eq!(
            params,
            vec![SqlValue::Text("Ada".to_string()), SqlValue::BigInt(995)]
        );
    }

    #[test]
    fn test_build_select_natural_order() {
        let (sql, params) = build_select("users", &["_id"], &Query::new()).unwrap();
        assert_eq!(sql, "SELECT \"_id\" FROM \"users\" ORDER BY rowid ASC");
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_select_rejects_nested_fields() {
        let query = Query::new().with_filter(Filter::new().eq("author.name", "Ada"));
        assert!(build_select("books", &["_id"], &query).is_err());
    }

    #[test]
    fn test_condition_sql() {
        let mut params = Vec::new();
        assert_eq!(
            condition_sql("\"v\"", &Condition::Eq(JsonValue::Null), &mut params),
            "\"v\" IS NULL"
        );
        assert_eq!(
            condition_sql(
                "\"v\"",
                &Condition::In(vec![json!(1), json!(2)]),
                &mut params
            ),
            "\"v\" IN (?, ?)"
        );
        assert_eq!(
            condition_sql("\"v\"", &Condition::In(vec![]), &mut params),
            "FALSE"
        );
        assert_eq!(
            condition_sql("\"v\"", &Condition::Ne(json!("x")), &mut params),
            "(\"v\" IS NULL OR \"v\" <> ?)"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_sql_value_to_json() {
        assert_eq!(sql_value_to_json(SqlValue::Null), JsonValue::Null);
        assert_eq!(sql_value_to_json(SqlValue::Boolean(true)), json!(true));
        assert_eq!(sql_value_to_json(SqlValue::Int(42)), json!(42));
        assert_eq!(
            sql_value_to_json(SqlValue::Text("hello".to_string())),
            json!("hello")
        );
    }

    #[test]
    fn test_sql_timestamp_units() {
        let expected = json!("1970-01-01T00:00:01.500000Z");
        assert_eq!(
            sql_value_to_json(SqlValue::Timestamp(TimeUnit::Millisecond, 1_500)),
            expected
        );
        assert_eq!(
            sql_value_to_json(SqlValue::Timestamp(TimeUnit::Microsecond, 1_500_000)),
            expected
        );
        assert_eq!(
            sql_value_to_json(SqlValue::Timestamp(TimeUnit::Nanosecond, 1_500_000_000)),
            expected
        );
        assert_eq!(
            sql_value_to_json(SqlValue::Timestamp(TimeUnit::Second, 86_400)),
            json!("1970-01-02T00:00:00.000000Z")
        );
    }

    #[tokio::test]
    async fn test_find_reads_timestamp_columns() {
        let store = DuckDbStore::open_in_memory("events").unwrap();
        store
            .execute_batch(
                "CREATE TABLE events (_id BIGINT, at_s TIMESTAMP_S, at_ns TIMESTAMP_NS);
                 INSERT INTO events VALUES (1, TIMESTAMP '2024-03-01 12:30:00', TIMESTAMP '2024-03-01 12:30:00');",
            )
            .unwrap();

        let records = store.find(&Query::new().with_lean(true)).await.unwrap();
        assert_eq!(records[0]["at_s"], json!("2024-03-01T12:30:00.000000Z"));
        assert_eq!(records[0]["at_ns"], json!("2024-03-01T12:30:00.000000Z"));
    }

    #[test]
    fn test_json_to_sql() {
        assert_eq!(json_to_sql(&json!(3)), SqlValue::BigInt(3));
        assert_eq!(json_to_sql(&json!(2.5)), SqlValue::Double(2.5));
        assert_eq!(json_to_sql(&json!("a")), SqlValue::Text("a".to_string()));
        assert_eq!(json_to_sql(&json!(null)), SqlValue::Null);
    }

    fn seeded_store() -> DuckDbStore {
        let store = DuckDbStore::open_in_memory("users").unwrap();
        store
            .execute_batch(
                "CREATE TABLE users (_id BIGINT, name VARCHAR, value BIGINT, team BIGINT);
                 INSERT INTO users SELECT i + 1, 'User ' || CAST(i AS VARCHAR), i, i % 3 FROM range(20) t(i);
                 CREATE TABLE teams (_id BIGINT, title VARCHAR);
                 INSERT INTO teams VALUES (0, 'red'), (1, 'green');",
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_find_range_sort_and_limit() {
        let store = seeded_store();
        let query = Query::new()
            .with_filter(Filter::new().gt("value", 4))
            .with_sort(Sort::new().asc("value"))
            .with_limit(3)
            .with_lean(true);

        let records = store.find(&query).await.unwrap();
        let values: Vec<_> = records.iter().map(|r| r["value"].clone()).collect();
        assert_eq!(values, vec![json!(5), json!(6), json!(7)]);
        assert_eq!(records[0]["name"], json!("User 5"));
    }

    #[tokio::test]
    async fn test_find_projection_and_hydration() {
        let store = seeded_store();
        let query = Query::new()
            .with_projection(Some(Projection::parse("name")))
            .with_limit(1);

        let records = store.find(&query).await.unwrap();
        assert_eq!(
            records,
            vec![json!({"_id": 1, "name": "User 0", "id": "1"})]
        );
    }

    #[tokio::test]
    async fn test_find_populates_relation() {
        let store = seeded_store().with_relation("team", "teams");
        let query = Query::new()
            .with_populate("team")
            .with_limit(3)
            .with_lean(true);

        let records = store.find(&query).await.unwrap();
        assert_eq!(records[0]["team"], json!({"_id": 0, "title": "red"}));
        assert_eq!(records[1]["team"], json!({"_id": 1, "title": "green"}));
        assert_eq!(records[2]["team"], JsonValue::Null);
    }

    #[tokio::test]
    async fn test_find_unknown_table_or_relation() {
        let store = seeded_store();

        let err = store.table("missing").find(&Query::new()).await.unwrap_err();
        assert!(err.is_query_failure());

        let err = store
            .find(&Query::new().with_populate("team"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("team"));
    }

    #[test]
    fn test_columns() {
        let store = seeded_store();
        assert_eq!(store.columns().unwrap(), vec!["_id", "name", "value", "team"]);
        assert_eq!(store.table_name(), "users");
    }
}
