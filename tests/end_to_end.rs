//! End-to-end pagination tests
//!
//! Every scenario runs against both built-in stores seeded with the same
//! 1000 records: `{name: "User i", value: i}` for `i` in `0..1000`.

use cursor_paginate::{
    DuckDbStore, Filter, MemoryStore, PageOptions, PageResult, PaginationConfig, Paginator,
    QueryEngine, SortDirection,
};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const RECORDS: usize = 1000;

async fn memory_paginator() -> Paginator<MemoryStore> {
    let store = MemoryStore::new();
    let documents = (0..RECORDS).map(|i| json!({"name": format!("User {i}"), "value": i}));
    store.insert_many(documents).await.unwrap();
    Paginator::with_defaults(store)
}

fn duckdb_paginator(path: &std::path::Path) -> Paginator<DuckDbStore> {
    let store = DuckDbStore::open(path, "users").unwrap();
    store
        .execute_batch(
            "CREATE TABLE users (_id BIGINT, name VARCHAR, value BIGINT);
             INSERT INTO users SELECT i + 1, 'User ' || CAST(i AS VARCHAR), i FROM range(1000) t(i);",
        )
        .unwrap();
    Paginator::with_defaults(store)
}

fn values(page: &PageResult<Value>) -> Vec<i64> {
    page.items
        .iter()
        .map(|r| r["value"].as_i64().unwrap())
        .collect()
}

fn options(direction: SortDirection) -> PageOptions {
    PageOptions::new()
        .with_key("value")
        .with_limit(5)
        .sort_by("value", direction)
}

async fn run_scenario<E: QueryEngine<Record = Value>>(paginator: &Paginator<E>) {
    let filter = Filter::new();

    // No options: default key and limit
    let page = paginator
        .paginate(&filter, PageOptions::new().with_limit(5))
        .await
        .unwrap();
    assert_eq!(page.len(), 5);
    assert!(page.has_more);

    // Ascending
    let page = paginator
        .paginate(&filter, options(SortDirection::Ascending))
        .await
        .unwrap();
    assert_eq!(values(&page), vec![0, 1, 2, 3, 4]);
    assert!(page.has_more);

    // Ascending after 4
    let page = paginator
        .paginate(&filter, options(SortDirection::Ascending).after(4))
        .await
        .unwrap();
    assert_eq!(values(&page), vec![5, 6, 7, 8, 9]);
    assert!(page.has_more);

    // Ascending after 998: last record only
    let page = paginator
        .paginate(&filter, options(SortDirection::Ascending).after(998))
        .await
        .unwrap();
    assert_eq!(values(&page), vec![999]);
    assert!(!page.has_more);

    // Descending
    let page = paginator
        .paginate(&filter, options(SortDirection::Descending))
        .await
        .unwrap();
    assert_eq!(values(&page), vec![999, 998, 997, 996, 995]);
    assert!(page.has_more);

    // Descending before 995
    let page = paginator
        .paginate(&filter, options(SortDirection::Descending).before(995))
        .await
        .unwrap();
    assert_eq!(values(&page), vec![994, 993, 992, 991, 990]);
    assert!(page.has_more);

    // Backward walk returned in ascending order
    let page = paginator
        .paginate(&filter, options(SortDirection::Ascending).before(5))
        .await
        .unwrap();
    assert_eq!(values(&page), vec![0, 1, 2, 3, 4]);
    assert!(!page.has_more);

    // Caller filter combined with the cursor and left untouched
    let filter = Filter::new().gte("value", 500);
    let snapshot = filter.clone();
    let page = paginator
        .paginate(&filter, options(SortDirection::Ascending).after(10))
        .await
        .unwrap();
    assert_eq!(values(&page), vec![500, 501, 502, 503, 504]);
    assert_eq!(filter, snapshot);
}

#[tokio::test]
async fn test_memory_store_scenario() {
    let paginator = memory_paginator().await;
    run_scenario(&paginator).await;
}

#[tokio::test]
async fn test_duckdb_store_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let paginator = duckdb_paginator(&dir.path().join("users.duckdb"));
    run_scenario(&paginator).await;
}

#[tokio::test]
async fn test_out_of_range_limit_uses_default() {
    let paginator = memory_paginator().await;
    let page = paginator
        .paginate(&Filter::new(), PageOptions::new().with_limit(1000))
        .await
        .unwrap();
    assert_eq!(page.len(), 20);
    assert!(page.has_more);
}

#[tokio::test]
async fn test_options_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let paginator = duckdb_paginator(&dir.path().join("users.duckdb"));
    let options = PageOptions::from_json_str(
        r#"{"key": "value", "limit": "5", "sort": {"value": -1}, "endingBefore": 995}"#,
    )
    .unwrap();

    let page = paginator.paginate(&Filter::new(), options).await.unwrap();
    assert_eq!(values(&page), vec![994, 993, 992, 991, 990]);
}

#[tokio::test]
async fn test_configured_defaults() {
    let config = PaginationConfig::from_yaml_str("key: value\nlimit: 3\nlean: true\n").unwrap();
    let store = MemoryStore::new();
    store
        .insert_many((0..10).map(|i| json!({"value": 9 - i})))
        .await
        .unwrap();
    let paginator = Paginator::new(store, config);

    let page = paginator
        .paginate(&Filter::new(), PageOptions::new().after(2))
        .await
        .unwrap();
    assert_eq!(values(&page), vec![5, 4, 3]);
    assert!(page.has_more);
    assert!(page.items[0].get("id").is_none());
}

#[tokio::test]
async fn test_walk_covers_every_record_once() {
    let paginator = memory_paginator().await;
    let options = PageOptions::new().with_key("value").with_limit(100);

    let pages: Vec<_> = paginator
        .pages(&Filter::new(), options)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<cursor_paginate::Result<_>>()
        .unwrap();

    assert_eq!(pages.len(), 10);
    let seen: Vec<i64> = pages.iter().flat_map(values).collect();
    assert_eq!(seen, (0..1000).collect::<Vec<i64>>());
    assert!(pages[..9].iter().all(|p| p.has_more));
    assert!(!pages[9].has_more);
}

#[tokio::test]
async fn test_walk_descending_on_duckdb() {
    let dir = tempfile::tempdir().unwrap();
    let paginator = duckdb_paginator(&dir.path().join("users.duckdb"));
    let options = options(SortDirection::Descending).with_limit(100).before(250);

    let pages: Vec<_> = paginator
        .pages(&Filter::new(), options)
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(pages.len(), 3);
    let seen: Vec<i64> = pages.iter().flat_map(values).collect();
    assert_eq!(seen, (0..250).rev().collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_walk_with_select_without_key() {
    let paginator = memory_paginator().await;
    let options = PageOptions::new()
        .with_key("value")
        .with_limit(100)
        .select(cursor_paginate::Projection::parse("-value"));

    let pages: Vec<_> = paginator
        .pages(&Filter::new(), options)
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(pages.len(), 10);
    assert!(!pages[9].has_more);
    assert_eq!(pages[9].items[99]["value"], json!(999));
}

#[tokio::test]
async fn test_handler_sees_returned_page() {
    let paginator = memory_paginator().await;
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);

    let page = paginator
        .paginate_with(
            &Filter::new(),
            options(SortDirection::Ascending),
            move |result| {
                let page = result.unwrap();
                sink.lock().unwrap().push((values(page), page.has_more));
            },
        )
        .await
        .unwrap();

    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0], (values(&page), page.has_more));
}

#[tokio::test]
async fn test_query_failure_reaches_caller_and_handler() {
    let paginator = memory_paginator().await;
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);

    let result = paginator
        .paginate_with(
            &Filter::new(),
            options(SortDirection::Ascending).populate("owner"),
            move |result| {
                assert!(result.is_err());
                *counter.lock().unwrap() += 1;
            },
        )
        .await;

    assert!(result.unwrap_err().is_query_failure());
    assert_eq!(*calls.lock().unwrap(), 1);
}
