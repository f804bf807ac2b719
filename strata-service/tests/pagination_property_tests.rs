//! Property-Based Tests for Keyset Pagination
//!
//! **Property: Cursor Walk Completeness**
//!
//! For any set of conversion rows with distinct ordering values and any
//! page size, walking pages through `next_cursor` SHALL:
//! - visit every row exactly once (no skips, no repeats)
//! - return rows in strictly descending `created_at` order across pages
//! - report `has_more == false` only on the final page

use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

use strata_core::FilterExpr;
use strata_query::{CursorOptions, MemoryStoreAdapter, PerformanceMonitor, QueryExecutor, StoreAdapter};
use strata_test_utils::{sample_user_id, strategies};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("test runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_cursor_walk_is_exhaustive_and_monotonic(
        rows in strategies::conversion_rows(sample_user_id()),
        page_size in 1usize..7,
    ) {
        runtime().block_on(async {
            let adapter = Arc::new(MemoryStoreAdapter::new());
            adapter.insert("conversions", &rows).await.unwrap();
            let executor = QueryExecutor::new(
                adapter,
                Arc::new(PerformanceMonitor::with_defaults()),
                "conversions",
            );

            let user_filter =
                FilterExpr::eq("user_id", json!(sample_user_id().to_string()));

            let mut seen_ids: Vec<String> = Vec::new();
            let mut timestamps: Vec<String> = Vec::new();
            let mut cursor: Option<serde_json::Value> = None;

            loop {
                let mut options = CursorOptions::desc("created_at", page_size)
                    .with_filter(user_filter.clone());
                if let Some(c) = cursor.take() {
                    options = options.with_cursor(c);
                }

                let page = executor.find_with_cursor(options).await.unwrap();
                for item in &page.items {
                    seen_ids.push(item["id"].as_str().unwrap().to_string());
                    timestamps.push(item["created_at"].as_str().unwrap().to_string());
                }

                if page.has_more {
                    assert!(page.next_cursor.is_some());
                    cursor = page.next_cursor;
                } else {
                    assert!(page.next_cursor.is_none());
                    break;
                }
            }

            // Every seeded row exactly once.
            let mut expected: Vec<String> = rows
                .iter()
                .map(|r| r["id"].as_str().unwrap().to_string())
                .collect();
            let mut walked = seen_ids.clone();
            expected.sort();
            walked.sort();
            assert_eq!(walked, expected);

            // Strictly descending across page boundaries (RFC 3339 strings
            // of equal shape compare chronologically).
            for pair in timestamps.windows(2) {
                assert!(pair[0] > pair[1]);
            }
        });
    }
}
