//! Cursor pagination through the HTTP API
//!
//! Walks whole collections page by page, carrying the last id of each page as
//! `lastDocId`, and checks that every document is seen exactly once, in order.

mod common;

use axum::http::StatusCode;
use common::{get, numbered_docs, page_ids, record, TestEnv};
use serde_json::json;

async fn walk(env: &TestEnv, base: &str) -> Vec<Vec<String>> {
    let app = env.app();
    let mut pages = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let uri = match &cursor {
            Some(last) => format!("{}&lastDocId={}", base, last),
            None => base.to_string(),
        };
        let (status, body) = get(&app, &uri).await;
        assert_eq!(status, StatusCode::OK, "{}", body);

        let ids = page_ids(&body);
        assert!(ids.len() <= 10);
        if ids.is_empty() {
            break;
        }
        cursor = ids.last().cloned();
        pages.push(ids);

        assert!(pages.len() <= 10, "pagination did not terminate");
    }

    pages
}

#[tokio::test]
async fn test_list_walks_every_collection_size() {
    for n in [0usize, 1, 9, 10, 11, 25] {
        let env = TestEnv::new();
        env.store.seed("libro_234", numbered_docs(n));

        let pages = walk(&env, "/api/v1/documents?collectionName=libro_234").await;

        let sizes: Vec<usize> = pages.iter().map(Vec::len).collect();
        let expected: Vec<usize> = (0..n.div_ceil(10)).map(|p| (n - p * 10).min(10)).collect();
        assert_eq!(sizes, expected, "page sizes for n={}", n);

        let seen: Vec<String> = pages.into_iter().flatten().collect();
        let all: Vec<String> = (0..n).map(|i| format!("d{:02}", i)).collect();
        assert_eq!(seen, all, "documents for n={}", n);
    }
}

#[tokio::test]
async fn test_search_walks_matches_in_field_order() {
    let env = TestEnv::new();
    // Ids run opposite to the field values
    env.store.seed(
        "libro_234",
        (0..23).map(|i| {
            (
                format!("d{:02}", i),
                record(json!({"Nombre Suministro": format!("AB{:02}", 22 - i)})),
            )
        }),
    );
    env.store.seed(
        "libro_234",
        [("zz".to_string(), record(json!({"Nombre Suministro": "BA00"})))],
    );

    let pages = walk(
        &env,
        "/api/v1/documents/search?collectionName=libro_234&searchTerm=ab&searchBy=Nombre%20Suministro",
    )
    .await;

    let sizes: Vec<usize> = pages.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![10, 10, 3]);

    let seen: Vec<String> = pages.into_iter().flatten().collect();
    let expected: Vec<String> = (0..23).rev().map(|i| format!("d{:02}", i)).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_unknown_cursor_is_a_client_error() {
    let env = TestEnv::new();
    env.store.seed("libro_234", numbered_docs(3));
    let app = env.app();

    let (status, body) =
        get(&app, "/api/v1/documents?collectionName=libro_234&lastDocId=missing").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid lastDocId"}));
}

#[tokio::test]
async fn test_empty_cursor_means_first_page() {
    let env = TestEnv::new();
    env.store.seed("libro_234", numbered_docs(12));
    let app = env.app();

    let (status, body) = get(&app, "/api/v1/documents?collectionName=libro_234&lastDocId=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page_ids(&body).first().map(String::as_str), Some("d00"));
}
