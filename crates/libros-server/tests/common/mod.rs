//! Shared fixtures for the integration tests
//!
//! Everything runs against the in-memory blob and document stores; each fixture
//! owns its own scratch directory.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use libros_common::types::Record;
use libros_server::{
    api::create_router,
    config::{CorsConfig, HostConfig, PipelineConfig},
    features::FeatureState,
    ingest::{BatchLoader, EventHost, HostPolicy, IngestionPipeline, RetryPolicy},
    storage::MemoryBlobStore,
    store::MemoryDocumentStore,
};
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BUCKET: &str = "rutas";

pub struct TestEnv {
    pub blobs: Arc<MemoryBlobStore>,
    pub store: Arc<MemoryDocumentStore>,
    pub pipeline: Arc<IngestionPipeline>,
    pub host: EventHost,
    scratch: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default(), MemoryDocumentStore::default())
    }

    pub fn with_config(config: PipelineConfig, store: MemoryDocumentStore) -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = Arc::new(store);

        let config = PipelineConfig {
            scratch_dir: scratch.path().to_path_buf(),
            ..config
        };
        let loader =
            BatchLoader::new(store.clone()).with_retry(RetryPolicy::new(1, Duration::ZERO), 3);
        let pipeline = Arc::new(IngestionPipeline::with_loader(blobs.clone(), loader, config));

        let host_config = HostConfig::default();
        let host = EventHost::with_policies(
            pipeline.clone(),
            HostPolicy::spreadsheet(&host_config),
            HostPolicy {
                timeout: Duration::from_secs(10),
                retry: Some(RetryPolicy::new(1, Duration::from_millis(1))),
                max_attempts: 3,
            },
        );

        Self {
            blobs,
            store,
            pipeline,
            host,
            scratch,
        }
    }

    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }

    pub fn app(&self) -> Router {
        let state = FeatureState {
            store: self.store.clone(),
            host: self.host.clone(),
            artifact_prefix: self.pipeline.config().artifact_prefix.clone(),
        };
        let cors = CorsConfig {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
        };
        create_router(state, &cors)
    }
}

/// Build an `.xlsx` workbook in memory. `None` leaves the cell empty.
pub fn workbook(rows: &[Vec<Option<Value>>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (r, c) = (r as u32, c as u16);
            match cell {
                Some(Value::String(s)) => {
                    sheet.write_string(r, c, s).unwrap();
                },
                Some(Value::Number(n)) => {
                    sheet.write_number(r, c, n.as_f64().unwrap()).unwrap();
                },
                Some(Value::Bool(b)) => {
                    sheet.write_boolean(r, c, *b).unwrap();
                },
                _ => {},
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

pub fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

/// `count` documents with zero-padded ids `d00`, `d01`, ...
pub fn numbered_docs(count: usize) -> Vec<(String, Record)> {
    (0..count)
        .map(|i| {
            (
                format!("d{:02}", i),
                record(serde_json::json!({"Nombre Suministro": format!("CLIENTE {:02}", i)})),
            )
        })
        .collect()
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

pub async fn post(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .method("POST")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Ids of a `{"documents": [...]}` page
pub fn page_ids(body: &Value) -> Vec<String> {
    body["documents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["id"].as_str().unwrap().to_string())
        .collect()
}
