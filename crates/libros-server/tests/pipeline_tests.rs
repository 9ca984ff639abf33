//! End-to-end ingestion tests
//!
//! A spreadsheet lands in the bucket, the spreadsheet trigger splits it into
//! per-book artifacts, and each artifact's own event loads it into its collection.

mod common;

use common::{workbook, TestEnv, BUCKET};
use libros_common::types::ObjectFinalizedEvent;
use libros_server::{
    config::{PipelineConfig, ARTIFACT_CONTENT_TYPE, SPREADSHEET_CONTENT_TYPE},
    ingest::{DeliveryOutcome, IngestError, IngestOutcome, RejectReason, Trigger},
    store::{DocumentStore, MemoryDocumentStore},
};
use serde_json::{json, Value};

const SOURCE_KEY: &str = "2024/rutas.xlsx";

fn s(v: &str) -> Option<Value> {
    Some(json!(v))
}

fn route_sheet() -> Vec<u8> {
    workbook(&[
        vec![
            s("Codigo Ruta Suministro"),
            s("Nombre Suministro"),
            s("Codigo Suministro"),
            s("Direccion Predio"),
        ],
        vec![s("0001234005678"), s("ANA PEREZ"), s("S-1"), s("CALLE 1")],
        vec![s("0001234009999"), s("LUIS GOMEZ"), s("S-2"), s("CALLE 2")],
        vec![Some(json!(10002340000012_i64)), s("MARIA DIAZ"), s("S-3"), None],
        vec![s("0000500000001"), s("JOSE RUIZ"), s("S-4"), s("AVENIDA 4")],
        // Too short to carry a book segment
        vec![s("123"), s("SIN LIBRO"), s("S-5"), None],
        // No code at all
        vec![None, s("SIN CODIGO"), s("S-6"), None],
    ])
}

fn spreadsheet_event(name: &str) -> ObjectFinalizedEvent {
    ObjectFinalizedEvent::new(BUCKET, name, Some(SPREADSHEET_CONTENT_TYPE))
}

#[tokio::test]
async fn test_spreadsheet_to_collections() {
    let env = TestEnv::new();
    env.blobs
        .put(BUCKET, SOURCE_KEY, route_sheet(), Some(SPREADSHEET_CONTENT_TYPE));

    let report = env
        .host
        .deliver(Trigger::Spreadsheet, spreadsheet_event(SOURCE_KEY))
        .await;
    assert!(report.is_success(), "{:?}", report.outcome);

    let DeliveryOutcome::Completed(IngestOutcome::Partitioned(partitioned)) = &report.outcome else {
        panic!("expected a partitioned outcome, got {:?}", report.outcome);
    };
    assert_eq!(partitioned.records, 4);
    assert_eq!(partitioned.dropped, 2);
    assert!(!partitioned.source_deleted);

    let keys: Vec<&str> = report.emitted_artifacts().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(keys, vec!["2024/libro_234.json", "2024/libro_500.json"]);
    for artifact in report.emitted_artifacts() {
        let blob = env.blobs.get(BUCKET, &artifact.name).unwrap();
        assert_eq!(blob.content_type.as_deref(), Some(ARTIFACT_CONTENT_TYPE));
    }

    // Follow the artifacts the way the bucket's second registration would
    for artifact in report.emitted_artifacts() {
        let load = env.host.deliver(Trigger::Artifact, artifact.clone()).await;
        assert!(load.is_success(), "{:?}", load.outcome);
    }

    assert_eq!(env.store.document_count("libro_234"), 3);
    assert_eq!(env.store.document_count("libro_500"), 1);
    assert_eq!(
        env.store.list_collections().await.unwrap(),
        vec!["libro_234".to_string(), "libro_500".to_string()]
    );

    // Records keep their column values and the numeric code stays a number
    let maria = env.store.get("libro_234", "doc_2").await.unwrap().unwrap();
    assert_eq!(maria.data["Nombre Suministro"], json!("MARIA DIAZ"));
    assert_eq!(maria.data["Codigo Ruta Suministro"], json!(10002340000012_i64));
    assert!(maria.data.get("Direccion Predio").is_none());

    // Artifacts are consumed, the source stays, scratch space is gone
    assert_eq!(env.blobs.keys(BUCKET), vec![SOURCE_KEY.to_string()]);
    assert_eq!(env.scratch_entries(), 0);
}

#[tokio::test]
async fn test_redelivered_spreadsheet_overwrites() {
    let env = TestEnv::new();
    env.blobs
        .put(BUCKET, SOURCE_KEY, route_sheet(), Some(SPREADSHEET_CONTENT_TYPE));

    for _ in 0..2 {
        let report = env
            .host
            .deliver(Trigger::Spreadsheet, spreadsheet_event(SOURCE_KEY))
            .await;
        for artifact in report.emitted_artifacts() {
            assert!(env.host.deliver(Trigger::Artifact, artifact.clone()).await.is_success());
        }
    }

    assert_eq!(env.store.document_count("libro_234"), 3);
    assert_eq!(env.store.document_count("libro_500"), 1);
}

#[tokio::test]
async fn test_deliver_all_skips_foreign_objects() {
    let env = TestEnv::new();
    env.blobs.put(BUCKET, "notas.txt", b"hola".to_vec(), Some("text/plain"));

    let reports = env
        .host
        .deliver_all(ObjectFinalizedEvent::new(BUCKET, "notas.txt", Some("text/plain")))
        .await;

    assert_eq!(reports.len(), 2);
    assert!(matches!(
        &reports[0].outcome,
        DeliveryOutcome::Completed(IngestOutcome::Skipped(RejectReason::NotSpreadsheet { .. }))
    ));
    assert!(matches!(
        &reports[1].outcome,
        DeliveryOutcome::Completed(IngestOutcome::Skipped(RejectReason::NotJson))
    ));
    assert!(env.blobs.contains(BUCKET, "notas.txt"));
}

#[tokio::test]
async fn test_processed_spreadsheet_is_ignored() {
    let env = TestEnv::new();
    let name = "2024/processed_rutas.xlsx";
    env.blobs.put(BUCKET, name, route_sheet(), Some(SPREADSHEET_CONTENT_TYPE));

    let report = env.host.deliver(Trigger::Spreadsheet, spreadsheet_event(name)).await;

    assert_eq!(
        report.outcome,
        DeliveryOutcome::Completed(IngestOutcome::Skipped(RejectReason::AlreadyProcessed))
    );
    assert_eq!(env.blobs.keys(BUCKET), vec![name.to_string()]);
}

#[tokio::test]
async fn test_pipeline_output_name_is_ignored() {
    let env = TestEnv::new();
    let name = "uploads/libro_234.xlsx";
    env.blobs.put(BUCKET, name, route_sheet(), Some(SPREADSHEET_CONTENT_TYPE));

    let report = env.host.deliver(Trigger::Spreadsheet, spreadsheet_event(name)).await;

    assert_eq!(
        report.outcome,
        DeliveryOutcome::Completed(IngestOutcome::Skipped(RejectReason::AlreadyProcessed))
    );
    assert_eq!(env.blobs.keys(BUCKET), vec![name.to_string()]);
    assert!(env.store.list_collections().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_notification_without_content_type() {
    let env = TestEnv::new();
    env.blobs
        .put(BUCKET, SOURCE_KEY, route_sheet(), Some(SPREADSHEET_CONTENT_TYPE));

    let reports = env
        .host
        .deliver_all(ObjectFinalizedEvent::new(BUCKET, SOURCE_KEY, None))
        .await;

    assert!(reports[0].is_success(), "{:?}", reports[0].outcome);
    assert_eq!(reports[0].emitted_artifacts().len(), 2);
    assert_eq!(
        reports[1].outcome,
        DeliveryOutcome::Completed(IngestOutcome::Skipped(RejectReason::NotJson))
    );
}

#[tokio::test]
async fn test_artifact_without_collection_stem_is_ignored() {
    let env = TestEnv::new();
    let name = "2024/.json";
    env.blobs
        .put(BUCKET, name, br#"[{"id": "A1"}]"#.to_vec(), Some(ARTIFACT_CONTENT_TYPE));

    let report = env
        .host
        .deliver(
            Trigger::Artifact,
            ObjectFinalizedEvent::new(BUCKET, name, Some(ARTIFACT_CONTENT_TYPE)),
        )
        .await;

    assert_eq!(
        report.outcome,
        DeliveryOutcome::Completed(IngestOutcome::Skipped(RejectReason::EmptyCollectionName))
    );
    assert!(env.blobs.contains(BUCKET, name));
    assert!(env.store.list_collections().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_source_deleted_when_enabled() {
    let env = TestEnv::with_config(
        PipelineConfig {
            delete_source: true,
            ..PipelineConfig::default()
        },
        MemoryDocumentStore::default(),
    );
    env.blobs
        .put(BUCKET, SOURCE_KEY, route_sheet(), Some(SPREADSHEET_CONTENT_TYPE));

    let outcome = env
        .pipeline
        .handle(Trigger::Spreadsheet, &spreadsheet_event(SOURCE_KEY))
        .await
        .unwrap();

    let IngestOutcome::Partitioned(report) = outcome else {
        panic!("expected a partitioned outcome");
    };
    assert!(report.source_deleted);
    assert!(!env.blobs.contains(BUCKET, SOURCE_KEY));
}

#[tokio::test]
async fn test_failed_upload_keeps_source_and_other_partitions() {
    let env = TestEnv::with_config(
        PipelineConfig {
            delete_source: true,
            ..PipelineConfig::default()
        },
        MemoryDocumentStore::default(),
    );
    env.blobs
        .put(BUCKET, SOURCE_KEY, route_sheet(), Some(SPREADSHEET_CONTENT_TYPE));
    env.blobs.fail_uploads_to("2024/libro_234.json");

    let err = env
        .pipeline
        .handle(Trigger::Spreadsheet, &spreadsheet_event(SOURCE_KEY))
        .await
        .unwrap_err();

    match &err {
        IngestError::PartialUpload { failed, uploaded } => {
            assert_eq!(failed, &vec!["234".to_string()]);
            assert_eq!(*uploaded, 1);
        },
        other => panic!("expected a partial upload, got {:?}", other),
    }
    assert!(env.blobs.contains(BUCKET, SOURCE_KEY));
    assert!(env.blobs.contains(BUCKET, "2024/libro_500.json"));
    assert!(!env.blobs.contains(BUCKET, "2024/libro_234.json"));
    assert_eq!(env.scratch_entries(), 0);
}

#[tokio::test]
async fn test_large_artifact_loads_in_chunks() {
    let env = TestEnv::with_config(PipelineConfig::default(), MemoryDocumentStore::new(4));
    let records: Vec<Value> = (0..10)
        .map(|i| json!({"id": format!("S{:02}", i), "Nombre Suministro": format!("N{}", i)}))
        .collect();
    env.blobs.put(
        BUCKET,
        "libro_777.json",
        serde_json::to_vec(&records).unwrap(),
        Some(ARTIFACT_CONTENT_TYPE),
    );

    let report = env
        .host
        .deliver(
            Trigger::Artifact,
            ObjectFinalizedEvent::new(BUCKET, "libro_777.json", Some(ARTIFACT_CONTENT_TYPE)),
        )
        .await;

    assert!(report.is_success());
    assert_eq!(env.store.commit_count(), 3);
    assert_eq!(env.store.document_count("libro_777"), 10);
    assert!(env.store.get("libro_777", "S09").await.unwrap().is_some());
    assert!(!env.blobs.contains(BUCKET, "libro_777.json"));
}
