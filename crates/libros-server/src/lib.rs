//! Libros Server Library
//!
//! Turns route spreadsheets dropped into object storage into searchable document
//! collections, one per book ("Libro").
//!
//! # Overview
//!
//! - **Ingestion**: a spreadsheet upload is split by the book segment of each row's
//!   route code into JSON artifacts, which are then loaded into the document store
//!   in atomic chunks
//! - **Event host**: timeout and redelivery policy around each pipeline invocation
//! - **Read API**: list partitions, page through a collection, prefix-search a
//!   field, fetch one document
//! - **Storage**: S3-compatible blob store and a PostgreSQL document store, each
//!   with an in-memory counterpart for tests
//! - **Configuration**: environment-based configuration management
//!
//! # Flow
//!
//! ```text
//! object finalized ──► spreadsheet trigger ──► libro_<n>.json artifacts
//!                                                   │
//!                      artifact trigger ◄───────────┘
//!                             │
//!                             ▼
//!                      document store ◄── GET /api/v1/documents...
//! ```
//!
//! ## Framework Stack
//!
//! - **Axum**: web framework
//! - **SQLx**: PostgreSQL access and migrations
//! - **Tower**: middleware and service abstractions
//! - **AWS SDK**: S3-compatible object storage
//! - **calamine**: spreadsheet reading

pub mod api;
pub mod config;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use ingest::{EventHost, IngestError, IngestionPipeline};
pub use store::{DocumentStore, StoreError};
