//! Feature modules implementing the Libros API
//!
//! Each feature is a vertical slice with its own queries and routes.
//!
//! # Features
//!
//! - **documents**: read API over the partition collections (list, page, search, detail)
//! - **events**: intake of object storage notifications that drive ingestion
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `queries/` - Read operations, each with its own query, response and error types
//! - `routes.rs` - HTTP route definitions and error-to-response mapping

pub mod documents;
pub mod events;
pub mod shared;

use axum::Router;
use std::sync::Arc;

use crate::ingest::EventHost;
use crate::store::DocumentStore;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Document store the read API serves from
    pub store: Arc<dyn DocumentStore>,
    /// Runs ingestion for accepted storage events
    pub host: EventHost,
    /// Prefix identifying partition collections
    pub artifact_prefix: String,
}

/// Creates the API router with all feature routes mounted
///
/// - `/collections` - Partition collections
/// - `/documents` - Paging, search and detail
/// - `/events` - Storage event intake
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/collections", documents::collections_routes())
        .nest("/documents", documents::documents_routes())
        .nest("/events", events::events_routes())
        .with_state(state)
}
