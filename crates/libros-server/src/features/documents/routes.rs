//! Document API routes
//!
//! # Route Structure
//!
//! - `GET /api/v1/collections` - Partition collections
//! - `GET /api/v1/documents?collectionName=&lastDocId=` - One page of a collection
//! - `GET /api/v1/documents/search?collectionName=&searchTerm=&searchBy=&lastDocId=` - Prefix search
//! - `GET /api/v1/documents/detail?collectionName=&documentId=` - One document
//!
//! Pages hold at most 10 documents. Pass the `id` of the last document of a page
//! as `lastDocId` to get the next one.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use super::queries::{
    GetDocumentError, GetDocumentQuery, ListCollectionsError, ListDocumentsError,
    ListDocumentsQuery, SearchDocumentsError, SearchDocumentsQuery,
};
use crate::api::{extract::ApiQuery, response::ErrorResponse};
use crate::features::FeatureState;

// ============================================================================
// Router Configuration
// ============================================================================

pub fn collections_routes() -> Router<FeatureState> {
    Router::new().route("/", get(list_collections))
}

pub fn documents_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_documents))
        .route("/search", get(search_documents))
        .route("/detail", get(get_document))
}

// ============================================================================
// Query Handlers
// ============================================================================

/// List partition collections
///
/// # Response
///
/// - `200 OK` - `{"collections": ["libro_234", ...]}`
/// - `500 Internal Server Error` - Store error
#[tracing::instrument(skip(state))]
async fn list_collections(State(state): State<FeatureState>) -> Result<Response, DocumentsApiError> {
    let response =
        super::queries::list_collections::handle(state.store.as_ref(), &state.artifact_prefix)
            .await?;

    tracing::debug!(count = response.collections.len(), "Collections listed via API");

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// List one page of a collection in id order
///
/// # Response
///
/// - `200 OK` - `{"documents": [{"id": ..., ...fields}]}`
/// - `400 Bad Request` - Missing `collectionName` or unknown `lastDocId`
/// - `500 Internal Server Error` - Store error
#[tracing::instrument(
    skip(state, query),
    fields(collection = ?query.collection_name, last_doc_id = ?query.last_doc_id)
)]
async fn list_documents(
    State(state): State<FeatureState>,
    ApiQuery(query): ApiQuery<ListDocumentsQuery>,
) -> Result<Response, DocumentsApiError> {
    let response = super::queries::list_documents::handle(state.store.as_ref(), query).await?;

    tracing::debug!(count = response.documents.len(), "Documents listed via API");

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Prefix-search one field of a collection
///
/// # Response
///
/// - `200 OK` - `{"documents": [{"id", "Nombre Suministro", "Codigo Suministro", "Direccion Predio"}]}`
/// - `400 Bad Request` - Missing parameter or unusable `lastDocId`
/// - `500 Internal Server Error` - Store error
#[tracing::instrument(
    skip(state, query),
    fields(
        collection = ?query.collection_name,
        search_by = ?query.search_by,
        last_doc_id = ?query.last_doc_id
    )
)]
async fn search_documents(
    State(state): State<FeatureState>,
    ApiQuery(query): ApiQuery<SearchDocumentsQuery>,
) -> Result<Response, DocumentsApiError> {
    let response = super::queries::search_documents::handle(state.store.as_ref(), query).await?;

    tracing::debug!(count = response.documents.len(), "Search completed via API");

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Fetch a single document
///
/// # Response
///
/// - `200 OK` - `{"document": {"id": ..., ...fields}}`
/// - `400 Bad Request` - Missing parameter
/// - `404 Not Found` - `{"error": "Document not found"}`
/// - `500 Internal Server Error` - Store error
#[tracing::instrument(
    skip(state, query),
    fields(collection = ?query.collection_name, document_id = ?query.document_id)
)]
async fn get_document(
    State(state): State<FeatureState>,
    ApiQuery(query): ApiQuery<GetDocumentQuery>,
) -> Result<Response, DocumentsApiError> {
    let response = super::queries::get_document::handle(state.store.as_ref(), query).await?;

    Ok((StatusCode::OK, Json(response)).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for document API endpoints
#[derive(Debug)]
enum DocumentsApiError {
    Collections(ListCollectionsError),
    List(ListDocumentsError),
    Search(SearchDocumentsError),
    Get(GetDocumentError),
}

impl From<ListCollectionsError> for DocumentsApiError {
    fn from(err: ListCollectionsError) -> Self {
        Self::Collections(err)
    }
}

impl From<ListDocumentsError> for DocumentsApiError {
    fn from(err: ListDocumentsError) -> Self {
        Self::List(err)
    }
}

impl From<SearchDocumentsError> for DocumentsApiError {
    fn from(err: SearchDocumentsError) -> Self {
        Self::Search(err)
    }
}

impl From<GetDocumentError> for DocumentsApiError {
    fn from(err: GetDocumentError) -> Self {
        Self::Get(err)
    }
}

impl IntoResponse for DocumentsApiError {
    fn into_response(self) -> Response {
        match self {
            DocumentsApiError::List(
                e @ (ListDocumentsError::CollectionNameRequired | ListDocumentsError::InvalidCursor),
            ) => ErrorResponse::bad_request(e.to_string()),
            DocumentsApiError::Search(
                e @ (SearchDocumentsError::CollectionNameRequired
                | SearchDocumentsError::SearchTermRequired
                | SearchDocumentsError::SearchByRequired
                | SearchDocumentsError::InvalidCursor),
            ) => ErrorResponse::bad_request(e.to_string()),
            DocumentsApiError::Get(
                e @ (GetDocumentError::CollectionNameRequired | GetDocumentError::DocumentIdRequired),
            ) => ErrorResponse::bad_request(e.to_string()),
            DocumentsApiError::Get(e @ GetDocumentError::NotFound) => {
                ErrorResponse::not_found(e.to_string())
            },

            DocumentsApiError::Collections(ListCollectionsError::Store(e))
            | DocumentsApiError::List(ListDocumentsError::Store(e))
            | DocumentsApiError::Search(SearchDocumentsError::Store(e))
            | DocumentsApiError::Get(GetDocumentError::Store(e)) => {
                tracing::error!(error = %e, "Store error while serving document API");
                ErrorResponse::internal_server_error()
            },
        }
    }
}
