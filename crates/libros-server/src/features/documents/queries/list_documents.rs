use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::features::shared::{
    pagination::{resolve_cursor, CursorError, PAGE_SIZE},
    validation::{optional, require},
};
use crate::store::{DocumentQuery, DocumentStore, StoreError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_doc_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDocumentsResponse {
    pub documents: Vec<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListDocumentsError {
    #[error("collectionName is required")]
    CollectionNameRequired,
    #[error("Invalid lastDocId")]
    InvalidCursor,
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ListDocumentsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidCursor(_) => Self::InvalidCursor,
            other => Self::Store(other),
        }
    }
}

impl From<CursorError> for ListDocumentsError {
    fn from(err: CursorError) -> Self {
        match err {
            CursorError::Invalid => Self::InvalidCursor,
            CursorError::Store(e) => e.into(),
        }
    }
}

impl ListDocumentsQuery {
    pub fn validate(&self) -> Result<&str, ListDocumentsError> {
        require(&self.collection_name, ListDocumentsError::CollectionNameRequired)
    }
}

/// One page of a collection in id order.
#[tracing::instrument(skip(store))]
pub async fn handle(
    store: &dyn DocumentStore,
    query: ListDocumentsQuery,
) -> Result<ListDocumentsResponse, ListDocumentsError> {
    let collection = query.validate()?;
    let last_doc_id = optional(&query.last_doc_id);

    let mut page = DocumentQuery::by_id(collection).limit(PAGE_SIZE);
    if let Some(cursor) = resolve_cursor(store, collection, last_doc_id).await? {
        page = page.start_after(cursor);
    }

    let documents = store
        .query(&page)
        .await?
        .iter()
        .map(|doc| doc.to_json())
        .collect();

    Ok(ListDocumentsResponse { documents })
}
