use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::features::shared::validation::require;
use crate::store::{DocumentStore, StoreError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDocumentQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDocumentResponse {
    pub document: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum GetDocumentError {
    #[error("collectionName is required")]
    CollectionNameRequired,
    #[error("documentId is required")]
    DocumentIdRequired,
    #[error("Document not found")]
    NotFound,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl GetDocumentQuery {
    pub fn validate(&self) -> Result<(&str, &str), GetDocumentError> {
        Ok((
            require(&self.collection_name, GetDocumentError::CollectionNameRequired)?,
            require(&self.document_id, GetDocumentError::DocumentIdRequired)?,
        ))
    }
}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: &dyn DocumentStore,
    query: GetDocumentQuery,
) -> Result<GetDocumentResponse, GetDocumentError> {
    let (collection, id) = query.validate()?;

    let doc = store
        .get(collection, id)
        .await?
        .ok_or(GetDocumentError::NotFound)?;

    Ok(GetDocumentResponse {
        document: doc.to_json(),
    })
}
