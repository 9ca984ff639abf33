use serde::{Deserialize, Serialize};

use crate::store::{DocumentStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCollectionsResponse {
    pub collections: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListCollectionsError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Names of the partition collections: those carrying the artifact prefix.
#[tracing::instrument(skip(store))]
pub async fn handle(
    store: &dyn DocumentStore,
    artifact_prefix: &str,
) -> Result<ListCollectionsResponse, ListCollectionsError> {
    let collections = store
        .list_collections()
        .await?
        .into_iter()
        .filter(|name| name.starts_with(artifact_prefix))
        .collect();

    Ok(ListCollectionsResponse { collections })
}
