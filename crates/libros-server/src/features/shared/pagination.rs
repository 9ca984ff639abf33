//! Keyset pagination
//!
//! Pages are fixed at [`PAGE_SIZE`] documents. The caller carries the id of the
//! last document it saw (`lastDocId`); the next page starts strictly after that
//! document in the query's ordering. No server-side state is kept between pages.
//!
//! # Examples
//!
//! ```rust,ignore
//! use libros_server::features::shared::pagination::{resolve_cursor, PAGE_SIZE};
//!
//! let cursor = resolve_cursor(store.as_ref(), "libro_234", last_doc_id.as_deref()).await?;
//! let mut query = DocumentQuery::by_id("libro_234").limit(PAGE_SIZE);
//! if let Some(cursor) = cursor {
//!     query = query.start_after(cursor);
//! }
//! ```

use thiserror::Error;

use crate::store::{DocumentSnapshot, DocumentStore, StoreError};

/// Documents per page
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("Invalid lastDocId")]
    Invalid,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Look up the cursor document. An id that names no document is a client error.
pub async fn resolve_cursor(
    store: &dyn DocumentStore,
    collection: &str,
    last_doc_id: Option<&str>,
) -> Result<Option<DocumentSnapshot>, CursorError> {
    let Some(id) = last_doc_id else {
        return Ok(None);
    };

    store
        .get(collection, id)
        .await?
        .map(Some)
        .ok_or(CursorError::Invalid)
}
