//! Prefix search over one field
//!
//! The term is uppercased and turned into the inclusive range
//! `[TERM, TERM + U+10FFFF]`, which holds exactly the strings starting with
//! `TERM`. Field values are compared as stored, so the search matches values
//! that were written in upper case.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::features::shared::{
    pagination::{resolve_cursor, CursorError, PAGE_SIZE},
    validation::{optional, require},
};
use crate::store::{DocumentQuery, DocumentSnapshot, DocumentStore, StoreError};

/// Fields returned for each search hit, after `id`
pub const SEARCH_PROJECTION: [&str; 3] =
    ["Nombre Suministro", "Codigo Suministro", "Direccion Predio"];

/// Highest Unicode scalar value; sorts after every other character.
const PREFIX_SENTINEL: char = char::MAX;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocumentsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_doc_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDocumentsResponse {
    pub documents: Vec<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchDocumentsError {
    #[error("collectionName is required")]
    CollectionNameRequired,
    #[error("searchTerm is required")]
    SearchTermRequired,
    #[error("searchBy is required")]
    SearchByRequired,
    #[error("Invalid lastDocId")]
    InvalidCursor,
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for SearchDocumentsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidCursor(_) => Self::InvalidCursor,
            other => Self::Store(other),
        }
    }
}

impl From<CursorError> for SearchDocumentsError {
    fn from(err: CursorError) -> Self {
        match err {
            CursorError::Invalid => Self::InvalidCursor,
            CursorError::Store(e) => e.into(),
        }
    }
}

struct ValidSearch<'a> {
    collection: &'a str,
    term: &'a str,
    field: &'a str,
}

impl SearchDocumentsQuery {
    fn validated(&self) -> Result<ValidSearch<'_>, SearchDocumentsError> {
        Ok(ValidSearch {
            collection: require(&self.collection_name, SearchDocumentsError::CollectionNameRequired)?,
            term: require(&self.search_term, SearchDocumentsError::SearchTermRequired)?,
            field: require(&self.search_by, SearchDocumentsError::SearchByRequired)?,
        })
    }

    pub fn validate(&self) -> Result<(), SearchDocumentsError> {
        self.validated().map(|_| ())
    }
}

/// Inclusive bounds matching every string that starts with the uppercased term.
pub fn prefix_range(term: &str) -> (String, String) {
    let lower = term.to_uppercase();
    let mut upper = lower.clone();
    upper.push(PREFIX_SENTINEL);
    (lower, upper)
}

fn project(doc: &DocumentSnapshot) -> Value {
    let mut object = Map::with_capacity(SEARCH_PROJECTION.len() + 1);
    object.insert("id".to_string(), Value::String(doc.id.clone()));
    for field in SEARCH_PROJECTION {
        if let Some(value) = doc.data.get(field) {
            object.insert(field.to_string(), value.clone());
        }
    }
    Value::Object(object)
}

/// One page of documents whose `searchBy` field starts with the term,
/// ordered by that field.
#[tracing::instrument(skip(store))]
pub async fn handle(
    store: &dyn DocumentStore,
    query: SearchDocumentsQuery,
) -> Result<SearchDocumentsResponse, SearchDocumentsError> {
    let search = query.validated()?;
    let last_doc_id = optional(&query.last_doc_id);

    let (lower, upper) = prefix_range(search.term);
    let mut page =
        DocumentQuery::field_range(search.collection, search.field, lower, upper).limit(PAGE_SIZE);
    if let Some(cursor) = resolve_cursor(store, search.collection, last_doc_id).await? {
        page = page.start_after(cursor);
    }

    let documents = store.query(&page).await?.iter().map(project).collect();

    Ok(SearchDocumentsResponse { documents })
}
