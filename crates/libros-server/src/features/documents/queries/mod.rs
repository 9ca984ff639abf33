pub mod get_document;
pub mod list_collections;
pub mod list_documents;
pub mod search_documents;

pub use get_document::{GetDocumentError, GetDocumentQuery, GetDocumentResponse};
pub use list_collections::{ListCollectionsError, ListCollectionsResponse};
pub use list_documents::{ListDocumentsError, ListDocumentsQuery, ListDocumentsResponse};
pub use search_documents::{
    SearchDocumentsError, SearchDocumentsQuery, SearchDocumentsResponse, SEARCH_PROJECTION,
};
