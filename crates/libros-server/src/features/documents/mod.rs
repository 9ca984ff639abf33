//! Read API over the loaded partition collections
//!
//! - list the partition collections
//! - page through one collection in id order
//! - prefix-search one field of a collection
//! - fetch a single document

pub mod queries;
pub mod routes;

pub use queries::*;
pub use routes::{collections_routes, documents_routes};
