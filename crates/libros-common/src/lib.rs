//! Libros Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging bootstrap, and error handling for the Libros workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`LibrosError`] and the [`Result`] alias
//! - **Logging**: [`logging::init_logging`] configured from the environment
//! - **Types**: the flat [`types::Record`] produced from spreadsheet rows and the
//!   storage event shape consumed by the ingestion pipeline
//!
//! # Example
//!
//! ```no_run
//! use libros_common::types::records_from_json;
//!
//! fn count(bytes: &[u8]) -> libros_common::Result<usize> {
//!     Ok(records_from_json(bytes)?.len())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

pub use error::{LibrosError, Result};
