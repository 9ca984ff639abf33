//! Shared utilities and types for feature modules
//!
//! # Contents
//!
//! - **pagination**: Keyset (cursor) pagination helpers
//! - **validation**: Query parameter validation utilities

pub mod pagination;
pub mod validation;

// Re-export commonly used types
pub use pagination::{resolve_cursor, CursorError, PAGE_SIZE};
pub use validation::{optional, require};
