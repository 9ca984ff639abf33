//! Storage event intake
//!
//! Object storage posts "object finalized" notifications here; each one is
//! handed to the event host and processed in the background.

pub mod routes;

pub use routes::events_routes;
