//! Event intake routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/events/object-finalized` - Plain event or S3/MinIO bucket notification
//!
//! The response is sent before processing starts; outcomes are only logged. The
//! host tracks the deliveries and drains them when the server shuts down.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::response::ErrorResponse;
use crate::features::FeatureState;
use crate::ingest::{parse_notification, EventParseError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub accepted: usize,
}

pub fn events_routes() -> Router<FeatureState> {
    Router::new().route("/object-finalized", post(object_finalized))
}

/// Accept a storage notification
///
/// # Response
///
/// - `202 Accepted` - `{"accepted": <events>}`
/// - `400 Bad Request` - Payload is not a recognizable event
#[tracing::instrument(skip(state, body), fields(bytes = body.len()))]
async fn object_finalized(
    State(state): State<FeatureState>,
    body: Bytes,
) -> Result<Response, EventsApiError> {
    let events = parse_notification(&body)?;
    let accepted = events.len();

    for event in &events {
        tracing::info!(
            bucket = %event.bucket,
            name = %event.name,
            content_type = ?event.content_type,
            "Object finalized event accepted"
        );
    }

    // Deliveries outlive the request
    drop(state.host.spawn(events));

    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { accepted })).into_response())
}

#[derive(Debug)]
struct EventsApiError(EventParseError);

impl From<EventParseError> for EventsApiError {
    fn from(err: EventParseError) -> Self {
        Self(err)
    }
}

impl IntoResponse for EventsApiError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self.0, "Rejected event payload");
        ErrorResponse::bad_request(self.0.to_string())
    }
}
