//! Storage notification intake
//!
//! Accepts either a plain [`ObjectFinalizedEvent`] or an S3-style bucket
//! notification (as sent by AWS S3 and MinIO webhooks), whose object keys are
//! form-URL-encoded.

use libros_common::types::ObjectFinalizedEvent;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventParseError {
    #[error("Malformed event payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Object key '{0}' is not valid URL-encoded UTF-8")]
    Key(String),

    #[error("Notification contains no records")]
    Empty,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Notification(BucketNotification),
    Event(ObjectFinalizedEvent),
}

#[derive(Debug, Deserialize)]
struct BucketNotification {
    #[serde(rename = "Records")]
    records: Vec<NotificationRecord>,
}

#[derive(Debug, Deserialize)]
struct NotificationRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S3Object {
    key: String,
    #[serde(default)]
    content_type: Option<String>,
}

/// Parse an intake payload into the events it describes.
pub fn parse_notification(body: &[u8]) -> Result<Vec<ObjectFinalizedEvent>, EventParseError> {
    match serde_json::from_slice::<Payload>(body)? {
        Payload::Event(event) => Ok(vec![event]),
        Payload::Notification(notification) => {
            if notification.records.is_empty() {
                return Err(EventParseError::Empty);
            }

            notification
                .records
                .into_iter()
                .map(|record| {
                    let S3Entity { bucket, object } = record.s3;
                    Ok(ObjectFinalizedEvent {
                        bucket: bucket.name,
                        name: decode_key(&object.key)?,
                        content_type: object.content_type,
                    })
                })
                .collect()
        },
    }
}

fn decode_key(key: &str) -> Result<String, EventParseError> {
    let spaced = key.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| EventParseError::Key(key.to_string()))
}
