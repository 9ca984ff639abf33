//! Request extractors
//!
//! axum's own `Query` rejects with a plain-text body; [`ApiQuery`] keeps the
//! `{"error": ...}` shape every other API error has.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
    response::Response,
};
use serde::de::DeserializeOwned;

use super::response::ErrorResponse;

/// Query-string extractor that rejects with a JSON `400 Bad Request`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                let message = rejection.body_text();
                tracing::debug!(error = %message, "Rejected query string");
                Err(ErrorResponse::bad_request(message))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::FromRequest,
        http::{Request, StatusCode},
    };
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Params {
        collection_name: Option<String>,
    }

    #[tokio::test]
    async fn test_query_parsed() {
        let req = Request::builder()
            .uri("/documents?collectionName=libro_234")
            .body(Body::empty())
            .unwrap();
        let ApiQuery(params) = ApiQuery::<Params>::from_request(req, &()).await.unwrap();

        assert_eq!(params.collection_name.as_deref(), Some("libro_234"));
    }

    #[tokio::test]
    async fn test_duplicate_parameter_is_json_400() {
        let req = Request::builder()
            .uri("/documents?collectionName=a&collectionName=b")
            .body(Body::empty())
            .unwrap();
        let rejection = ApiQuery::<Params>::from_request(req, &()).await.unwrap_err();

        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(rejection.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.error.contains("duplicate field"), "{}", body.error);
    }
}
