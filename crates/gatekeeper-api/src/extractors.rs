//! Request extractors

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

/// JSON body extractor with uniform error handling
///
/// Any failure to read the body as `T` (bad syntax, missing fields, wrong
/// content type) is turned into a 400 [`AppError::BadRequest`]. The parser
/// detail is logged at debug level only.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "rejected request body");
                Err(AppError::BadRequest(describe_rejection(&rejection).to_string()))
            }
        }
    }
}

fn describe_rejection(rejection: &JsonRejection) -> &'static str {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => "expected a JSON request body",
        _ => "invalid request body",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, StatusCode},
        response::IntoResponse,
    };
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        name: String,
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body() {
        let request = json_request(r#"{"name":"alice"}"#);
        let JsonBody(payload) = JsonBody::<Payload>::from_request(request, &())
            .await
            .unwrap();
        assert_eq!(payload.name, "alice");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let err = JsonBody::<Payload>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let err = JsonBody::<Payload>::from_request(json_request("{}"), &())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"name":"alice"}"#))
            .unwrap();

        let err = JsonBody::<Payload>::from_request(request, &())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::BadRequest(ref msg) if msg == "expected a JSON request body"
        ));
    }
}
