//! JSON extractor that reports rejections in the API error format

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json as AxumJson,
};
use serde::de::DeserializeOwned;

use super::error::{ApiError, ApiErrorType};

/// JSON body extractor.
///
/// An empty body is read as `{}`, so request types whose fields are all
/// optional can be posted without a body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            ApiError::bad_request(format!("Failed to read request body: {}", e.body_text()))
                .with_code("body_read_error")
        })?;

        parse_body(&bytes).map(Json)
    }
}

fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        bytes
    };

    serde_json::from_slice(body).map_err(|e| {
        let status = if e.is_data() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::BAD_REQUEST
        };

        ApiError::new(status, ApiErrorType::InvalidRequestError, format!("Invalid JSON: {}", e))
            .with_code("json_parse_error")
    })
}

impl<T> IntoResponse for Json<T>
where
    T: serde::Serialize,
{
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Body {
        pattern: Option<String>,
    }

    #[test]
    fn test_empty_body_is_empty_object() {
        let body: Body = parse_body(b"").unwrap();
        assert_eq!(body, Body::default());

        let body: Body = parse_body(b" \n").unwrap();
        assert_eq!(body, Body::default());
    }

    #[test]
    fn test_parses_fields() {
        let body: Body = parse_body(br#"{"pattern": "repo:*"}"#).unwrap();
        assert_eq!(body.pattern.as_deref(), Some("repo:*"));
    }

    #[test]
    fn test_syntax_error_is_bad_request() {
        let err = parse_body::<Body>(b"{not json").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.response.error.code.as_deref(), Some("json_parse_error"));
    }

    #[test]
    fn test_type_error_is_unprocessable() {
        let err = parse_body::<Body>(br#"{"pattern": 5}"#).unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
