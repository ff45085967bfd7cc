//! Request context extraction.
//!
//! # Responsibilities
//! - Expose the HTTP request headers to handlers
//! - Carry the request ID assigned by the request-id layer
//!
//! # Design Decisions
//! - Header names are lowercase; repeated headers are joined with ", "
//! - Non UTF-8 header values are skipped

use axum::http::HeaderMap;
use serde_json::{Map, Value};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Context key holding the HTTP request headers.
pub const HTTP_HEADERS: &str = "httpHeaders";

/// Context key holding the HTTP request ID.
pub const HTTP_REQUEST_ID: &str = "httpRequestId";

/// Base dispatch context for one HTTP request.
pub fn request_context(headers: &HeaderMap) -> Map<String, Value> {
    let mut http_headers = Map::new();
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if !values.is_empty() {
            http_headers.insert(name.as_str().to_string(), Value::String(values.join(", ")));
        }
    }

    let mut context = Map::new();
    if let Some(id) = headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok()) {
        context.insert(HTTP_REQUEST_ID.to_string(), Value::String(id.to_string()));
    }
    context.insert(HTTP_HEADERS.to_string(), Value::Object(http_headers));
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_headers_and_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc-123"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.append("accept", HeaderValue::from_static("text/plain"));
        headers.insert("x-binary", HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());

        let context = request_context(&headers);
        assert_eq!(context[HTTP_REQUEST_ID], json!("abc-123"));
        assert_eq!(
            context[HTTP_HEADERS],
            json!({"x-request-id": "abc-123", "accept": "application/json, text/plain"})
        );
    }

    #[test]
    fn test_missing_request_id() {
        let context = request_context(&HeaderMap::new());
        assert!(!context.contains_key(HTTP_REQUEST_ID));
        assert_eq!(context[HTTP_HEADERS], json!({}));
    }
}
