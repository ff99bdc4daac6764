//! Request and response values threaded through the pipeline

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Per-call extras: caller headers and query parameters.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// The caller's request exactly as submitted. Never decorated in place:
/// every attempt decorates a copy of these headers.
#[derive(Debug, Clone)]
pub struct OriginalRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl OriginalRequest {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        body: Option<serde_json::Value>,
        options: RequestOptions,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            headers: options.headers,
            query: options.query,
            body,
        }
    }
}

/// One logical call.
///
/// `retried` starts false and can only be set by consuming the context with
/// [`RequestContext::into_retry`]; nothing can clear it again.
#[derive(Debug)]
pub struct RequestContext {
    request: OriginalRequest,
    request_id: Uuid,
    retried: bool,
}

impl RequestContext {
    pub fn new(request: OriginalRequest) -> Self {
        Self {
            request,
            request_id: Uuid::new_v4(),
            retried: false,
        }
    }

    pub fn request(&self) -> &OriginalRequest {
        &self.request
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn retried(&self) -> bool {
        self.retried
    }

    /// The same call, marked as resubmitted after a refresh.
    pub fn into_retry(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }
}

/// A successful (< 400) response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Decode(e.to_string()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patients_request() -> OriginalRequest {
        OriginalRequest::new(
            Method::GET,
            "/patients/",
            None,
            RequestOptions::new().query("search", "dupont"),
        )
    }

    #[test]
    fn retry_flag_is_one_way() {
        let ctx = RequestContext::new(patients_request());
        assert!(!ctx.retried());
        let id = ctx.request_id();

        let retry = ctx.into_retry();
        assert!(retry.retried());
        assert_eq!(retry.request_id(), id, "retry must stay the same logical call");
        assert!(retry.into_retry().retried());
    }

    #[test]
    fn options_flow_into_original_request() {
        let request = OriginalRequest::new(
            Method::POST,
            "/appointments/",
            Some(serde_json::json!({"patient": 12})),
            RequestOptions::new()
                .header(
                    HeaderName::from_static("x-request-source"),
                    HeaderValue::from_static("agenda"),
                )
                .query("week", "3"),
        );
        assert_eq!(request.headers["x-request-source"], "agenda");
        assert_eq!(request.query, vec![("week".to_string(), "3".to_string())]);
        assert_eq!(request.body.unwrap()["patient"], 12);
    }

    #[test]
    fn response_decodes_json_and_text() {
        let response = Response {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(br#"{"count":2}"#),
        };
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["count"], 2);
        assert_eq!(response.text(), r#"{"count":2}"#);
    }

    #[test]
    fn response_decode_error_is_reported() {
        let response = Response {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"not json"),
        };
        let err = response.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
