//! Response classification
//!
//! Maps a completed exchange onto the handful of outcomes the pipeline reacts
//! to. 402 and 401 are checked before the success range so that neither can
//! ever be mistaken for data.

use reqwest::StatusCode;
use serde::Serialize;

/// Default reason when a 402 body carries no `detail`.
pub const DEFAULT_PAYWALL_REASON: &str = "payment_required";

/// Why no response reached the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout,
    Connect,
    Other,
}

impl TransportFailure {
    pub fn label(&self) -> &'static str {
        match self {
            TransportFailure::Timeout => "timeout",
            TransportFailure::Connect => "connection",
            TransportFailure::Other => "other",
        }
    }
}

/// Outcome of one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Ok,
    PaymentRequired(PaywallMeta),
    Unauthorized,
    NetworkError(TransportFailure),
    OtherError(StatusCode),
}

impl Classification {
    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Ok => "ok",
            Classification::PaymentRequired(_) => "payment_required",
            Classification::Unauthorized => "unauthorized",
            Classification::NetworkError(_) => "network_error",
            Classification::OtherError(_) => "other_error",
        }
    }
}

/// Checkout metadata carried by a 402 body. Every field is optional on the
/// wire; a missing `detail` becomes `payment_required`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaywallMeta {
    pub checkout_url: Option<String>,
    pub office_id: Option<String>,
    pub office_name: Option<String>,
    pub reason: String,
}

impl Default for PaywallMeta {
    fn default() -> Self {
        Self {
            checkout_url: None,
            office_id: None,
            office_name: None,
            reason: DEFAULT_PAYWALL_REASON.to_string(),
        }
    }
}

impl PaywallMeta {
    /// Parse a 402 body leniently. Non-JSON bodies, wrong types and empty
    /// strings all degrade to "absent".
    pub fn from_body(body: &[u8]) -> Self {
        let value: serde_json::Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(_) => return Self::default(),
        };

        Self {
            checkout_url: text_field(&value, "checkout_url"),
            office_id: text_field(&value, "office_id"),
            office_name: text_field(&value, "office_name"),
            reason: text_field(&value, "detail")
                .unwrap_or_else(|| DEFAULT_PAYWALL_REASON.to_string()),
        }
    }
}

/// String or number field as text; anything else is absent.
fn text_field(value: &serde_json::Value, key: &str) -> Option<String> {
    match value.get(key)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Classify a response that did arrive.
pub fn classify_status(status: StatusCode, body: &[u8]) -> Classification {
    match status.as_u16() {
        402 => Classification::PaymentRequired(PaywallMeta::from_body(body)),
        401 => Classification::Unauthorized,
        code if code < 400 => Classification::Ok,
        _ => Classification::OtherError(status),
    }
}

/// Classify a request that produced no response at all.
pub fn classify_transport(err: &reqwest::Error) -> Classification {
    let failure = if err.is_timeout() {
        TransportFailure::Timeout
    } else if err.is_connect() {
        TransportFailure::Connect
    } else {
        TransportFailure::Other
    };
    Classification::NetworkError(failure)
}
