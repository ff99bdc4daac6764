//! Errors surfaced by the request pipeline
//!
//! Only an expired access token is recovered inside the client. Everything
//! else reaches the caller as one of these variants.

use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;

use crate::classify::PaywallMeta;

#[derive(Error, Debug)]
pub enum Error {
    /// No response reached the client (connect failure, timeout, broken body).
    #[error("network error: {0}")]
    Network(String),

    /// Terminal 401: refresh was impossible, refused, or already spent.
    #[error("unauthorized: session expired or invalid")]
    Unauthorized,

    /// 402 from the API; the paywall redirect has already been requested.
    #[error("payment required: {}", .0.reason)]
    PaymentRequired(PaywallMeta),

    /// Any other non-success status, passed through untouched.
    #[error("request failed with status {status}")]
    Status { status: StatusCode, body: Bytes },

    #[error("response decode error: {0}")]
    Decode(String),

    #[error("credential store error: {0}")]
    Credentials(#[from] carehub_auth::Error),

    #[error(transparent)]
    Config(#[from] common::Error),
}

impl Error {
    /// HTTP status behind this error, when one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            Error::PaymentRequired(_) => Some(StatusCode::PAYMENT_REQUIRED),
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
