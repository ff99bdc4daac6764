//! Authenticated request pipeline for the CareHub API
//!
//! Every API call goes through [`Client::request`], which attaches the
//! bearer token and office header, classifies the response, and recovers
//! from an expired access token by refreshing it once for all concurrent
//! callers. A 402 sends the user to the paywall; a session that cannot be
//! recovered sends them to the login screen.
//!
//! Request lifecycle:
//! 1. Caller submits method, path, body and options → one `RequestContext`
//! 2. Headers are decorated from a session snapshot and the request is sent
//! 3. 401 → `RefreshCoordinator` yields a token (refreshing at most once in flight)
//! 4. The same request is resent once with that token, marked as retried
//! 5. A second 401, a failed refresh or a missing refresh token → tokens cleared, login redirect
//! 6. 402 → paywall metadata recorded, one paywall redirect, `PaymentRequired` returned

pub mod admin;
pub mod classify;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod decorate;
pub mod error;
pub mod metrics;
pub mod paywall;
pub mod redirect;
pub mod request;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use classify::{
    Classification, PaywallMeta, TransportFailure, classify_status, classify_transport,
};
pub use client::Client;
pub use config::{ApiConfig, ClientConfig, RouteConfig, StorageConfig};
pub use coordinator::{RefreshCoordinator, RefreshState};
pub use decorate::decorate;
pub use error::{Error, Result};
pub use paywall::{PaywallState, PaywallStore};
pub use redirect::{Navigator, RedirectGuard};
pub use request::{OriginalRequest, RequestContext, RequestOptions, Response};
pub use telemetry::init_tracing;
