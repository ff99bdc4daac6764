//! Request decoration: bearer token and office scope
//!
//! Pure and synchronous. Works on a copy of the caller's headers and uses
//! `insert`, so decorating twice with the same session yields the same map.

use carehub_auth::Session;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

/// Headers for one attempt of `headers` under `session`.
///
/// A missing token or office simply leaves the header unset. Values that are
/// not valid header text are skipped, which turns into an ordinary 401 or an
/// unscoped request downstream.
pub fn decorate(headers: &HeaderMap, session: &Session, office_header: &HeaderName) -> HeaderMap {
    let mut out = headers.clone();

    if let Some(access) = &session.access {
        match HeaderValue::from_str(&access.bearer()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                out.insert(AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "skipping access token that is not a valid header value"),
        }
    }

    if let Some(office_id) = &session.office_id {
        match HeaderValue::from_str(office_id) {
            Ok(value) => {
                out.insert(office_header.clone(), value);
            }
            Err(e) => warn!(header = %office_header, error = %e, "skipping invalid office id"),
        }
    }

    out
}
