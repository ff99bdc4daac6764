//! Client-side metrics
//!
//! Emitted through the `metrics` facade; the embedding application decides
//! which recorder (if any) is installed.
//!
//! - `client_requests_total` (counter): label `outcome`
//! - `client_token_refresh_total` (counter): label `result`
//! - `client_redirects_total` (counter): label `target`

/// Record the final outcome of one logical request.
pub fn record_request(outcome: &'static str) {
    metrics::counter!("client_requests_total", "outcome" => outcome).increment(1);
}

/// Record one call to the refresh endpoint.
pub fn record_refresh(success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("client_token_refresh_total", "result" => result).increment(1);
}

/// Record a navigation actually issued by the redirect guard.
pub fn record_redirect(target: &'static str) {
    metrics::counter!("client_redirects_total", "target" => target).increment(1);
}
