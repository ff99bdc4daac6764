//! Token endpoint calls: login and refresh
//!
//! Both endpoints take a JSON body and answer with JSON. The refresh endpoint
//! has shipped under two response shapes over time (`access` and
//! `access_token`), so both are accepted; `access` wins when both are present.

use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Both tokens returned by a successful login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: Secret<String>,
    pub refresh: Secret<String>,
}

/// Raw token endpoint body. Every field is optional so that either naming
/// convention parses; `TokenPair`/`Secret` are built from it afterwards.
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    /// The new access token, preferring `access` over `access_token`.
    pub fn access_token(&self) -> Option<Secret<String>> {
        first_non_empty(&self.access, &self.access_token)
    }

    /// The refresh token, preferring `refresh` over `refresh_token`.
    pub fn refresh_token(&self) -> Option<Secret<String>> {
        first_non_empty(&self.refresh, &self.refresh_token)
    }
}

fn first_non_empty(primary: &Option<String>, fallback: &Option<String>) -> Option<Secret<String>> {
    primary
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| fallback.as_deref().filter(|s| !s.is_empty()))
        .map(Secret::from)
}

/// Exchange email and password for an access/refresh pair.
pub async fn obtain_token(
    client: &reqwest::Client,
    url: &str,
    email: &str,
    password: &str,
    timeout: Duration,
) -> Result<TokenPair> {
    let body = serde_json::json!({ "email": email, "password": password });
    let parsed = post_token_endpoint(client, url, &body, timeout, "login").await?;

    match (parsed.access_token(), parsed.refresh_token()) {
        (Some(access), Some(refresh)) => Ok(TokenPair { access, refresh }),
        _ => Err(Error::TokenRequest(
            "login response is missing access or refresh token".into(),
        )),
    }
}

/// Trade a refresh token for a new access token.
///
/// Any non-2xx status is a failure. 401/403 map to `InvalidCredentials`
/// since they mean the refresh token itself is expired or revoked.
pub async fn refresh_access(
    client: &reqwest::Client,
    url: &str,
    refresh: &str,
    timeout: Duration,
) -> Result<Secret<String>> {
    let body = serde_json::json!({ "refresh": refresh });
    let parsed = post_token_endpoint(client, url, &body, timeout, "refresh").await?;

    parsed
        .access_token()
        .ok_or_else(|| Error::TokenRequest("refresh response has no access token".into()))
}

async fn post_token_endpoint(
    client: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
    timeout: Duration,
    operation: &'static str,
) -> Result<TokenResponse> {
    let response = client
        .post(url)
        .json(body)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| Error::Http(format!("{operation} request failed: {e}")))?;

    let status = response.status();
    debug!(operation, status = status.as_u16(), "token endpoint responded");

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "{operation} rejected ({status}): {body}"
            )));
        }

        return Err(Error::TokenRequest(format!(
            "{operation} returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenRequest(format!("invalid {operation} response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tokio::net::TcpListener;

    /// Serve a fixed status and JSON body on every path.
    async fn start_token_server(status: StatusCode, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let app = axum::Router::new().fallback(move || async move {
                (
                    status,
                    [(axum::http::header::CONTENT_TYPE, "application/json")],
                    body,
                )
            });
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn accepts_access_key() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"access":"T2"}"#).unwrap();
        assert_eq!(parsed.access_token().unwrap().expose(), "T2");
    }

    #[test]
    fn accepts_access_token_key() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"access_token":"T3"}"#).unwrap();
        assert_eq!(parsed.access_token().unwrap().expose(), "T3");
    }

    #[test]
    fn access_wins_over_access_token() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access":"A","access_token":"B"}"#).unwrap();
        assert_eq!(parsed.access_token().unwrap().expose(), "A");
    }

    #[test]
    fn empty_access_falls_back_to_alias() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access":"","access_token":"B"}"#).unwrap();
        assert_eq!(parsed.access_token().unwrap().expose(), "B");
    }

    #[test]
    fn missing_tokens_yield_none() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"detail":"ok"}"#).unwrap();
        assert!(parsed.access_token().is_none());
        assert!(parsed.refresh_token().is_none());
    }

    #[tokio::test]
    async fn refresh_access_returns_new_token() {
        let base = start_token_server(StatusCode::OK, r#"{"access":"T2"}"#).await;
        let token = refresh_access(
            &reqwest::Client::new(),
            &format!("{base}/auth/token/refresh/"),
            "rt_1",
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(token.expose(), "T2");
    }

    #[tokio::test]
    async fn refresh_access_rejected_token_is_invalid_credentials() {
        let base = start_token_server(
            StatusCode::UNAUTHORIZED,
            r#"{"detail":"Token is invalid or expired"}"#,
        )
        .await;
        let err = refresh_access(
            &reqwest::Client::new(),
            &format!("{base}/auth/token/refresh/"),
            "rt_revoked",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn refresh_access_server_error_is_token_request_error() {
        let base = start_token_server(StatusCode::INTERNAL_SERVER_ERROR, "{}").await;
        let err = refresh_access(
            &reqwest::Client::new(),
            &format!("{base}/auth/token/refresh/"),
            "rt_1",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::TokenRequest(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn obtain_token_requires_both_tokens() {
        let base = start_token_server(StatusCode::OK, r#"{"access":"T1"}"#).await;
        let err = obtain_token(
            &reqwest::Client::new(),
            &format!("{base}/auth/token/"),
            "dr@example.com",
            "secret-pass",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("missing"), "got: {err}");
    }

    #[tokio::test]
    async fn obtain_token_returns_pair() {
        let base = start_token_server(StatusCode::OK, r#"{"access":"T1","refresh":"R1"}"#).await;
        let pair = obtain_token(
            &reqwest::Client::new(),
            &format!("{base}/auth/token/"),
            "dr@example.com",
            "secret-pass",
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(pair.access.expose(), "T1");
        assert_eq!(pair.refresh.expose(), "R1");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = refresh_access(
            &reqwest::Client::new(),
            &format!("http://{addr}/auth/token/refresh/"),
            "rt_1",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got: {err:?}");
    }
}
