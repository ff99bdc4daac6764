//! Client facade: the one entry point for API calls
//!
//! Per logical call: decorate from a session snapshot, send, classify. A 401
//! goes to the refresh coordinator and, if it hands back a token, the same
//! request is sent once more. A 402 goes to the redirect guard. Everything
//! else is returned to the caller as-is.

use std::sync::Arc;

use carehub_auth::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, Session, obtain_token,
};
use reqwest::Method;
use reqwest::header::HeaderName;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::classify::{Classification, classify_status, classify_transport};
use crate::config::ClientConfig;
use crate::coordinator::RefreshCoordinator;
use crate::decorate::decorate;
use crate::error::{Error, Result};
use crate::metrics;
use crate::paywall::PaywallState;
use crate::redirect::{Navigator, RedirectGuard};
use crate::request::{OriginalRequest, RequestContext, RequestOptions, Response};

const CHECKOUT_START_PATH: &str = "/subscriptions/checkout/start/";

/// Result of a single send that did not end the call.
enum Attempt {
    Done(Response),
    Unauthorized,
}

#[derive(Deserialize)]
struct CheckoutStart {
    checkout_url: Option<String>,
}

/// Cheap to clone; clones share the session, the refresh state and the
/// redirect latch.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    office_header: HeaderName,
    store: Arc<dyn CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    guard: Arc<RedirectGuard>,
}

impl Client {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        config.validate()?;
        let office_header = config.office_header()?;
        let http = reqwest::Client::new();
        let guard = Arc::new(RedirectGuard::new(
            navigator,
            config.routes.login.clone(),
            config.routes.paywall.clone(),
        ));
        let coordinator = Arc::new(RefreshCoordinator::new(
            http.clone(),
            &config,
            store.clone(),
            guard.clone(),
        ));

        Ok(Self {
            http,
            config: Arc::new(config),
            office_header,
            store,
            coordinator,
            guard,
        })
    }

    /// Build a client with the store named by `storage.credentials_path`,
    /// or an in-memory one when no path is configured.
    pub async fn from_config(config: ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let store: Arc<dyn CredentialStore> = match &config.storage.credentials_path {
            Some(path) => {
                let store = FileCredentialStore::load(path.clone()).await?;
                info!(path = %path.display(), "using file credential store");
                Arc::new(store)
            }
            None => Arc::new(MemoryCredentialStore::default()),
        };
        Self::new(config, store, navigator)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Send one logical request.
    ///
    /// Fails with [`Error::Network`], [`Error::Unauthorized`] (only once
    /// recovery is exhausted), [`Error::PaymentRequired`] or
    /// [`Error::Status`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<Response> {
        let ctx = RequestContext::new(OriginalRequest::new(method, path, body, options));
        let result = self.execute(ctx).await;
        metrics::record_request(outcome(&result));
        result
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        self.request(Method::GET, path, None, RequestOptions::default())
            .await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Response> {
        self.request(Method::POST, path, Some(body), RequestOptions::default())
            .await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Response> {
        self.request(Method::PUT, path, Some(body), RequestOptions::default())
            .await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<Response> {
        self.request(Method::PATCH, path, Some(body), RequestOptions::default())
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.request(Method::DELETE, path, None, RequestOptions::default())
            .await
    }

    #[instrument(skip_all, fields(
        request_id = %ctx.request_id(),
        method = %ctx.request().method,
        path = %ctx.request().path
    ))]
    async fn execute(&self, ctx: RequestContext) -> Result<Response> {
        let session = self.store.snapshot();
        match self.send_once(&ctx, &session).await? {
            Attempt::Done(response) => return Ok(response),
            Attempt::Unauthorized => {}
        }

        debug!("access token rejected");
        let token = self.coordinator.recover(&ctx, session.access.as_ref()).await?;

        let retry = ctx.into_retry();
        let session = Session {
            access: Some(token),
            ..self.store.snapshot()
        };
        match self.send_once(&retry, &session).await? {
            Attempt::Done(response) => Ok(response),
            Attempt::Unauthorized => Err(self.coordinator.terminal("retry was rejected").await),
        }
    }

    async fn send_once(&self, ctx: &RequestContext, session: &Session) -> Result<Attempt> {
        let request = ctx.request();
        let headers = decorate(&request.headers, session, &self.office_header);

        let mut builder = self
            .http
            .request(request.method.clone(), self.config.url(&request.path))
            .headers(headers)
            .timeout(self.config.timeout());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| transport_error(&e))?;

        debug!(status = status.as_u16(), retried = ctx.retried(), "response received");

        match classify_status(status, &body) {
            Classification::Ok => Ok(Attempt::Done(Response {
                status,
                headers,
                body,
            })),
            Classification::Unauthorized => Ok(Attempt::Unauthorized),
            Classification::PaymentRequired(meta) => {
                self.guard.go_to_paywall(&meta);
                Err(Error::PaymentRequired(meta))
            }
            Classification::OtherError(status) => Err(Error::Status { status, body }),
            Classification::NetworkError(failure) => Err(Error::Network(failure.label().into())),
        }
    }

    /// Exchange credentials for a token pair and store both tokens.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let url = self.config.url(&self.config.api.login_path);
        let pair = obtain_token(&self.http, &url, email, password, self.config.timeout()).await?;
        self.store.store_pair(pair.access, pair.refresh).await?;
        self.guard.reset();
        info!("signed in");
        Ok(())
    }

    /// Forget tokens, office and paywall state.
    pub async fn logout(&self) -> Result<()> {
        self.store.clear_all().await?;
        self.guard.paywall().clear();
        self.guard.reset();
        info!("signed out");
        Ok(())
    }

    /// Select the office sent with every request; `None` unscopes requests.
    pub async fn set_office(&self, office_id: Option<String>) -> Result<()> {
        self.store.set_office(office_id).await?;
        Ok(())
    }

    pub fn office(&self) -> Option<String> {
        self.store.snapshot().office_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.snapshot().access.is_some()
    }

    pub fn paywall_state(&self) -> Option<PaywallState> {
        self.guard.paywall().snapshot()
    }

    /// Drop the paywall state after payment. Returns where to resume.
    pub fn payment_completed(&self) -> Option<String> {
        let state = self.guard.paywall().take();
        self.guard.reset();
        state.and_then(|s| s.next)
    }

    /// Open a checkout session and remember its URL for the paywall screen.
    pub async fn start_checkout(&self) -> Result<Option<String>> {
        let response = self
            .post(CHECKOUT_START_PATH, serde_json::json!({}))
            .await?;
        let CheckoutStart { checkout_url } = response.json()?;
        match &checkout_url {
            Some(url) => self.guard.paywall().set_checkout_url(url.clone()),
            None => warn!("checkout start returned no checkout_url"),
        }
        Ok(checkout_url)
    }
}

fn transport_error(err: &reqwest::Error) -> Error {
    let failure = match classify_transport(err) {
        Classification::NetworkError(failure) => failure.label(),
        other => other.label(),
    };
    warn!(failure, error = %err, "request did not reach the API");
    Error::Network(format!("{failure}: {err}"))
}

fn outcome(result: &Result<Response>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(Error::PaymentRequired(_)) => "payment_required",
        Err(Error::Unauthorized) => "unauthorized",
        Err(Error::Network(_)) => "network_error",
        Err(_) => "other_error",
    }
}
