//! Single-flight access token refresh
//!
//! However many requests hit a 401 at once, at most one refresh call is in
//! flight. The first caller leads; everyone else queues behind it and is
//! released in arrival order with the leader's outcome.
//!
//! The refresh itself runs on a spawned task, so a caller that gives up (its
//! future is dropped) never leaves the coordinator stuck in `Refreshing`.
//! The new token is committed to the store before the state returns to
//! `Idle`; a 401 that arrives later for the old token finds the new one
//! already stored and retries with it instead of refreshing again.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use carehub_auth::{CredentialStore, refresh_access};
use common::Secret;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::redirect::RedirectGuard;
use crate::request::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// `None` means the refresh failed.
type Outcome = Option<Secret<String>>;

struct Inner {
    state: RefreshState,
    waiters: VecDeque<oneshot::Sender<Outcome>>,
}

enum Admission {
    /// Recovery is impossible for this request.
    Terminal(&'static str),
    /// Another refresh already replaced the token this request was sent with.
    Current(Secret<String>),
    /// A refresh is in flight; wait for it.
    Wait(oneshot::Receiver<Outcome>),
    /// This caller starts the refresh.
    Lead {
        refresh: Secret<String>,
        rx: oneshot::Receiver<Outcome>,
    },
}

pub struct RefreshCoordinator {
    http: reqwest::Client,
    refresh_url: String,
    refresh_path: String,
    timeout: Duration,
    store: Arc<dyn CredentialStore>,
    guard: Arc<RedirectGuard>,
    inner: Mutex<Inner>,
}

impl RefreshCoordinator {
    pub fn new(
        http: reqwest::Client,
        config: &ClientConfig,
        store: Arc<dyn CredentialStore>,
        guard: Arc<RedirectGuard>,
    ) -> Self {
        Self {
            http,
            refresh_url: config.url(&config.api.refresh_path),
            refresh_path: config.api.refresh_path.clone(),
            timeout: config.timeout(),
            store,
            guard,
            inner: Mutex::new(Inner {
                state: RefreshState::Idle,
                waiters: VecDeque::new(),
            }),
        }
    }

    pub fn state(&self) -> RefreshState {
        self.lock().state
    }

    /// Callers currently queued behind the in-flight refresh.
    pub fn pending_waiters(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Recover from a 401 on `ctx`, which was sent with `sent_with`.
    ///
    /// Returns the access token to retry with. On any terminal outcome the
    /// tokens are gone, the login redirect has been requested, and the error
    /// is [`Error::Unauthorized`].
    pub async fn recover(
        self: &Arc<Self>,
        ctx: &RequestContext,
        sent_with: Option<&Secret<String>>,
    ) -> Result<Secret<String>> {
        let rx = match self.admit(ctx, sent_with) {
            Admission::Terminal(reason) => return Err(self.terminal(reason).await),
            Admission::Current(token) => {
                debug!(request_id = %ctx.request_id(), "token already refreshed, retrying with it");
                return Ok(token);
            }
            Admission::Wait(rx) => {
                debug!(request_id = %ctx.request_id(), "waiting for in-flight refresh");
                rx
            }
            Admission::Lead { refresh, rx } => {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.run_refresh(refresh).await });
                rx
            }
        };

        match rx.await {
            Ok(Some(token)) => Ok(token),
            Ok(None) | Err(_) => Err(Error::Unauthorized),
        }
    }

    fn admit(&self, ctx: &RequestContext, sent_with: Option<&Secret<String>>) -> Admission {
        if ctx.retried() {
            return Admission::Terminal("retry was rejected");
        }
        let path = ctx.request().path.split('?').next().unwrap_or_default();
        if path.ends_with(&self.refresh_path) {
            return Admission::Terminal("refresh endpoint rejected the session");
        }

        let mut inner = self.lock();
        if inner.state == RefreshState::Refreshing {
            let (tx, rx) = oneshot::channel();
            inner.waiters.push_back(tx);
            return Admission::Wait(rx);
        }

        let session = self.store.snapshot();
        if let Some(current) = session.access {
            let stale = match sent_with {
                Some(sent) => !current.matches(sent.expose()),
                None => true,
            };
            if stale {
                return Admission::Current(current);
            }
        }

        let Some(refresh) = session.refresh else {
            return Admission::Terminal("no refresh token");
        };

        inner.state = RefreshState::Refreshing;
        let (tx, rx) = oneshot::channel();
        inner.waiters.push_back(tx);
        Admission::Lead { refresh, rx }
    }

    async fn run_refresh(&self, refresh: Secret<String>) {
        info!("refreshing access token");
        let result =
            refresh_access(&self.http, &self.refresh_url, refresh.expose(), self.timeout).await;

        match result {
            Ok(access) => {
                if let Err(e) = self.store.store_access(access.clone()).await {
                    warn!(error = %e, "failed to persist refreshed access token");
                }
                metrics::record_refresh(true);
                let waiters = self.finish();
                info!(waiters = waiters.len(), "access token refreshed");
                for waiter in waiters {
                    let _ = waiter.send(Some(access.clone()));
                }
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                if let Err(e) = self.store.clear_tokens().await {
                    warn!(error = %e, "failed to clear tokens after refresh failure");
                }
                metrics::record_refresh(false);
                let waiters = self.finish();
                for waiter in waiters {
                    let _ = waiter.send(None);
                }
                self.guard.go_to_login();
            }
        }
    }

    /// Back to `Idle`, handing over the queued waiters in FIFO order.
    fn finish(&self) -> VecDeque<oneshot::Sender<Outcome>> {
        let mut inner = self.lock();
        inner.state = RefreshState::Idle;
        std::mem::take(&mut inner.waiters)
    }

    /// End the session: clear both tokens and request the login redirect.
    /// Returns the error to hand back to the caller.
    pub async fn terminal(&self, reason: &'static str) -> Error {
        warn!(reason, "session cannot be recovered");
        if let Err(e) = self.store.clear_tokens().await {
            warn!(error = %e, "failed to clear tokens");
        }
        self.guard.go_to_login();
        Error::Unauthorized
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
