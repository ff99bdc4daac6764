//! Redirect guard for login and paywall navigation
//!
//! A burst of failing requests must produce at most one navigation. The
//! guard remembers the navigation it issued and blocks further redirects
//! until that navigation has landed: once the current location is seen on
//! the target route the burst is over, and the next failure after the user
//! moves on may redirect again. A redirect is also skipped when the app is
//! already on the target route, so the login and paywall screens can call
//! protected endpoints without looping.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::classify::PaywallMeta;
use crate::metrics;
use crate::paywall::PaywallStore;

/// Application hook for in-app navigation.
pub trait Navigator: Send + Sync {
    /// Current location as path plus query, e.g. `/agenda?week=3`.
    fn current_location(&self) -> String;

    /// Navigate to an in-app route.
    fn navigate(&self, target: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Login,
    Paywall,
}

impl Target {
    fn label(self) -> &'static str {
        match self {
            Target::Login => "login",
            Target::Paywall => "paywall",
        }
    }
}

/// The last navigation issued and whether it has been seen to land.
#[derive(Debug, Clone, Copy)]
struct Latch {
    target: Target,
    landed: bool,
}

pub struct RedirectGuard {
    navigator: Arc<dyn Navigator>,
    login_route: String,
    paywall_route: String,
    latch: Mutex<Option<Latch>>,
    paywall: PaywallStore,
}

impl RedirectGuard {
    pub fn new(navigator: Arc<dyn Navigator>, login_route: String, paywall_route: String) -> Self {
        Self {
            navigator,
            login_route,
            paywall_route,
            latch: Mutex::new(None),
            paywall: PaywallStore::new(),
        }
    }

    /// Send the user to the login screen. Returns whether a navigation was issued.
    pub fn go_to_login(&self) -> bool {
        let location = self.navigator.current_location();
        self.redirect(&location, Target::Login)
    }

    /// Record checkout metadata, then send the user to the paywall.
    ///
    /// The metadata is recorded on every call. The return location is only
    /// recorded when the user is not already on the paywall.
    pub fn go_to_paywall(&self, meta: &PaywallMeta) -> bool {
        let location = self.navigator.current_location();
        let on_paywall = location.starts_with(&self.paywall_route);
        let next = (!on_paywall).then(|| location.clone());
        self.paywall.record(meta, next);

        if self.redirect(&location, Target::Paywall) {
            debug!(
                office_id = meta.office_id.as_deref().unwrap_or(""),
                reason = %meta.reason,
                "paywall metadata recorded"
            );
            return true;
        }
        false
    }

    /// Drop the latch (after sign-in, sign-out or payment).
    pub fn reset(&self) {
        *self.lock() = None;
    }

    /// True while an issued navigation has not been seen to land.
    pub fn is_redirecting(&self) -> bool {
        self.lock().is_some_and(|latch| !latch.landed)
    }

    pub fn paywall(&self) -> &PaywallStore {
        &self.paywall
    }

    fn redirect(&self, location: &str, target: Target) -> bool {
        let route = self.route(target);
        if !self.claim(location, target) {
            debug!(location = %location, target = target.label(), "redirect suppressed");
            return false;
        }
        info!(from = %location, to = %route, "redirecting");
        metrics::record_redirect(target.label());
        self.navigator.navigate(route);

        // Navigators that move synchronously have landed already.
        let now = self.navigator.current_location();
        self.observe(&mut self.lock(), &now);
        true
    }

    /// Take the latch unless we are already on the target route or an
    /// earlier navigation is still in flight.
    fn claim(&self, location: &str, target: Target) -> bool {
        let mut latch = self.lock();
        self.observe(&mut latch, location);

        if location.starts_with(self.route(target)) {
            return false;
        }
        if latch.is_some_and(|l| !l.landed) {
            return false;
        }
        *latch = Some(Latch {
            target,
            landed: false,
        });
        true
    }

    /// Mark the pending navigation as landed when `location` is on its route,
    /// and release a landed latch once the user has left that route.
    fn observe(&self, latch: &mut Option<Latch>, location: &str) {
        let Some(current) = latch.as_mut() else {
            return;
        };
        if location.starts_with(self.route(current.target)) {
            current.landed = true;
        } else if current.landed {
            *latch = None;
        }
    }

    fn route(&self, target: Target) -> &str {
        match target {
            Target::Login => &self.login_route,
            Target::Paywall => &self.paywall_route,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Latch>> {
        self.latch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
