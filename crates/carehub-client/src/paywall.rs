//! Paywall session state
//!
//! Lives only as long as the client: it is never written to the credential
//! file. Cleared on logout and once payment has completed.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::classify::PaywallMeta;

/// What the paywall screen needs to resume the interrupted flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaywallState {
    pub checkout_url: Option<String>,
    pub office_id: Option<String>,
    pub office_name: Option<String>,
    pub reason: Option<String>,
    /// Location (path + query) to return to after payment.
    pub next: Option<String>,
}

impl PaywallState {
    /// Key/value pairs under the web client's session storage names.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        [
            ("paywall_checkout_url", &self.checkout_url),
            ("paywall_office_id", &self.office_id),
            ("paywall_office_name", &self.office_name),
            ("paywall_reason", &self.reason),
            ("paywall_next", &self.next),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect()
    }
}

#[derive(Debug, Default)]
pub struct PaywallStore {
    state: Mutex<Option<PaywallState>>,
}

impl PaywallStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a 402's metadata. Absent fields keep their previous value; the
    /// reason is always replaced. `next` is only set when given.
    pub fn record(&self, meta: &PaywallMeta, next: Option<String>) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = guard.get_or_insert_with(PaywallState::default);

        if let Some(url) = &meta.checkout_url {
            state.checkout_url = Some(url.clone());
        }
        if let Some(id) = &meta.office_id {
            state.office_id = Some(id.clone());
        }
        if let Some(name) = &meta.office_name {
            state.office_name = Some(name.clone());
        }
        state.reason = Some(meta.reason.clone());
        if next.is_some() {
            state.next = next;
        }
    }

    pub fn set_checkout_url(&self, url: String) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        guard.get_or_insert_with(PaywallState::default).checkout_url = Some(url);
    }

    pub fn snapshot(&self) -> Option<PaywallState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Option<PaywallState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn clear(&self) {
        self.take();
    }
}
