//! Client configuration types and loading
//!
//! Precedence: env vars > config file > defaults. An empty file is a valid
//! configuration pointing at the local development API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use carehub_auth::{DEFAULT_API_BASE, LOGIN_PATH, OFFICE_HEADER, REFRESH_PATH};
use common::Error;
use reqwest::header::HeaderName;
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub routes: RouteConfig,
    pub storage: StorageConfig,
}

/// Remote API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub login_path: String,
    pub refresh_path: String,
    pub office_header: String,
}

/// In-app navigation targets used by the redirect guard
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    pub login: String,
    pub paywall: String,
}

/// Session persistence; no path means an in-memory session
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub credentials_path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
            login_path: LOGIN_PATH.to_string(),
            refresh_path: REFRESH_PATH.to_string(),
            office_header: OFFICE_HEADER.to_string(),
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            paywall: "/paywall".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// `CAREHUB_API_BASE` replaces `api.base_url`, `CAREHUB_CREDENTIALS_PATH`
    /// replaces `storage.credentials_path`.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: ClientConfig = toml::from_str(&contents)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables onto the loaded values.
    pub fn apply_env(&mut self) {
        if let Ok(base) = std::env::var("CAREHUB_API_BASE") {
            self.api.base_url = base;
        }
        if let Ok(path) = std::env::var("CAREHUB_CREDENTIALS_PATH") {
            self.storage.credentials_path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(Error::InvalidValue {
                field: "api.base_url",
                reason: format!(
                    "must start with http:// or https://, got: {}",
                    self.api.base_url
                ),
            });
        }

        if self.api.timeout_secs == 0 {
            return Err(Error::InvalidValue {
                field: "api.timeout_secs",
                reason: "must be greater than 0".into(),
            });
        }

        for (field, value) in [
            ("api.login_path", &self.api.login_path),
            ("api.refresh_path", &self.api.refresh_path),
            ("routes.login", &self.routes.login),
            ("routes.paywall", &self.routes.paywall),
        ] {
            if !value.starts_with('/') {
                return Err(Error::InvalidValue {
                    field,
                    reason: format!("must start with '/', got: {value}"),
                });
            }
        }

        self.office_header()?;
        Ok(())
    }

    /// Parsed tenant header name.
    pub fn office_header(&self) -> common::Result<HeaderName> {
        HeaderName::from_bytes(self.api.office_header.as_bytes()).map_err(|e| {
            Error::InvalidValue {
                field: "api.office_header",
                reason: e.to_string(),
            }
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Absolute URL for an API path. Paths that already carry a scheme are
    /// used as-is.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.api.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Resolve config file path from an explicit path or CONFIG_PATH env var.
    pub fn resolve_path(explicit: Option<&str>) -> PathBuf {
        if let Some(p) = explicit {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("carehub-client.toml")
    }
}
