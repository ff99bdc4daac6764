//! CareHub API compatibility constants
//!
//! Storage keys and header names are a compatibility surface: existing
//! sessions written by the web client use exactly these names.

/// Default API base when neither config nor `CAREHUB_API_BASE` sets one.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

/// Token obtain endpoint, relative to the API base.
pub const LOGIN_PATH: &str = "/auth/token/";

/// Token refresh endpoint, relative to the API base.
pub const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Header carrying the active office (tenant scope).
pub const OFFICE_HEADER: &str = "X-Office-Id";

/// Persisted key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Persisted key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Persisted key for the active office id.
pub const OFFICE_ID_KEY: &str = "current_office_id";
