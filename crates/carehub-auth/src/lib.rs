//! CareHub session credentials
//!
//! Holds the pieces of authentication that do not depend on the request
//! pipeline: the credential store (access token, refresh token, active
//! office) and the two token endpoint calls.
//!
//! Credential flow:
//! 1. The application calls `token::obtain_token()` with email and password
//! 2. Both tokens land in the store via `CredentialStore::store_pair()`
//! 3. On an expired access token the client calls `token::refresh_access()`
//! 4. The new access token is committed via `CredentialStore::store_access()`
//! 5. A rejected refresh clears both tokens via `CredentialStore::clear_tokens()`

pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;

pub use constants::*;
pub use credentials::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, Session, StoreFuture,
};
pub use error::{Error, Result};
pub use token::{TokenPair, TokenResponse, obtain_token, refresh_access};
