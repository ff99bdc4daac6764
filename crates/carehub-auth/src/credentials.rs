//! Credential storage for the CareHub session
//!
//! A session is two opaque tokens plus the active office id. Reads are
//! synchronous snapshots of in-memory state so request decoration never waits
//! on I/O; writes return boxed futures so persistent stores can hit the disk.
//!
//! `FileCredentialStore` keeps the session in a JSON file whose keys match the
//! web client's local storage (`access_token`, `refresh_token`,
//! `current_office_id`). All writes use atomic temp-file + rename.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Future returned by credential store writers.
pub type StoreFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Snapshot of the stored session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(
        rename = "access_token",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub access: Option<Secret<String>>,
    #[serde(
        rename = "refresh_token",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh: Option<Secret<String>>,
    #[serde(
        rename = "current_office_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub office_id: Option<String>,
}

impl Session {
    fn apply(&mut self, change: Change) {
        match change {
            Change::Pair { access, refresh } => {
                self.access = Some(access);
                self.refresh = Some(refresh);
            }
            Change::Access(access) => self.access = Some(access),
            Change::ClearTokens => {
                self.access = None;
                self.refresh = None;
            }
            Change::Office(office_id) => self.office_id = office_id,
            Change::ClearAll => *self = Session::default(),
        }
    }
}

/// A single mutation, shared by every store implementation.
enum Change {
    Pair {
        access: Secret<String>,
        refresh: Secret<String>,
    },
    Access(Secret<String>),
    ClearTokens,
    Office(Option<String>),
    ClearAll,
}

/// Storage backing the session.
///
/// Only the login path writes both tokens and only the refresh coordinator
/// writes the access token alone; the client never hands the store out.
pub trait CredentialStore: Send + Sync {
    /// Current session, cloned out of in-memory state.
    fn snapshot(&self) -> Session;

    /// Replace both tokens at once (login).
    fn store_pair(&self, access: Secret<String>, refresh: Secret<String>) -> StoreFuture<'_>;

    /// Replace the access token only (refresh).
    fn store_access(&self, access: Secret<String>) -> StoreFuture<'_>;

    /// Drop both tokens, keep the office id.
    fn clear_tokens(&self) -> StoreFuture<'_>;

    /// Set or unset the active office.
    fn set_office(&self, office_id: Option<String>) -> StoreFuture<'_>;

    /// Drop everything (logout).
    fn clear_all(&self) -> StoreFuture<'_>;
}

/// Process-local store with no persistence.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    state: RwLock<Session>,
}

impl MemoryCredentialStore {
    pub fn new(session: Session) -> Self {
        Self {
            state: RwLock::new(session),
        }
    }

    fn apply(&self, change: Change) -> StoreFuture<'_> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(change);
        Box::pin(async { Ok(()) })
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn snapshot(&self) -> Session {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_pair(&self, access: Secret<String>, refresh: Secret<String>) -> StoreFuture<'_> {
        self.apply(Change::Pair { access, refresh })
    }

    fn store_access(&self, access: Secret<String>) -> StoreFuture<'_> {
        self.apply(Change::Access(access))
    }

    fn clear_tokens(&self) -> StoreFuture<'_> {
        self.apply(Change::ClearTokens)
    }

    fn set_office(&self, office_id: Option<String>) -> StoreFuture<'_> {
        self.apply(Change::Office(office_id))
    }

    fn clear_all(&self) -> StoreFuture<'_> {
        self.apply(Change::ClearAll)
    }
}

/// JSON-file backed store.
///
/// The in-memory copy is updated before the disk write so readers see the new
/// value immediately; the async mutex serializes disk writes so the file
/// always reflects the latest committed change.
pub struct FileCredentialStore {
    path: PathBuf,
    state: RwLock<Session>,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Load the session from `path`.
    ///
    /// A missing file is a cold start: the store begins empty and writes `{}`
    /// so later loads take the normal path.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let session = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let session: Session = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing session file: {e}")))?;
            info!(
                path = %path.display(),
                has_access = session.access.is_some(),
                has_refresh = session.refresh.is_some(),
                "loaded session"
            );
            session
        } else {
            info!(path = %path.display(), "session file not found, starting signed out");
            let session = Session::default();
            write_atomic(&path, &session).await?;
            session
        };

        Ok(Self {
            path,
            state: RwLock::new(session),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn apply(&self, change: Change) -> StoreFuture<'_> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            let updated = {
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                state.apply(change);
                state.clone()
            };
            write_atomic(&self.path, &updated).await
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn snapshot(&self) -> Session {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_pair(&self, access: Secret<String>, refresh: Secret<String>) -> StoreFuture<'_> {
        self.apply(Change::Pair { access, refresh })
    }

    fn store_access(&self, access: Secret<String>) -> StoreFuture<'_> {
        self.apply(Change::Access(access))
    }

    fn clear_tokens(&self) -> StoreFuture<'_> {
        self.apply(Change::ClearTokens)
    }

    fn set_office(&self, office_id: Option<String>) -> StoreFuture<'_> {
        self.apply(Change::Office(office_id))
    }

    fn clear_all(&self) -> StoreFuture<'_> {
        self.apply(Change::ClearAll)
    }
}

/// Write the session to a file atomically, 0600 on unix.
async fn write_atomic(path: &Path, session: &Session) -> Result<()> {
    let json = serde_json::to_string_pretty(session)
        .map_err(|e| Error::CredentialParse(format!("serializing session: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted session");
    Ok(())
}
