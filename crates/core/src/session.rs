//! # Session store
//!
//! Holds the current principal and bearer token on the client side and keeps
//! them in durable storage between runs.
//!
//! A session only counts as authenticated when both the identity record and a
//! non-empty token are present. Persisted state that fails this check, or
//! that cannot be parsed at all, is purged during `hydrate` and the store
//! starts logged out.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    errors::{CareError, CareResult},
    models::principal::{AuthGrant, Credentials, Principal},
};

/// External identity provider.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> CareResult<AuthGrant>;

    /// Invalidates `token` on the backend. Defaults to a no-op.
    async fn logout(&self, _token: &str) -> CareResult<()> {
        Ok(())
    }
}

/// Durable storage for the raw serialized session.
pub trait SessionPersistence: Send + Sync {
    fn load(&self) -> Result<Option<String>>;

    fn save(&self, raw: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Session kept in a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionPersistence {
    path: PathBuf,
}

impl FileSessionPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileSessionPersistence {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .wrap_err_with(|| format!("Failed to read session file {}", self.path.display()))?;
        Ok(Some(raw))
    }

    fn save(&self, raw: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).wrap_err("Failed to create session directory")?;
            }
        }
        fs::write(&self.path, raw)
            .wrap_err_with(|| format!("Failed to write session file {}", self.path.display()))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).wrap_err("Failed to remove session file"),
        }
    }
}

/// Session kept in process memory only.
#[derive(Debug, Default)]
pub struct MemorySessionPersistence {
    raw: Mutex<Option<String>>,
}

impl MemorySessionPersistence {
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().ok().and_then(|raw| raw.clone())
    }
}

impl SessionPersistence for MemorySessionPersistence {
    fn load(&self) -> Result<Option<String>> {
        let raw = self
            .raw
            .lock()
            .map_err(|_| eyre::eyre!("session storage lock poisoned"))?;
        Ok(raw.clone())
    }

    fn save(&self, raw: &str) -> Result<()> {
        let mut slot = self
            .raw
            .lock()
            .map_err(|_| eyre::eyre!("session storage lock poisoned"))?;
        *slot = Some(raw.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .raw
            .lock()
            .map_err(|_| eyre::eyre!("session storage lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

/// On-disk shape. Both fields are optional so that partial records parse and
/// can be rejected explicitly.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    principal: Option<Principal>,
    token: Option<String>,
}

#[derive(Debug, Clone)]
struct Session {
    principal: Principal,
    token: String,
}

impl Session {
    fn from_raw(raw: &str) -> Option<Self> {
        let persisted: PersistedSession = serde_json::from_str(raw).ok()?;
        let principal = persisted.principal?;
        let token = persisted.token?;
        if token.trim().is_empty() || principal.id.is_empty() {
            return None;
        }
        Some(Self { principal, token })
    }

    fn to_raw(&self) -> Result<String> {
        let persisted = PersistedSession {
            principal: Some(self.principal.clone()),
            token: Some(self.token.clone()),
        };
        serde_json::to_string(&persisted).wrap_err("Failed to serialize session")
    }
}

pub struct SessionStore<B, P> {
    backend: B,
    persistence: P,
    current: RwLock<Option<Session>>,
}

impl<B: AuthBackend, P: SessionPersistence> SessionStore<B, P> {
    /// Restores the session from `persistence`, purging anything invalid.
    pub fn hydrate(backend: B, persistence: P) -> Self {
        let current = match persistence.load() {
            Ok(Some(raw)) => match Session::from_raw(&raw) {
                Some(session) => {
                    debug!(principal = %session.principal.id, "session restored");
                    Some(session)
                }
                None => {
                    warn!("persisted session is malformed, purging");
                    if let Err(e) = persistence.clear() {
                        warn!("failed to purge session: {}", e);
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("failed to load session, starting logged out: {}", e);
                if let Err(e) = persistence.clear() {
                    warn!("failed to purge session: {}", e);
                }
                None
            }
        };

        Self {
            backend,
            persistence,
            current: RwLock::new(current),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn login(&self, credentials: &Credentials) -> CareResult<Principal> {
        let grant = self.backend.login(credentials).await?;
        if grant.token.trim().is_empty() {
            return Err(CareError::Authentication(
                "identity provider returned an empty token".to_string(),
            ));
        }

        let session = Session {
            principal: grant.principal,
            token: grant.token,
        };
        let raw = session.to_raw()?;

        let mut current = self.write_lock()?;
        self.persistence.save(&raw)?;
        let principal = session.principal.clone();
        *current = Some(session);

        debug!(principal = %principal.id, role = %principal.role, "logged in");
        Ok(principal)
    }

    /// Clears the session locally, then tells the backend.
    ///
    /// Local state is always cleared, even if the backend call fails.
    pub async fn logout(&self) -> CareResult<()> {
        let previous = {
            let mut current = self.write_lock()?;
            let previous = current.take();
            self.persistence.clear()?;
            previous
        };

        if let Some(session) = previous {
            if let Err(e) = self.backend.logout(&session.token).await {
                warn!("backend logout failed: {}", e);
            }
            debug!(principal = %session.principal.id, "logged out");
        }
        Ok(())
    }

    pub fn current_principal(&self) -> Option<Principal> {
        self.current
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|s| s.principal.clone()))
    }

    pub fn token(&self) -> Option<String> {
        self.current
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|s| s.token.clone()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_principal().is_some()
    }

    /// Swaps the token of the current session; the principal is unchanged.
    pub fn refresh_token(&self, token: &str) -> CareResult<()> {
        if token.trim().is_empty() {
            return Err(CareError::invalid("token", "token cannot be empty"));
        }

        let mut current = self.write_lock()?;
        let session = current
            .as_mut()
            .ok_or_else(|| CareError::Authentication("no active session".to_string()))?;

        let refreshed = Session {
            principal: session.principal.clone(),
            token: token.to_string(),
        };
        self.persistence.save(&refreshed.to_raw()?)?;
        *session = refreshed;
        Ok(())
    }

    fn write_lock(&self) -> CareResult<std::sync::RwLockWriteGuard<'_, Option<Session>>> {
        self.current
            .write()
            .map_err(|_| CareError::Internal("session lock poisoned".into()))
    }
}
