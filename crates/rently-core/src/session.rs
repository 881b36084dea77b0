//! Durable session storage.
//!
//! The session (bearer token + user summary) is persisted as one JSON
//! document at `<RENTLY_HOME>/session.json` with restricted permissions
//! (0600). Tokens are never logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::paths;

/// Immutable snapshot of the signed-in user, taken from the auth response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// The authenticated identity held by the client for the current login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserSummary>,
}

impl Session {
    /// Creates a session from a fresh auth response.
    pub fn authenticated(token: impl Into<String>, user: UserSummary) -> Self {
        Self {
            token: Some(token.into()),
            user: Some(user),
        }
    }

    /// A session is authenticated exactly when it holds a token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Port for durable cross-restart session storage.
///
/// Production uses [`FsSessionStore`]; tests swap in [`MemorySessionStore`].
pub trait SessionStore {
    /// Returns the last persisted session, or the empty session.
    /// Never fails; malformed persisted data reads as absence.
    fn restore(&self) -> Session;

    /// Persists token and user together. Subsequent `restore` calls
    /// observe the new value.
    fn save(&mut self, session: &Session) -> Result<()>;

    /// Removes the persisted session; idempotent.
    fn clear(&mut self) -> Result<()>;
}

/// File-backed session store.
pub struct FsSessionStore {
    path: PathBuf,
}

impl FsSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the default `<RENTLY_HOME>/session.json` location.
    pub fn open_default() -> Self {
        Self::new(paths::session_path())
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStore for FsSessionStore {
    fn restore(&self) -> Session {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return Session::default();
        };
        let Ok(value) = serde_json::from_str::<Value>(&contents) else {
            return Session::default();
        };
        let Some(token) = value.get("token").and_then(Value::as_str) else {
            return Session::default();
        };
        if token.is_empty() {
            return Session::default();
        }

        // A corrupt user record must not invalidate the token.
        let user = value
            .get("user")
            .cloned()
            .and_then(|u| serde_json::from_value::<UserSummary>(u).ok());

        Session {
            token: Some(token.to_string()),
            user,
        }
    }

    fn save(&mut self, session: &Session) -> Result<()> {
        let Some(token) = session.token.as_deref() else {
            anyhow::bail!("Refusing to persist a session without a token");
        };

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(&serde_json::json!({
            "token": token,
            "user": &session.user,
        }))
        .context("Failed to serialize session")?;

        // Write with restricted permissions
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// In-memory session store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Session,
}

impl MemorySessionStore {
    /// Store seeded with an existing session.
    pub fn with_session(session: Session) -> Self {
        Self { session }
    }
}

impl SessionStore for MemorySessionStore {
    fn restore(&self) -> Session {
        self.session.clone()
    }

    fn save(&mut self, session: &Session) -> Result<()> {
        self.session = session.clone();
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.session = Session::default();
        Ok(())
    }
}
