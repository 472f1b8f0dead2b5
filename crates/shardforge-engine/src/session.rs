//! Session persistence and the cross-process session lock.
//!
//! The session (theme plus current set) is stored as pretty JSON in the state
//! directory and replaced atomically on save. Commands that mutate it hold an
//! exclusive advisory lock on a sibling lock file for their whole run; a
//! second mutator is turned away with `ForgeError::Busy` rather than queued.

use camino::{Utf8Path, Utf8PathBuf};
use fd_lock::{RwLock, RwLockWriteGuard};
use shardforge_utils::atomic_write::write_file_atomic;
use shardforge_utils::error::ForgeError;
use shardforge_utils::paths;
use std::fs::{File, OpenOptions};
use tracing::debug;

use crate::model::Session;

/// Loads and saves the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: Utf8PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for `<state_dir>/session.json`.
    #[must_use]
    pub fn in_state_dir(state_dir: &Utf8Path) -> Self {
        Self::new(paths::session_path(state_dir))
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Read the session; a missing file is an empty session.
    ///
    /// # Errors
    ///
    /// `ForgeError::Session` when the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Session, ForgeError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path, "No session file, starting empty");
                return Ok(Session::default());
            }
            Err(e) => {
                return Err(ForgeError::Session(format!(
                    "failed to read {}: {e}",
                    self.path
                )));
            }
        };

        serde_json::from_str(&content)
            .map_err(|e| ForgeError::Session(format!("failed to parse {}: {e}", self.path)))
    }

    /// Write the session atomically.
    ///
    /// # Errors
    ///
    /// `ForgeError::Session` when serialization or the write fails.
    pub fn save(&self, session: &Session) -> Result<(), ForgeError> {
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| ForgeError::Session(format!("failed to serialize session: {e}")))?;
        write_file_atomic(&self.path, &json)
            .map_err(|e| ForgeError::Session(format!("{e:#}")))?;
        debug!(path = %self.path, cards = session.game.cards.len(), "Session saved");
        Ok(())
    }
}

/// Advisory lock guarding session mutation across processes.
pub struct SessionLock {
    path: Utf8PathBuf,
    inner: RwLock<File>,
}

impl std::fmt::Debug for SessionLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLock")
            .field("path", &self.path)
            .field("inner", &"<RwLock>")
            .finish()
    }
}

/// Held for as long as the session is being mutated.
pub type SessionGuard<'a> = RwLockWriteGuard<'a, File>;

impl SessionLock {
    /// Open (creating if needed) `<state_dir>/session.lock`.
    ///
    /// # Errors
    ///
    /// `ForgeError::Io` when the state directory or lock file cannot be created.
    pub fn open(state_dir: &Utf8Path) -> Result<Self, ForgeError> {
        paths::ensure_dir_all(state_dir)?;
        let path = paths::session_lock_path(state_dir);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        Ok(Self {
            path,
            inner: RwLock::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Take the lock without waiting.
    ///
    /// # Errors
    ///
    /// `ForgeError::Busy` when another holder has it.
    pub fn try_acquire(&mut self) -> Result<SessionGuard<'_>, ForgeError> {
        let path = self.path.to_string();
        match self.inner.try_write() {
            Ok(guard) => {
                debug!(path = %path, "Session lock acquired");
                Ok(guard)
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(ForgeError::Busy { path })
            }
            Err(e) => Err(ForgeError::Io(e)),
        }
    }
}
