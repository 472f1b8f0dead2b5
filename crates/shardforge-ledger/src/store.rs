//! Durable storage for the shard balance.

use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use shardforge_utils::atomic_write::write_file_atomic;

use crate::LedgerError;

/// A single-value store holding the balance as decimal text.
///
/// `load` returns the raw stored text so the ledger decides how to treat
/// garbage; `None` means nothing has been stored yet.
pub trait ShardStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, LedgerError>;
    fn save(&self, balance: u64) -> Result<(), LedgerError>;
}

/// Balance file in the state directory, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileShardStore {
    path: Utf8PathBuf,
}

impl FileShardStore {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl ShardStore for FileShardStore {
    fn load(&self) -> Result<Option<String>, LedgerError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LedgerError::Store(format!(
                "failed to read {}: {e}",
                self.path
            ))),
        }
    }

    fn save(&self, balance: u64) -> Result<(), LedgerError> {
        write_file_atomic(&self.path, &balance.to_string())
            .map(|_| ())
            .map_err(|e| LedgerError::Store(format!("{e:#}")))
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryShardStore {
    value: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemoryShardStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with raw text, as if written by an earlier run.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(raw.into())),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Replace the stored text, as another process writing the balance would.
    pub fn set_raw(&self, raw: impl Into<String>) {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(raw.into());
    }

    /// Make subsequent saves fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The raw stored text.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.value
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ShardStore for MemoryShardStore {
    fn load(&self) -> Result<Option<String>, LedgerError> {
        Ok(self.raw())
    }

    fn save(&self, balance: u64) -> Result<(), LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Store("memory store rejecting writes".to_string()));
        }
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(balance.to_string());
        Ok(())
    }
}

impl<T: ShardStore + ?Sized> ShardStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<String>, LedgerError> {
        (**self).load()
    }

    fn save(&self, balance: u64) -> Result<(), LedgerError> {
        (**self).save(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("tcg_shard_balance")).unwrap();
        let store = FileShardStore::new(path);

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("state/tcg_shard_balance")).unwrap();
        let store = FileShardStore::new(path.clone());

        store.save(1234).unwrap();

        assert_eq!(store.load().unwrap().as_deref(), Some("1234"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "1234");
    }

    #[test]
    fn test_memory_store_failure_switch() {
        let store = MemoryShardStore::with_raw("5");
        store.set_fail_writes(true);
        assert!(store.save(6).is_err());
        assert_eq!(store.raw().as_deref(), Some("5"));
    }
}
