use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;

// Thread-local override used only in tests to avoid process-global env races.
thread_local! {
    static THREAD_HOME: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
}

/// File name of the persisted session document inside the state directory.
pub const SESSION_FILE: &str = "session.json";

/// File name of the advisory lock guarding session mutation.
pub const SESSION_LOCK_FILE: &str = "session.lock";

/// Resolve the shardforge home directory with precedence:
/// 1) thread-local override (tests)
/// 2) env `SHARDFORGE_HOME`
/// 3) `.shardforge` relative to the working directory
#[must_use]
pub fn shardforge_home() -> Utf8PathBuf {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return tl;
    }
    if let Ok(p) = std::env::var("SHARDFORGE_HOME") {
        return Utf8PathBuf::from(p);
    }
    Utf8PathBuf::from(".shardforge")
}

/// Returns `<state_dir>/<storage_key>`, the shard balance file.
#[must_use]
pub fn balance_path(state_dir: &Utf8Path, storage_key: &str) -> Utf8PathBuf {
    state_dir.join(storage_key)
}

/// Returns `<state_dir>/session.json`
#[must_use]
pub fn session_path(state_dir: &Utf8Path) -> Utf8PathBuf {
    state_dir.join(SESSION_FILE)
}

/// Returns `<state_dir>/session.lock`
#[must_use]
pub fn session_lock_path(state_dir: &Utf8Path) -> Utf8PathBuf {
    state_dir.join(SESSION_LOCK_FILE)
}

/// mkdir -p; treat `AlreadyExists` as success (removes TOCTTOU races)
pub fn ensure_dir_all<P: AsRef<std::path::Path>>(p: P) -> std::io::Result<()> {
    match std::fs::create_dir_all(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// RAII guard for isolated home that clears thread-local state on drop
#[cfg(any(test, feature = "test-utils"))]
pub struct HomeGuard {
    inner: tempfile::TempDir,
}

#[cfg(any(test, feature = "test-utils"))]
impl Drop for HomeGuard {
    fn drop(&mut self) {
        THREAD_HOME.with(|tl| *tl.borrow_mut() = None);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl std::ops::Deref for HomeGuard {
    type Target = tempfile::TempDir;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl HomeGuard {
    /// The isolated home as a UTF-8 path.
    #[must_use]
    pub fn home(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.inner.path().to_path_buf())
            .unwrap_or_else(|p| Utf8PathBuf::from(p.to_string_lossy().into_owned()))
    }
}

/// Test helper: give this test a unique home under the system temp dir.
///
/// Hold the `HomeGuard` for the test's duration so the directory stays alive.
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(not(test), allow(dead_code))]
#[must_use]
pub fn with_isolated_home() -> HomeGuard {
    let td = tempfile::TempDir::new().expect("create temp home");
    let p = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
    THREAD_HOME.with(|tl| *tl.borrow_mut() = Some(p));
    HomeGuard { inner: td }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_home_overrides_default() {
        let guard = with_isolated_home();
        assert_eq!(shardforge_home(), guard.home());
        drop(guard);
        assert_ne!(shardforge_home().as_str(), "");
    }

    #[test]
    fn test_state_file_layout() {
        let dir = Utf8Path::new("/tmp/forge");
        assert_eq!(
            balance_path(dir, "tcg_shard_balance"),
            Utf8PathBuf::from("/tmp/forge/tcg_shard_balance")
        );
        assert_eq!(session_path(dir), Utf8PathBuf::from("/tmp/forge/session.json"));
        assert_eq!(
            session_lock_path(dir),
            Utf8PathBuf::from("/tmp/forge/session.lock")
        );
    }

    #[test]
    fn test_ensure_dir_all_is_idempotent() {
        let td = tempfile::TempDir::new().unwrap();
        let nested = td.path().join("a/b/c");
        ensure_dir_all(&nested).unwrap();
        ensure_dir_all(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
