//! Shared state for CLI commands
//!
//! Every command runs against one [`AppContext`]: the effective config, the
//! shard ledger opened from the state directory, and the session store.
//! Commands that change the session or the balance take the session lock
//! through [`AppContext::acquire`], which re-reads the balance under it.

use shardforge_config::Config;
use shardforge_engine::{ImagePassReport, Orchestrator, SessionGuard, SessionLock, SessionStore};
use shardforge_ledger::ShardLedger;
use shardforge_utils::error::{ForgeError, GenerationOp};
use std::sync::Arc;

pub struct AppContext {
    pub config: Config,
    pub ledger: Arc<ShardLedger>,
    pub store: SessionStore,
}

impl AppContext {
    #[must_use]
    pub fn open(config: Config) -> Self {
        let ledger = Arc::new(ShardLedger::open_from_config(&config));
        let store = SessionStore::in_state_dir(&config.state_dir());
        Self {
            config,
            ledger,
            store,
        }
    }

    /// Build the orchestrator; backend setup failures are attributed to `op`.
    pub fn orchestrator(&self, op: GenerationOp) -> Result<Orchestrator, ForgeError> {
        Orchestrator::from_config(&self.config, Arc::clone(&self.ledger))
            .map_err(|e| ForgeError::generation(op, e))
    }

    pub fn session_lock(&self) -> Result<SessionLock, ForgeError> {
        SessionLock::open(&self.config.state_dir())
    }

    /// Take the session lock and reload the shard balance under it.
    ///
    /// The ledger was read when the context opened; a command that held the
    /// lock since then may have spent or refunded shards.
    pub fn acquire<'l>(&self, lock: &'l mut SessionLock) -> Result<SessionGuard<'l>, ForgeError> {
        let guard = lock.try_acquire()?;
        self.ledger.reload();
        Ok(guard)
    }
}

/// Print the outcome of an image pass; notices go to stderr.
pub fn print_pass_report(report: &ImagePassReport, balance: u64) {
    if report.attempted() == 0 {
        println!("No pending cards.");
    } else {
        println!(
            "✓ Images: {} generated, {} failed, {} skipped (out of shards)",
            report.generated, report.failed, report.starved
        );
    }
    for notice in &report.notices {
        eprintln!("! {notice}");
    }
    println!("Shards remaining: {balance}");
}
