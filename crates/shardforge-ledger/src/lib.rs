//! Shard ledger: the in-app currency that gates image generation.
//!
//! The balance lives behind a mutex so check-and-debit is a single atomic
//! step and can never drive the balance below zero. Every change is written
//! through a [`ShardStore`]; a failed write is logged and the in-memory
//! balance stands.

mod store;

pub use store::{FileShardStore, MemoryShardStore, ShardStore};

use shardforge_config::{Config, DEFAULT_SHARD_BALANCE};
use shardforge_utils::error::ForgeError;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment variable overriding the starting balance for first use
pub const STARTING_SHARDS_ENV_VAR: &str = "SHARDFORGE_STARTING_SHARDS";

/// Shards charged per image attempt
pub const IMAGE_COST: u64 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Not enough shards: balance is {balance}, {requested} required")]
    InsufficientShards { balance: u64, requested: u64 },

    #[error("Shard store error: {0}")]
    Store(String),
}

impl From<LedgerError> for ForgeError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientShards { balance, requested } => {
                ForgeError::InsufficientShards { balance, requested }
            }
            LedgerError::Store(msg) => ForgeError::Session(msg),
        }
    }
}

/// Resolve the starting balance with precedence env var > config > 200.
#[must_use]
pub fn resolve_starting_balance(config_balance: Option<u64>) -> u64 {
    let env_balance = std::env::var(STARTING_SHARDS_ENV_VAR)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok());

    if let Some(balance) = env_balance {
        debug!(
            balance,
            default = DEFAULT_SHARD_BALANCE,
            "Using starting balance from environment variable {}",
            STARTING_SHARDS_ENV_VAR
        );
        balance
    } else if let Some(balance) = config_balance {
        debug!(
            balance,
            default = DEFAULT_SHARD_BALANCE,
            "Using starting balance from config file"
        );
        balance
    } else {
        debug!(balance = DEFAULT_SHARD_BALANCE, "Using default starting balance");
        DEFAULT_SHARD_BALANCE
    }
}

/// Process-wide shard balance with durable write-through.
pub struct ShardLedger {
    balance: Mutex<u64>,
    store: Box<dyn ShardStore>,
    default_balance: u64,
}

impl std::fmt::Debug for ShardLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardLedger")
            .field("balance", &self.balance())
            .field("store", &"<ShardStore>")
            .finish()
    }
}

/// Stored text is trimmed and parsed as an unsigned integer; when it is
/// absent or unparsable (including negative values) the balance is
/// `default_balance`.
fn read_balance(store: &dyn ShardStore, default_balance: u64) -> u64 {
    match store.load() {
        Ok(Some(raw)) => match raw.trim().parse::<u64>() {
            Ok(balance) => balance,
            Err(_) => {
                warn!(
                    stored = %raw.trim(),
                    default = default_balance,
                    "Stored shard balance is unparsable, using default"
                );
                default_balance
            }
        },
        Ok(None) => default_balance,
        Err(e) => {
            warn!(error = %e, default = default_balance, "Could not read shard balance, using default");
            default_balance
        }
    }
}

impl ShardLedger {
    /// Open the ledger, reading the stored balance.
    #[must_use]
    pub fn open(store: Box<dyn ShardStore>, default_balance: u64) -> Self {
        let balance = read_balance(store.as_ref(), default_balance);
        debug!(balance, "Shard ledger opened");

        Self {
            balance: Mutex::new(balance),
            store,
            default_balance,
        }
    }

    /// Re-read the stored balance, replacing the in-memory value.
    ///
    /// Another process may have changed the balance since [`ShardLedger::open`];
    /// callers that hold the session lock reload before spending or crediting.
    /// Returns the reloaded balance.
    pub fn reload(&self) -> u64 {
        let mut balance = self.lock();
        *balance = read_balance(self.store.as_ref(), self.default_balance);
        debug!(balance = *balance, "Shard balance reloaded");
        *balance
    }

    /// Open the file-backed ledger described by the configuration.
    #[must_use]
    pub fn open_from_config(config: &Config) -> Self {
        let path = shardforge_utils::paths::balance_path(&config.state_dir(), config.storage_key());
        let starting = resolve_starting_balance(config.default_balance());
        Self::open(Box::new(FileShardStore::new(path)), starting)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, u64> {
        self.balance.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, balance: u64) {
        if let Err(e) = self.store.save(balance) {
            warn!(balance, error = %e, "Failed to persist shard balance");
        }
    }

    #[must_use]
    pub fn balance(&self) -> u64 {
        *self.lock()
    }

    /// Atomically debit `n` shards if the balance covers them.
    ///
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// `LedgerError::InsufficientShards` when the balance is below `n`; the
    /// balance is left untouched.
    pub fn try_debit(&self, n: u64) -> Result<u64, LedgerError> {
        let mut balance = self.lock();
        if *balance < n {
            return Err(LedgerError::InsufficientShards {
                balance: *balance,
                requested: n,
            });
        }
        *balance -= n;
        let new_balance = *balance;
        self.persist(new_balance);
        debug!(balance = new_balance, debited = n, "Shards debited");
        Ok(new_balance)
    }

    /// Refund `n` shards for a failed attempt. Returns the new balance.
    pub fn credit(&self, n: u64) -> u64 {
        let mut balance = self.lock();
        *balance = balance.saturating_add(n);
        let new_balance = *balance;
        self.persist(new_balance);
        debug!(balance = new_balance, credited = n, "Shards credited");
        new_balance
    }

    /// Unconditional credit outside the generation flow. Returns the new balance.
    pub fn add_promotional(&self, n: u64) -> u64 {
        let new_balance = self.credit(n);
        info!(balance = new_balance, added = n, "Promotional shards added");
        new_balance
    }
}
