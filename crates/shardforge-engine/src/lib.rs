//! Game content engine for shardforge
//!
//! Holds the game data model, the [`Orchestrator`] that drives generation
//! flows against a backend and the shard ledger, session persistence with
//! its cross-process lock, and the JSON/PDF exporters.

pub mod export;
pub mod model;
pub mod orchestrator;
pub mod session;

pub use export::{ExportFormat, export, export_filename};
pub use model::{Card, CardKind, CreatureStats, GameSet, ImageState, Session, Theme};
pub use orchestrator::{
    ImagePassReport, Orchestrator, PassNotice, RegenerateOutcome, validate_set_request,
};
pub use session::{SessionGuard, SessionLock, SessionStore};
