//! Progress and zone-unlock engine for the Folio portfolio.
//!
//! Visitors earn XP by visiting pages and unlocking one-shot items; XP drives
//! the level, and XP, level and narrative flags together gate content zones.
//! All state is local and persisted per key through a small key-value layer.

pub mod affection;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod kv_store;
pub mod levels;
pub mod rate_limit;
pub mod state;
pub mod zones;

pub use catalog::{ItemCatalog, ItemKind};
pub use config::EngineConfig;
pub use engine::{AwardOutcome, EngineBuilder, ProgressEngine, ProgressSummary, VisitOutcome};
pub use error::FolioError;
pub use events::ProgressEvent;
pub use kv_store::{FileBackend, KvBackend, KvStore, MemoryBackend};
pub use levels::{calculate_level, LevelCurve, LevelProgress};
pub use rate_limit::{Clock, ManualClock, RateLimiter, SystemClock};
pub use state::{GymStats, ProgressState};
pub use zones::{evaluate_unlocks, SpecialFlag, SpecialFlags, ZoneId, ZoneRequirement, ZoneTable};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
