//! # Netward Core — shared infrastructure for the defense pipeline
//!
//! Everything the pipeline stages have in common lives here:
//! - the pipeline data contract (`types`): categories, actions, alert levels,
//!   statistics snapshots, and the durable outcome record
//! - the error type (`error`)
//! - typed TOML configuration (`config`)
//! - the observability event bus (`event_bus`)
//! - persisted state: append-only outcome log, atomic JSON store,
//!   and the blocked-address list (`outcome_log`, `persistence`, `blocklist`)

pub mod blocklist;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod outcome_log;
pub mod persistence;
pub mod types;

pub use blocklist::Blocklist;
pub use config::NetwardConfig;
pub use error::{NetwardError, NetwardResult};
pub use event_bus::{EventBus, EventCategory, PipelineEvent};
pub use outcome_log::OutcomeLog;
pub use types::{
    AlertLevel, EnforcementAction, OutcomeRecord, StatisticsSnapshot, ThreatCategory,
};
