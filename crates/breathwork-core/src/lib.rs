//! # Breathwork Core Library
//!
//! Core logic for the Breathwork breathing-exercise timer. The CLI binary is
//! a thin presentation layer over this crate.
//!
//! ## Architecture
//!
//! - **Protocols**: static catalog of breathing patterns, extended from config
//! - **Phase Engine**: a tick-driven state machine that maps elapsed seconds
//!   to (phase, time left, elapsed, cycles) and signals completion
//! - **Session Runner**: tokio host that owns the cancellable 1 Hz tick task
//!   and calls the recorder / ambient-audio collaborators fire-and-forget
//! - **Storage**: SQLite session log and TOML configuration
//! - **Stats**: totals, period buckets and streaks over recorded sessions
//!
//! ## Key Components
//!
//! - [`PhaseEngine`]: Core breathing state machine
//! - [`SessionRunner`]: Async tick scheduling and collaborator dispatch
//! - [`ProtocolCatalog`]: Protocol lookup by id
//! - [`Database`]: Session persistence
//! - [`Config`]: Application configuration management

pub mod engine;
pub mod error;
pub mod events;
pub mod protocol;
pub mod session;
pub mod stats;
pub mod storage;

pub use engine::{EngineStatus, PhaseEngine, SessionSnapshot, SessionState, SessionSummary};
pub use error::{CollaboratorError, ConfigError, CoreError, DatabaseError, ProtocolError};
pub use events::Event;
pub use protocol::{BreathingProtocol, ProtocolCatalog};
pub use session::{AmbientAudio, NoopRecorder, RunnerOptions, SessionRecorder, SessionRunner, SilentAudio};
pub use stats::{Period, PeriodBucket, SessionStats};
pub use storage::{AccountFlags, Config, Database, SessionRecord, SqliteRecorder};
