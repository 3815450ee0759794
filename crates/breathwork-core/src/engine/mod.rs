mod format;
mod phase;
mod state;

pub use format::format_mm_ss;
pub use phase::PhaseEngine;
pub use state::{EngineStatus, SessionSnapshot, SessionState, SessionSummary};
