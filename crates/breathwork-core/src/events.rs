use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::SessionSummary;

/// Every state change in the system produces an Event.
/// The CLI renders them; collaborators are driven from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        protocol_id: String,
        session_duration: u32,
        at: DateTime<Utc>,
    },
    PhaseAdvanced {
        phase_index: usize,
        phase_label: String,
        phase_secs: u32,
        at: DateTime<Utc>,
    },
    CycleCompleted {
        cycles: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        elapsed_secs: u32,
        at: DateTime<Utc>,
    },
    SessionResumed {
        elapsed_secs: u32,
        at: DateTime<Utc>,
    },
    /// Elapsed time reached the protocol's session duration.
    SessionCompleted {
        summary: SessionSummary,
        at: DateTime<Utc>,
    },
    /// Session was ended by hand (or replaced by a new start).
    SessionEnded {
        summary: SessionSummary,
        at: DateTime<Utc>,
    },
    /// A recorder or audio call failed. The session itself is unaffected.
    CollaboratorFailed {
        collaborator: String,
        message: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Summary of the finished session, if this event closes one.
    pub fn summary(&self) -> Option<&SessionSummary> {
        match self {
            Event::SessionCompleted { summary, .. } | Event::SessionEnded { summary, .. } => {
                Some(summary)
            }
            _ => None,
        }
    }
}
