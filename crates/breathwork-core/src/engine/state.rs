use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

/// Mutable timer state. Only [`PhaseEngine`](super::PhaseEngine) writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub status: EngineStatus,
    pub current_phase_index: usize,
    pub phase_time_left: u32,
    pub session_time_elapsed: u32,
    pub cycles: u32,
}

impl SessionState {
    /// Ticking or paused; a session is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self.status, EngineStatus::Running | EngineStatus::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.status == EngineStatus::Paused
    }

    /// Active and not paused: ticks are being delivered.
    pub fn is_running(&self) -> bool {
        self.status == EngineStatus::Running
    }
}

/// What the session recorder receives when a session finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub protocol_id: String,
    pub protocol_name: String,
    pub target_secs: u32,
    pub completed_secs: u32,
    pub cycles: u32,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Read-only view handed to the presentation layer once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub protocol_id: Option<String>,
    #[serde(flatten)]
    pub state: SessionState,
    pub phase_label: Option<String>,
    pub phase_duration: u32,
    /// 0.0 .. 1.0 through the current phase, for animation scaling.
    pub phase_progress: f64,
    pub completion_pct: f64,
    pub elapsed_display: String,
    pub remaining_display: String,
    pub is_complete: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            protocol_id: None,
            state: SessionState::default(),
            phase_label: None,
            phase_duration: 0,
            phase_progress: 0.0,
            completion_pct: 0.0,
            elapsed_display: "00:00".into(),
            remaining_display: "00:00".into(),
            is_complete: false,
        }
    }
}
