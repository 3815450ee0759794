//! Breathing phase engine.
//!
//! A tick-driven state machine. It owns no timer: the caller invokes
//! `tick()` once per elapsed second while the session is running (see
//! [`SessionRunner`](crate::session::SessionRunner) for the async host).
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Running <--toggle_pause--> Paused
//! Running --(elapsed reaches session_duration)--> Idle
//! Running | Paused --end--> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = PhaseEngine::new();
//! engine.start(protocol)?;
//! // Once per second:
//! for event in engine.tick() { /* render, record */ }
//! ```

use chrono::Utc;

use super::format::format_mm_ss;
use super::state::{EngineStatus, SessionSnapshot, SessionState, SessionSummary};
use crate::error::ProtocolError;
use crate::events::Event;
use crate::protocol::BreathingProtocol;

#[derive(Debug, Clone, Default)]
pub struct PhaseEngine {
    protocol: Option<BreathingProtocol>,
    state: SessionState,
    started_at: Option<chrono::DateTime<Utc>>,
    /// Bumped on every start and end so a host can discard stale ticks.
    generation: u64,
}

impl PhaseEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn protocol(&self) -> Option<&BreathingProtocol> {
        self.protocol.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn current_phase_label(&self) -> Option<&str> {
        self.protocol
            .as_ref()?
            .phase_label(self.state.current_phase_index)
    }

    /// Configured length of the current phase in seconds.
    pub fn current_phase_duration(&self) -> u32 {
        self.protocol
            .as_ref()
            .and_then(|p| p.phase_secs(self.state.current_phase_index))
            .unwrap_or(0)
    }

    /// 0.0 .. 1.0 progress within the current phase; 0.0 unless active.
    pub fn phase_progress(&self) -> f64 {
        let total = self.current_phase_duration();
        if total == 0 || !self.state.is_active() {
            return 0.0;
        }
        1.0 - (self.state.phase_time_left as f64 / total as f64)
    }

    /// 0.0 .. 100.0 progress toward the session duration.
    pub fn completion_pct(&self) -> f64 {
        let Some(protocol) = self.protocol.as_ref() else {
            return 0.0;
        };
        if protocol.session_duration == 0 {
            return 0.0;
        }
        (self.state.session_time_elapsed as f64 / protocol.session_duration as f64 * 100.0)
            .min(100.0)
    }

    pub fn formatted_elapsed(&self) -> String {
        format_mm_ss(self.state.session_time_elapsed)
    }

    pub fn formatted_remaining(&self) -> String {
        let target = self.protocol.as_ref().map_or(0, |p| p.session_duration);
        format_mm_ss(target.saturating_sub(self.state.session_time_elapsed))
    }

    pub fn is_complete(&self) -> bool {
        self.protocol
            .as_ref()
            .is_some_and(|p| self.state.session_time_elapsed >= p.session_duration)
    }

    /// Build a full snapshot for the presentation layer.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            protocol_id: self.protocol.as_ref().map(|p| p.id.clone()),
            state: self.state,
            phase_label: self.current_phase_label().map(str::to_string),
            phase_duration: self.current_phase_duration(),
            phase_progress: self.phase_progress(),
            completion_pct: self.completion_pct(),
            elapsed_display: self.formatted_elapsed(),
            remaining_display: self.formatted_remaining(),
            is_complete: self.is_complete(),
        }
    }

    /// Summary of the session in progress, or `None` before the first start.
    pub fn summary(&self, completed: bool) -> Option<SessionSummary> {
        let protocol = self.protocol.as_ref()?;
        let now = Utc::now();
        Some(SessionSummary {
            protocol_id: protocol.id.clone(),
            protocol_name: protocol.name.clone(),
            target_secs: protocol.session_duration,
            completed_secs: self.state.session_time_elapsed,
            cycles: self.state.cycles,
            completed,
            started_at: self.started_at.unwrap_or(now),
            ended_at: now,
        })
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new session, replacing whatever was loaded before.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the protocol is malformed. Nothing is
    /// mutated in that case.
    pub fn start(&mut self, protocol: BreathingProtocol) -> Result<Vec<Event>, ProtocolError> {
        protocol.validate()?;

        let now = Utc::now();
        let mut events = vec![Event::SessionStarted {
            protocol_id: protocol.id.clone(),
            session_duration: protocol.session_duration,
            at: now,
        }];

        self.state = SessionState {
            status: EngineStatus::Running,
            current_phase_index: 0,
            phase_time_left: protocol.pattern[0],
            session_time_elapsed: 0,
            cycles: 0,
        };
        if self.state.phase_time_left == 0 {
            advance(&protocol, &mut self.state, &mut events);
        }
        self.protocol = Some(protocol);
        self.started_at = Some(now);
        self.generation = self.generation.wrapping_add(1);
        Ok(events)
    }

    /// Advance one second. No-op unless running.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.state.status != EngineStatus::Running {
            return events;
        }
        let Some(protocol) = self.protocol.as_ref() else {
            return events;
        };

        self.state.phase_time_left = self.state.phase_time_left.saturating_sub(1);
        if self.state.phase_time_left == 0 {
            advance(protocol, &mut self.state, &mut events);
        }

        self.state.session_time_elapsed += 1;
        if self.state.session_time_elapsed >= protocol.session_duration {
            self.state.session_time_elapsed = protocol.session_duration;
            self.state.status = EngineStatus::Idle;
            if let Some(summary) = self.summary(true) {
                events.push(Event::SessionCompleted {
                    summary,
                    at: Utc::now(),
                });
            }
        }
        events
    }

    pub fn pause(&mut self) -> Option<Event> {
        match self.state.status {
            EngineStatus::Running => {
                self.state.status = EngineStatus::Paused;
                Some(Event::SessionPaused {
                    elapsed_secs: self.state.session_time_elapsed,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    pub fn resume(&mut self) -> Option<Event> {
        match self.state.status {
            EngineStatus::Paused => {
                self.state.status = EngineStatus::Running;
                Some(Event::SessionResumed {
                    elapsed_secs: self.state.session_time_elapsed,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// Pause if running, resume if paused, nothing if idle.
    pub fn toggle_pause(&mut self) -> Option<Event> {
        match self.state.status {
            EngineStatus::Running => self.pause(),
            EngineStatus::Paused => self.resume(),
            EngineStatus::Idle => None,
        }
    }

    /// Hard reset to idle. Returns `SessionEnded` only if a session was in
    /// progress; calling it again is harmless.
    pub fn end(&mut self) -> Option<Event> {
        let ended = if self.state.is_active() {
            self.summary(self.is_complete()).map(|summary| Event::SessionEnded {
                summary,
                at: Utc::now(),
            })
        } else {
            None
        };
        self.state = SessionState::default();
        self.started_at = None;
        self.generation = self.generation.wrapping_add(1);
        ended
    }
}

/// Move to the next phase with a non-zero duration, counting wraps to
/// index 0 as completed cycles.
fn advance(protocol: &BreathingProtocol, state: &mut SessionState, events: &mut Vec<Event>) {
    let len = protocol.pattern.len();
    for _ in 0..len {
        let next = (state.current_phase_index + 1) % len;
        state.current_phase_index = next;
        if next == 0 {
            state.cycles += 1;
            events.push(Event::CycleCompleted {
                cycles: state.cycles,
                at: Utc::now(),
            });
        }
        state.phase_time_left = protocol.pattern[next];
        if state.phase_time_left > 0 {
            events.push(Event::PhaseAdvanced {
                phase_index: next,
                phase_label: protocol.phases[next].clone(),
                phase_secs: state.phase_time_left,
                at: Utc::now(),
            });
            return;
        }
    }
    // validate() rejects all-zero patterns before a session can start.
    unreachable!("protocol '{}' has no non-zero phase", protocol.id);
}
