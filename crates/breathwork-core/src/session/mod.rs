//! Async hosting for the phase engine.
//!
//! The [`SessionRunner`] owns the 1 Hz tick task and talks to the
//! collaborators that live outside the engine: a session recorder and an
//! ambient-audio player.

mod collaborators;
mod runner;

pub use collaborators::{AmbientAudio, NoopRecorder, SessionRecorder, SilentAudio};
pub use runner::{RunnerOptions, SessionRunner};
