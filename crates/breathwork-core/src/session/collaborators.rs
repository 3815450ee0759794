use async_trait::async_trait;
use tracing::debug;

use crate::engine::SessionSummary;
use crate::error::CollaboratorError;

/// Receives one summary per finished session.
///
/// Best effort: the runner calls it on a spawned task and never waits for
/// the result. An `Err` is logged and surfaced as a notice; it cannot
/// change the session that produced the summary.
#[async_trait]
pub trait SessionRecorder: Send + Sync {
    async fn record(&self, summary: SessionSummary) -> Result<(), CollaboratorError>;
}

/// Background audio that plays while a session is running (active and not
/// paused). The runner only reports the two transitions.
pub trait AmbientAudio: Send + Sync {
    fn start(&self) -> Result<(), CollaboratorError>;
    fn stop(&self) -> Result<(), CollaboratorError>;
}

/// Recorder that drops every summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

#[async_trait]
impl SessionRecorder for NoopRecorder {
    async fn record(&self, summary: SessionSummary) -> Result<(), CollaboratorError> {
        debug!(protocol = %summary.protocol_id, "session not recorded");
        Ok(())
    }
}

/// Audio player for hosts without sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AmbientAudio for SilentAudio {
    fn start(&self) -> Result<(), CollaboratorError> {
        debug!("ambient audio start (silent)");
        Ok(())
    }

    fn stop(&self) -> Result<(), CollaboratorError> {
        debug!("ambient audio stop (silent)");
        Ok(())
    }
}
