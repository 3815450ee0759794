use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use super::Database;
use crate::engine::SessionSummary;
use crate::error::CollaboratorError;
use crate::session::SessionRecorder;

/// Session recorder backed by the local SQLite log.
///
/// Inserts run on the blocking pool so the tick task is never held up by
/// disk I/O.
#[derive(Clone)]
pub struct SqliteRecorder {
    db: Arc<Mutex<Database>>,
}

impl SqliteRecorder {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Shared handle for reading back what was recorded.
    pub fn database(&self) -> Arc<Mutex<Database>> {
        Arc::clone(&self.db)
    }
}

#[async_trait]
impl SessionRecorder for SqliteRecorder {
    async fn record(&self, summary: SessionSummary) -> Result<(), CollaboratorError> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || -> Result<(), CollaboratorError> {
            let db = db
                .lock()
                .map_err(|_| CollaboratorError::Recorder("database mutex poisoned".into()))?;
            let id = db.record_session(&summary)?;
            debug!(id, protocol = %summary.protocol_id, "session recorded");
            Ok(())
        })
        .await
        .map_err(|e| CollaboratorError::Recorder(format!("record task failed: {e}")))?
    }
}
