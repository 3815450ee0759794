use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::storage::SessionRecord;

/// Usage of a single protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolUsage {
    pub protocol_id: String,
    pub protocol_name: String,
    pub sessions: u64,
    pub total_secs: u64,
}

/// Totals across a set of sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    /// Completed / total (0.0 to 1.0)
    pub completion_rate: f64,
    pub total_secs: u64,
    pub total_cycles: u64,
    pub avg_secs: f64,
    /// Most used first.
    pub by_protocol: Vec<ProtocolUsage>,
}

impl SessionStats {
    pub fn from_records(records: &[SessionRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut usage: HashMap<&str, ProtocolUsage> = HashMap::new();
        let mut stats = Self::default();

        for record in records {
            stats.total_sessions += 1;
            if record.completed {
                stats.completed_sessions += 1;
            }
            stats.total_secs += u64::from(record.completed_secs);
            stats.total_cycles += u64::from(record.cycles);

            let entry = usage
                .entry(record.protocol_id.as_str())
                .or_insert_with(|| ProtocolUsage {
                    protocol_id: record.protocol_id.clone(),
                    protocol_name: record.protocol_name.clone(),
                    sessions: 0,
                    total_secs: 0,
                });
            entry.sessions += 1;
            entry.total_secs += u64::from(record.completed_secs);
        }

        stats.completion_rate = stats.completed_sessions as f64 / stats.total_sessions as f64;
        stats.avg_secs = stats.total_secs as f64 / stats.total_sessions as f64;

        let mut by_protocol: Vec<ProtocolUsage> = usage.into_values().collect();
        by_protocol.sort_by(|a, b| {
            b.sessions
                .cmp(&a.sessions)
                .then_with(|| a.protocol_id.cmp(&b.protocol_id))
        });
        stats.by_protocol = by_protocol;
        stats
    }
}
