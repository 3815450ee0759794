//! Read-only catalog of breathing protocols.
//!
//! The built-in set is fixed at compile time. User-defined protocols from
//! the config file are layered on top; a custom protocol with the same id
//! as a built-in one replaces it.

use super::BreathingProtocol;
use crate::error::ProtocolError;

#[derive(Debug, Clone)]
pub struct ProtocolCatalog {
    protocols: Vec<BreathingProtocol>,
}

impl ProtocolCatalog {
    /// The protocols shipped with the application.
    pub fn builtin() -> Self {
        Self {
            protocols: vec![
                BreathingProtocol::new(
                    "box-breathing",
                    "Box Breathing",
                    &[("Inhale", 4), ("Hold", 4), ("Exhale", 4), ("Hold", 4)],
                    240,
                )
                .with_presentation(
                    "#3b82f6",
                    "Focus and stress control",
                    "Equal four-second sides: breathe in, hold, breathe out, hold.",
                ),
                BreathingProtocol::new(
                    "relaxing-478",
                    "4-7-8 Relaxation",
                    &[("Inhale", 4), ("Hold", 7), ("Exhale", 8)],
                    300,
                )
                .with_presentation(
                    "#8b5cf6",
                    "Falling asleep",
                    "Long hold and slow exhale to settle the nervous system.",
                ),
                BreathingProtocol::new(
                    "coherent",
                    "Coherent Breathing",
                    &[("Inhale", 5), ("Exhale", 5)],
                    300,
                )
                .with_presentation(
                    "#10b981",
                    "Heart rate variability",
                    "Six breaths per minute with no holds.",
                ),
                BreathingProtocol::new(
                    "energizing",
                    "Energizing Breath",
                    &[("Inhale", 2), ("Rest", 0), ("Exhale", 2), ("Rest", 0)],
                    120,
                )
                .with_presentation(
                    "#f59e0b",
                    "Alertness",
                    "Quick even breaths without pauses between them.",
                ),
                BreathingProtocol::new(
                    "deep-calm",
                    "Deep Calm",
                    &[("Inhale", 4), ("Hold", 2), ("Exhale", 6), ("Rest", 2)],
                    420,
                )
                .with_presentation(
                    "#06b6d4",
                    "Anxiety relief",
                    "Exhale longer than you inhale and rest before the next breath.",
                ),
            ],
        }
    }

    /// Built-in protocols plus `custom` ones, custom ids taking precedence.
    pub fn with_custom(custom: Vec<BreathingProtocol>) -> Self {
        let mut catalog = Self::builtin();
        for protocol in custom {
            match catalog.protocols.iter_mut().find(|p| p.id == protocol.id) {
                Some(existing) => *existing = protocol,
                None => catalog.protocols.push(protocol),
            }
        }
        catalog
    }

    pub fn get(&self, id: &str) -> Option<&BreathingProtocol> {
        self.protocols.iter().find(|p| p.id == id)
    }

    /// Like [`get`](Self::get) but returns a typed "not found" error.
    pub fn require(&self, id: &str) -> Result<&BreathingProtocol, ProtocolError> {
        self.get(id)
            .ok_or_else(|| ProtocolError::UnknownProtocol(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &BreathingProtocol> {
        self.protocols.iter()
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    /// Every entry that would be rejected by the engine.
    pub fn validate_all(&self) -> Vec<ProtocolError> {
        self.protocols
            .iter()
            .filter_map(|p| p.validate().err())
            .collect()
    }
}

impl Default for ProtocolCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
