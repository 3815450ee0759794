use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// A named, fixed breathing pattern.
///
/// `pattern[i]` is the number of seconds spent in `phases[i]`. The session
/// ends after `session_duration` seconds no matter where in the cycle the
/// engine is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreathingProtocol {
    pub id: String,
    pub name: String,
    pub pattern: Vec<u32>,
    pub phases: Vec<String>,
    /// Target session length in seconds.
    pub session_duration: u32,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub benefit: String,
    #[serde(default)]
    pub description: String,
}

impl BreathingProtocol {
    /// Build a protocol from `(label, seconds)` pairs.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        steps: &[(&str, u32)],
        session_duration: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pattern: steps.iter().map(|(_, secs)| *secs).collect(),
            phases: steps.iter().map(|(label, _)| (*label).to_string()).collect(),
            session_duration,
            color: String::new(),
            benefit: String::new(),
            description: String::new(),
        }
    }

    pub fn with_presentation(
        mut self,
        color: impl Into<String>,
        benefit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.color = color.into();
        self.benefit = benefit.into();
        self.description = description.into();
        self
    }

    /// Check the invariants the phase engine relies on.
    ///
    /// # Errors
    /// Returns the first violated rule: empty pattern, length mismatch
    /// between durations and labels, an all-zero pattern, or a zero
    /// session duration.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.pattern.is_empty() {
            return Err(ProtocolError::EmptyPattern {
                id: self.id.clone(),
            });
        }
        if self.pattern.len() != self.phases.len() {
            return Err(ProtocolError::LengthMismatch {
                id: self.id.clone(),
                pattern: self.pattern.len(),
                phases: self.phases.len(),
            });
        }
        if self.pattern.iter().all(|&secs| secs == 0) {
            return Err(ProtocolError::AllZeroPattern {
                id: self.id.clone(),
            });
        }
        if self.session_duration == 0 {
            return Err(ProtocolError::ZeroSessionDuration {
                id: self.id.clone(),
            });
        }
        Ok(())
    }

    pub fn phase_count(&self) -> usize {
        self.pattern.len()
    }

    /// Seconds in one full traversal of the pattern.
    pub fn cycle_secs(&self) -> u64 {
        self.pattern.iter().map(|&secs| u64::from(secs)).sum()
    }

    /// Longest single phase, the upper bound for `phase_time_left`.
    pub fn max_phase_secs(&self) -> u32 {
        self.pattern.iter().copied().max().unwrap_or(0)
    }

    pub fn phase_label(&self, index: usize) -> Option<&str> {
        self.phases.get(index).map(String::as_str)
    }

    pub fn phase_secs(&self, index: usize) -> Option<u32> {
        self.pattern.get(index).copied()
    }

    /// Same protocol with a different session length.
    pub fn with_session_duration(mut self, secs: u32) -> Self {
        self.session_duration = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_breathing() -> BreathingProtocol {
        BreathingProtocol::new(
            "box",
            "Box",
            &[("Inhale", 4), ("Hold", 4), ("Exhale", 4), ("Hold", 4)],
            12,
        )
    }

    #[test]
    fn valid_protocol_passes() {
        assert_eq!(box_breathing().validate(), Ok(()));
        assert_eq!(box_breathing().cycle_secs(), 16);
        assert_eq!(box_breathing().max_phase_secs(), 4);
    }

    #[test]
    fn cycle_secs_does_not_overflow() {
        let long = BreathingProtocol::new(
            "long",
            "Long",
            &[("Inhale", u32::MAX), ("Exhale", u32::MAX)],
            60,
        );
        assert_eq!(long.cycle_secs(), 2 * u64::from(u32::MAX));
    }

    #[test]
    fn rejects_empty_pattern() {
        let p = BreathingProtocol::new("empty", "Empty", &[], 60);
        assert!(matches!(p.validate(), Err(ProtocolError::EmptyPattern { .. })));
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut p = box_breathing();
        p.phases.pop();
        assert_eq!(
            p.validate(),
            Err(ProtocolError::LengthMismatch {
                id: "box".into(),
                pattern: 4,
                phases: 3,
            })
        );
    }

    #[test]
    fn rejects_all_zero_pattern() {
        let p = BreathingProtocol::new("zero", "Zero", &[("Inhale", 0), ("Exhale", 0)], 60);
        assert!(matches!(p.validate(), Err(ProtocolError::AllZeroPattern { .. })));
    }

    #[test]
    fn rejects_zero_session_duration() {
        let p = box_breathing().with_session_duration(0);
        assert!(matches!(
            p.validate(),
            Err(ProtocolError::ZeroSessionDuration { .. })
        ));
    }

    #[test]
    fn zero_length_phase_is_allowed() {
        let p = BreathingProtocol::new("gap", "Gap", &[("Inhale", 4), ("Rest", 0)], 60);
        assert_eq!(p.validate(), Ok(()));
    }

    #[test]
    fn presentation_metadata_is_optional_in_toml() {
        let p: BreathingProtocol = toml::from_str(
            r#"
            id = "mine"
            name = "Mine"
            pattern = [3, 3]
            phases = ["Inhale", "Exhale"]
            session_duration = 90
            "#,
        )
        .unwrap();
        assert_eq!(p.color, "");
        assert_eq!(p.phase_label(1), Some("Exhale"));
    }
}
