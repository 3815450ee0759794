//! Property tests for the phase engine invariants.
//!
//! Random valid protocols are driven through random sequences of ticks and
//! pause toggles; every observation must satisfy the state invariants.

use breathwork_core::{BreathingProtocol, EngineStatus, PhaseEngine, SessionState};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Tick,
    TogglePause,
}

fn protocol_strategy() -> impl Strategy<Value = BreathingProtocol> {
    (
        prop::collection::vec(0u32..8, 1..6).prop_filter("needs a non-zero phase", |p| {
            p.iter().any(|&secs| secs > 0)
        }),
        1u32..200,
    )
        .prop_map(|(pattern, session_duration)| {
            let steps: Vec<(String, u32)> = pattern
                .iter()
                .enumerate()
                .map(|(i, &secs)| (format!("Phase {i}"), secs))
                .collect();
            let refs: Vec<(&str, u32)> = steps.iter().map(|(l, s)| (l.as_str(), *s)).collect();
            BreathingProtocol::new("prop", "Prop", &refs, session_duration)
        })
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![8 => Just(Op::Tick), 1 => Just(Op::TogglePause)],
        0..400,
    )
}

proptest! {
    #[test]
    fn invariants_hold_for_every_observation(protocol in protocol_strategy(), ops in ops_strategy()) {
        let max_phase = protocol.max_phase_secs();
        let len = protocol.phase_count();
        let duration = protocol.session_duration;

        let mut engine = PhaseEngine::new();
        engine.start(protocol.clone()).unwrap();

        for op in ops {
            let before = engine.state();
            match op {
                Op::Tick => { engine.tick(); }
                Op::TogglePause => { engine.toggle_pause(); }
            }
            let after = engine.state();

            prop_assert!(after.phase_time_left <= max_phase);
            prop_assert!(after.current_phase_index < len);
            prop_assert!(after.session_time_elapsed <= duration);

            // A non-zero phase is never observed with zero time left.
            if after.is_active() {
                prop_assert!(after.phase_time_left >= 1);
                prop_assert!(after.phase_time_left <= protocol.pattern[after.current_phase_index]);
            }

            if before.status == EngineStatus::Running && matches!(op, Op::Tick) {
                prop_assert_eq!(after.session_time_elapsed, before.session_time_elapsed + 1);
            } else {
                prop_assert_eq!(after.session_time_elapsed, before.session_time_elapsed);
                prop_assert_eq!(after.current_phase_index, before.current_phase_index);
                prop_assert_eq!(after.cycles, before.cycles);
            }

            let cycle_delta = after.cycles - before.cycles;
            prop_assert!(cycle_delta <= 1);
            if after.current_phase_index < before.current_phase_index {
                prop_assert_eq!(cycle_delta, 1);
            }
            if cycle_delta == 1 {
                prop_assert!(after.current_phase_index <= before.current_phase_index);
            }

            prop_assert_eq!(engine.is_complete(), after.session_time_elapsed >= duration);
            if engine.is_complete() {
                prop_assert!(!after.is_active());
            }
        }
    }

    #[test]
    fn end_is_idempotent(protocol in protocol_strategy(), ticks in 0usize..100) {
        let mut engine = PhaseEngine::new();
        engine.start(protocol).unwrap();
        for _ in 0..ticks {
            engine.tick();
        }
        engine.end();
        let once = engine.state();
        engine.end();
        prop_assert_eq!(engine.state(), once);
        prop_assert_eq!(once, SessionState::default());
    }

    #[test]
    fn completes_after_exactly_session_duration_ticks(protocol in protocol_strategy()) {
        let duration = protocol.session_duration;
        let mut engine = PhaseEngine::new();
        engine.start(protocol).unwrap();
        for _ in 0..duration - 1 {
            engine.tick();
        }
        prop_assert!(engine.is_active());
        engine.tick();
        prop_assert!(!engine.is_active());
        prop_assert!(engine.is_complete());
        prop_assert_eq!(engine.completion_pct(), 100.0);
    }
}
