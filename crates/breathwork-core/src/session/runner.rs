//! Tick scheduling for a single breathing session.
//!
//! Exactly one tick task exists while the engine is running. Pausing aborts
//! it and resuming spawns a fresh one whose first tick is a full interval
//! away, so nothing is replayed. `end()`, `start()` and `Drop` abort the task
//! as well; `end()` and `start()` also await it before touching the engine,
//! and the task re-checks the engine generation under the lock, so a tick
//! can never land on a reset session.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::collaborators::{AmbientAudio, SessionRecorder};
use crate::engine::{PhaseEngine, SessionSnapshot, SessionSummary};
use crate::error::{CollaboratorError, ProtocolError};
use crate::events::Event;
use crate::protocol::BreathingProtocol;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub tick_interval: Duration,
    /// Manually ended sessions shorter than this are not recorded.
    pub min_record_secs: u32,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            min_record_secs: 10,
        }
    }
}

/// State shared between the runner and its tick task.
struct Shared {
    recorder: Arc<dyn SessionRecorder>,
    audio: Arc<dyn AmbientAudio>,
    snapshots: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<Event>,
    min_record_secs: u32,
    /// In-flight recorder calls, kept only so a host can drain them on exit.
    pending: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    fn publish(&self, snapshot: SessionSnapshot) {
        self.snapshots.send_replace(snapshot);
    }

    fn dispatch(&self, events: Vec<Event>) {
        for event in events {
            match &event {
                Event::SessionCompleted { summary, .. } => {
                    info!(
                        protocol = %summary.protocol_id,
                        cycles = summary.cycles,
                        "session completed"
                    );
                    self.record(summary.clone());
                }
                Event::SessionEnded { summary, .. } => {
                    info!(
                        protocol = %summary.protocol_id,
                        elapsed = summary.completed_secs,
                        "session ended"
                    );
                    if summary.completed || summary.completed_secs >= self.min_record_secs {
                        self.record(summary.clone());
                    } else {
                        debug!(
                            elapsed = summary.completed_secs,
                            min = self.min_record_secs,
                            "session too short to record"
                        );
                    }
                }
                _ => debug!(?event, "engine event"),
            }
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }

    /// Fire-and-forget; the result never reaches the engine.
    fn record(&self, summary: SessionSummary) {
        let recorder = Arc::clone(&self.recorder);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            if let Err(err) = recorder.record(summary).await {
                notify_failure(&events, "recorder", &err);
            }
        });
        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    /// Start or stop ambient audio when "running" flips.
    fn sync_audio(&self, was_running: bool, is_running: bool) {
        let result = match (was_running, is_running) {
            (false, true) => self.audio.start(),
            (true, false) => self.audio.stop(),
            _ => return,
        };
        if let Err(err) = result {
            notify_failure(&self.events, "audio", &err);
        }
    }
}

fn notify_failure(events: &broadcast::Sender<Event>, collaborator: &str, err: &CollaboratorError) {
    warn!(collaborator, error = %err, "collaborator failed; session unaffected");
    let _ = events.send(Event::CollaboratorFailed {
        collaborator: collaborator.to_string(),
        message: err.to_string(),
        at: Utc::now(),
    });
}

/// Owns a [`PhaseEngine`] and the task that ticks it.
pub struct SessionRunner {
    engine: Arc<Mutex<PhaseEngine>>,
    ticker: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
    tick_interval: Duration,
}

impl SessionRunner {
    pub fn new(
        recorder: Arc<dyn SessionRecorder>,
        audio: Arc<dyn AmbientAudio>,
        options: RunnerOptions,
    ) -> Self {
        let (snapshots, _) = watch::channel(SessionSnapshot::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            engine: Arc::new(Mutex::new(PhaseEngine::new())),
            ticker: None,
            shared: Arc::new(Shared {
                recorder,
                audio,
                snapshots,
                events,
                min_record_secs: options.min_record_secs,
                pending: std::sync::Mutex::new(Vec::new()),
            }),
            tick_interval: options.tick_interval,
        }
    }

    /// Latest snapshot, updated after every command and tick.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.shared.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.engine.lock().await.snapshot()
    }

    /// Start `protocol`, ending (and possibly recording) any session in progress.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] for a malformed protocol; the running
    /// session, if any, keeps running in that case.
    pub async fn start(&mut self, protocol: BreathingProtocol) -> Result<(), ProtocolError> {
        protocol.validate()?;
        self.cancel_ticker().await;

        let (events, snapshot, was_running, generation) = {
            let mut engine = self.engine.lock().await;
            let was_running = engine.is_running();
            let mut events: Vec<Event> = engine.end().into_iter().collect();
            events.extend(engine.start(protocol)?);
            (events, engine.snapshot(), was_running, engine.generation())
        };

        info!(protocol = ?snapshot.protocol_id, "session started");
        self.shared.publish(snapshot);
        self.shared.dispatch(events);
        self.shared.sync_audio(was_running, true);
        self.spawn_ticker(generation);
        Ok(())
    }

    /// Pause a running session or resume a paused one. No-op when idle.
    pub async fn toggle_pause(&mut self) -> Option<Event> {
        self.cancel_ticker().await;

        let (event, snapshot, generation) = {
            let mut engine = self.engine.lock().await;
            let event = engine.toggle_pause()?;
            (event, engine.snapshot(), engine.generation())
        };

        let running = snapshot.state.is_running();
        self.shared.publish(snapshot);
        self.shared.dispatch(vec![event.clone()]);
        self.shared.sync_audio(!running, running);
        if running {
            self.spawn_ticker(generation);
        }
        Some(event)
    }

    /// Hard reset. Safe to call repeatedly.
    pub async fn end(&mut self) -> Option<Event> {
        self.cancel_ticker().await;

        let (event, snapshot, was_running) = {
            let mut engine = self.engine.lock().await;
            let was_running = engine.is_running();
            (engine.end(), engine.snapshot(), was_running)
        };

        self.shared.publish(snapshot);
        if let Some(event) = &event {
            self.shared.dispatch(vec![event.clone()]);
        }
        self.shared.sync_audio(was_running, false);
        event
    }

    /// Resolve once no session is active (completed, ended, or never started).
    pub async fn wait_until_idle(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|snapshot| !snapshot.state.is_active()).await;
    }

    /// Wait up to `timeout` for recorder calls still in flight.
    ///
    /// Meant for host shutdown; nothing inside the runner waits on them.
    /// Returns `false` if the timeout expired first.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let handles: Vec<JoinHandle<()>> = match self.shared.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return false,
        };
        time::timeout(timeout, async {
            for handle in handles {
                let _ = handle.await;
            }
        })
        .await
        .is_ok()
    }

    fn spawn_ticker(&mut self, generation: u64) {
        let engine = Arc::clone(&self.engine);
        let shared = Arc::clone(&self.shared);
        let period = self.tick_interval;

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;

                let (events, snapshot) = {
                    let mut guard = engine.lock().await;
                    if guard.generation() != generation || !guard.is_running() {
                        break;
                    }
                    (guard.tick(), guard.snapshot())
                };

                let finished = !snapshot.state.is_running();
                shared.dispatch(events);
                if finished {
                    shared.sync_audio(true, false);
                }
                shared.publish(snapshot);
                if finished {
                    break;
                }
            }
        }));
    }

    async fn cancel_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
            // Cancelled or already finished; either way it no longer runs.
            let _ = handle.await;
        }
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SilentAudio;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct ChannelRecorder(mpsc::UnboundedSender<SessionSummary>);

    #[async_trait::async_trait]
    impl SessionRecorder for ChannelRecorder {
        async fn record(&self, summary: SessionSummary) -> Result<(), CollaboratorError> {
            let _ = self.0.send(summary);
            Ok(())
        }
    }

    struct FailingRecorder(AtomicUsize);

    #[async_trait::async_trait]
    impl SessionRecorder for FailingRecorder {
        async fn record(&self, _summary: SessionSummary) -> Result<(), CollaboratorError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(CollaboratorError::Recorder("backend offline".into()))
        }
    }

    #[derive(Default)]
    struct CountingAudio {
        starts: AtomicUsize,
        stops: AtomicUsize,
        fail: bool,
    }

    impl AmbientAudio for CountingAudio {
        fn start(&self) -> Result<(), CollaboratorError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CollaboratorError::Audio("no output device".into()));
            }
            Ok(())
        }

        fn stop(&self) -> Result<(), CollaboratorError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn box_protocol() -> BreathingProtocol {
        BreathingProtocol::new(
            "box",
            "Box",
            &[("Inhale", 4), ("Hold", 4), ("Exhale", 4), ("Hold", 4)],
            12,
        )
    }

    fn options(min_record_secs: u32) -> RunnerOptions {
        RunnerOptions {
            tick_interval: Duration::from_secs(1),
            min_record_secs,
        }
    }

    fn channel_runner(min_record_secs: u32) -> (SessionRunner, mpsc::UnboundedReceiver<SessionSummary>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = SessionRunner::new(
            Arc::new(ChannelRecorder(tx)),
            Arc::new(SilentAudio),
            options(min_record_secs),
        );
        (runner, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_completion_and_records_once() {
        let (mut runner, mut records) = channel_runner(10);
        runner.start(box_protocol()).await.unwrap();
        runner.wait_until_idle().await;

        let snap = runner.snapshot().await;
        assert_eq!(snap.state.session_time_elapsed, 12);
        assert_eq!(snap.state.current_phase_index, 3);
        assert!(snap.is_complete);

        let summary = records.recv().await.unwrap();
        assert!(summary.completed);
        assert_eq!(summary.completed_secs, 12);
        assert_eq!(summary.protocol_id, "box");

        // Completion already recorded; ending afterwards does not record again.
        assert!(runner.end().await.is_none());
        tokio::task::yield_now().await;
        assert!(records.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_suspends_ticks_without_replay() {
        let (mut runner, _records) = channel_runner(10);
        runner.start(box_protocol()).await.unwrap();

        time::sleep(Duration::from_millis(2500)).await;
        assert!(matches!(
            runner.toggle_pause().await,
            Some(Event::SessionPaused { elapsed_secs: 2, .. })
        ));

        time::sleep(Duration::from_secs(30)).await;
        let snap = runner.snapshot().await;
        assert_eq!(snap.state.session_time_elapsed, 2);
        assert!(snap.state.is_paused());

        runner.toggle_pause().await;
        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(runner.snapshot().await.state.session_time_elapsed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn end_cancels_pending_ticks() {
        let (mut runner, mut records) = channel_runner(10);
        runner.start(box_protocol()).await.unwrap();
        time::sleep(Duration::from_millis(1500)).await;

        let ended = runner.end().await;
        assert!(matches!(ended, Some(Event::SessionEnded { .. })));

        time::sleep(Duration::from_secs(5)).await;
        let snap = runner.snapshot().await;
        assert_eq!(snap.state, crate::engine::SessionState::default());

        // One second is below the recording threshold.
        tokio::task::yield_now().await;
        assert!(records.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_end_records_meaningful_sessions() {
        let (mut runner, mut records) = channel_runner(3);
        runner.start(box_protocol()).await.unwrap();
        time::sleep(Duration::from_millis(5500)).await;
        runner.end().await;

        assert!(runner.flush(Duration::from_secs(1)).await);
        let summary = records.try_recv().unwrap();
        assert!(!summary.completed);
        assert_eq!(summary.completed_secs, 5);
        assert_eq!(summary.cycles, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_records_the_replaced_session() {
        let (mut runner, mut records) = channel_runner(2);
        runner.start(box_protocol()).await.unwrap();
        time::sleep(Duration::from_millis(3500)).await;

        runner
            .start(box_protocol().with_session_duration(60))
            .await
            .unwrap();
        let replaced = records.recv().await.unwrap();
        assert_eq!(replaced.completed_secs, 3);

        let snap = runner.snapshot().await;
        assert_eq!(snap.state.session_time_elapsed, 0);
        assert!(snap.state.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_protocol_leaves_running_session_alone() {
        let (mut runner, _records) = channel_runner(10);
        runner.start(box_protocol()).await.unwrap();
        time::sleep(Duration::from_millis(1500)).await;

        let zero = BreathingProtocol::new("zero", "Zero", &[("Inhale", 0)], 30);
        assert!(runner.start(zero).await.is_err());

        time::sleep(Duration::from_secs(1)).await;
        let snap = runner.snapshot().await;
        assert_eq!(snap.protocol_id.as_deref(), Some("box"));
        assert_eq!(snap.state.session_time_elapsed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_recorder_does_not_affect_session() {
        let recorder = Arc::new(FailingRecorder(AtomicUsize::new(0)));
        let mut runner = SessionRunner::new(recorder.clone(), Arc::new(SilentAudio), options(10));
        let mut events = runner.events();

        runner.start(box_protocol()).await.unwrap();
        runner.wait_until_idle().await;

        let notice = loop {
            match events.recv().await.unwrap() {
                Event::CollaboratorFailed { collaborator, message, .. } => {
                    break (collaborator, message)
                }
                _ => continue,
            }
        };
        assert_eq!(notice.0, "recorder");
        assert!(notice.1.contains("backend offline"));
        assert_eq!(recorder.0.load(Ordering::SeqCst), 1);

        let snap = runner.snapshot().await;
        assert!(snap.is_complete);
        assert_eq!(snap.state.session_time_elapsed, 12);
    }

    #[tokio::test(start_paused = true)]
    async fn audio_follows_running_transitions() {
        let audio = Arc::new(CountingAudio::default());
        let mut runner = SessionRunner::new(Arc::new(crate::session::NoopRecorder), audio.clone(), options(10));

        runner.start(box_protocol()).await.unwrap();
        assert_eq!(audio.starts.load(Ordering::SeqCst), 1);

        runner.toggle_pause().await;
        assert_eq!(audio.stops.load(Ordering::SeqCst), 1);

        runner.toggle_pause().await;
        assert_eq!(audio.starts.load(Ordering::SeqCst), 2);

        runner.wait_until_idle().await;
        assert_eq!(audio.stops.load(Ordering::SeqCst), 2);

        // Already idle: no extra stop.
        runner.end().await;
        assert_eq!(audio.stops.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_audio_is_isolated() {
        let audio = Arc::new(CountingAudio {
            fail: true,
            ..CountingAudio::default()
        });
        let mut runner = SessionRunner::new(Arc::new(crate::session::NoopRecorder), audio, options(10));
        let mut events = runner.events();

        runner.start(box_protocol()).await.unwrap();
        assert!(runner.snapshot().await.state.is_running());

        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            if let Event::CollaboratorFailed { collaborator, .. } = event {
                saw_failure = collaborator == "audio";
            }
        }
        assert!(saw_failure);

        runner.wait_until_idle().await;
        assert!(runner.snapshot().await.is_complete);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_runner_commands_are_no_ops() {
        let (mut runner, _records) = channel_runner(10);
        assert!(runner.toggle_pause().await.is_none());
        assert!(runner.end().await.is_none());
        runner.wait_until_idle().await;
        assert_eq!(runner.snapshot().await, SessionSnapshot::default());
    }
}
