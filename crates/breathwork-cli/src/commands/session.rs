use std::sync::Arc;
use std::time::Duration;

use breathwork_core::engine::format_mm_ss;
use breathwork_core::{
    AmbientAudio, BreathingProtocol, CollaboratorError, Config, Database, Event, SessionRunner,
    SessionSnapshot, SessionSummary, SilentAudio, SqliteRecorder,
};
use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

/// How long to wait for the session log write before exiting.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a session in the foreground.
    ///
    /// Type "p" + Enter to pause or resume, "q" + Enter (or Ctrl-C) to end.
    Run {
        /// Protocol id (defaults to session.default_protocol)
        id: Option<String>,
        /// Override the protocol's session duration in seconds
        #[arg(long)]
        duration: Option<u32>,
        /// Print one JSON snapshot per line instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Ambient audio for a terminal: announces transitions on stderr.
struct TerminalAudio {
    volume: u32,
}

impl AmbientAudio for TerminalAudio {
    fn start(&self) -> Result<(), CollaboratorError> {
        eprintln!("[audio] playing (volume {}%)", self.volume);
        Ok(())
    }

    fn stop(&self) -> Result<(), CollaboratorError> {
        eprintln!("[audio] stopped");
        Ok(())
    }
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run { id, duration, json } => {
            let config = Config::load()?;
            let catalog = config.catalog();
            let id = id.unwrap_or_else(|| config.session.default_protocol.clone());
            let mut protocol = catalog.require(&id)?.clone();
            if let Some(secs) = duration {
                protocol = protocol.with_session_duration(secs);
            }
            protocol.validate()?;

            let db = Database::open()?;
            let audio: Arc<dyn AmbientAudio> = if config.audio.enabled && !json {
                Arc::new(TerminalAudio {
                    volume: config.audio.volume,
                })
            } else {
                Arc::new(SilentAudio)
            };

            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let result = rt.block_on(async {
                let runner = SessionRunner::new(
                    Arc::new(SqliteRecorder::new(db)),
                    audio,
                    config.runner_options(),
                );
                drive(runner, protocol, json).await
            });
            // stdin reads run on a blocking thread that cannot be cancelled.
            rt.shutdown_background();
            result
        }
    }
}

async fn drive(
    mut runner: SessionRunner,
    protocol: BreathingProtocol,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut events = runner.events();
    runner.start(protocol).await?;

    let mut snapshots = runner.subscribe();
    let first = snapshots.borrow_and_update().clone();
    render(&first, json)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut events_open = true;
    let mut summary: Option<SessionSummary> = None;
    let mut active = first.state.is_active();
    let mut listen_ctrl_c = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while active {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                render(&snapshot, json)?;
                active = snapshot.state.is_active();
            }
            signal = &mut ctrl_c, if listen_ctrl_c => {
                if let Err(err) = signal {
                    warn!(error = %err, "cannot listen for Ctrl-C");
                    listen_ctrl_c = false;
                    continue;
                }
                debug!("interrupted");
                if let Some(event) = runner.end().await {
                    summary = event.summary().cloned();
                }
                break;
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match line.trim() {
                        "p" | "pause" => {
                            runner.toggle_pause().await;
                        }
                        "q" | "quit" => {
                            if let Some(event) = runner.end().await {
                                summary = event.summary().cloned();
                            }
                            break;
                        }
                        _ => {}
                    },
                    _ => stdin_open = false,
                }
            }
            event = events.recv(), if events_open => {
                match event {
                    Ok(event) => note_event(&event, &mut summary),
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "event stream lagged"),
                    Err(RecvError::Closed) => events_open = false,
                }
            }
        }
    }

    loop {
        match events.try_recv() {
            Ok(event) => note_event(&event, &mut summary),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }

    if !runner.flush(FLUSH_TIMEOUT).await {
        eprintln!("warning: session log write did not finish");
    }

    if let Some(summary) = summary {
        if json {
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            let outcome = if summary.completed { "completed" } else { "ended" };
            println!(
                "{} {outcome}: {} of {} ({} cycles)",
                summary.protocol_name,
                format_mm_ss(summary.completed_secs),
                format_mm_ss(summary.target_secs),
                summary.cycles
            );
        }
    }
    Ok(())
}

fn note_event(event: &Event, summary: &mut Option<SessionSummary>) {
    match event {
        Event::CollaboratorFailed {
            collaborator,
            message,
            ..
        } => eprintln!("warning: {collaborator}: {message}"),
        Event::SessionCompleted { summary: s, .. } | Event::SessionEnded { summary: s, .. } => {
            *summary = Some(s.clone());
        }
        _ => {}
    }
}

fn render(snapshot: &SessionSnapshot, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }
    if !snapshot.state.is_active() {
        return Ok(());
    }

    let label = snapshot.phase_label.as_deref().unwrap_or("-");
    let paused = if snapshot.state.is_paused() { "  [paused]" } else { "" };
    println!(
        "{} / {}  {:<8} {:>2}s  cycle {:<3} {:>5.1}%{paused}",
        snapshot.elapsed_display,
        snapshot.remaining_display,
        label,
        snapshot.state.phase_time_left,
        snapshot.state.cycles + 1,
        snapshot.completion_pct,
    );
    Ok(())
}
