//! `cooldown run`: real-time session driven from stdin.

use std::io::Write;
use std::sync::Arc;

use cooldown_audio::AudioBackend;
use cooldown_core::CooldownConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::cli::RunOpts;
use crate::display::{parse_intent, status_line};
use crate::session::{Intent, Session, SessionHandle, SessionOptions, SessionSnapshot};

/// Entry point for `cooldown run`.
pub async fn cmd_run(
    config: CooldownConfig,
    backend: Arc<dyn AudioBackend>,
    opts: &RunOpts,
) -> anyhow::Result<()> {
    let options = SessionOptions {
        seed: opts.seed,
        epoch_ms: None,
    };
    let (session, mut handle) = Session::new(config, backend, options);
    let session_task = tokio::spawn(session.run());

    let intents = handle.intents.clone();
    let stdin_task = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_intent(&line) {
                    Ok(Some(intent)) => {
                        if intents.send(intent).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("\n{e}"),
                },
                Ok(None) => {
                    let _ = intents.send(Intent::Shutdown);
                    break;
                }
                Err(e) => {
                    tracing::warn!("stdin read failed: {e}");
                    let _ = intents.send(Intent::Shutdown);
                    break;
                }
            }
        }
    });

    eprintln!("commands: spike | audio [on|off] | vent <text> | dissolve | quit");

    let interrupted = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received ctrl-c, shutting down"),
            Err(e) => {
                tracing::warn!("ctrl-c handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    let mut stdout = std::io::stdout();
    let result = present(
        session_task,
        &mut handle,
        opts.events,
        interrupted,
        &mut stdout,
    )
    .await;
    stdin_task.abort();
    result.map(|_| ())
}

/// Print events or redraw the status line until the session task ends.
/// `interrupted` resolving asks the session to shut down.
async fn present(
    mut session_task: JoinHandle<SessionSnapshot>,
    handle: &mut SessionHandle,
    events: bool,
    interrupted: impl Future<Output = ()>,
    out: &mut impl Write,
) -> anyhow::Result<SessionSnapshot> {
    tokio::pin!(interrupted);
    let mut interrupt_pending = true;
    // Cleared once the session drops its snapshot sender.
    let mut snapshots_open = true;
    let last = loop {
        tokio::select! {
            result = &mut session_task => break result?,
            () = &mut interrupted, if interrupt_pending => {
                interrupt_pending = false;
                let _ = handle.intents.send(Intent::Shutdown);
            }
            Some(event) = handle.events.recv(), if events => {
                writeln!(out, "{}", serde_json::to_string(&event)?)?;
            }
            changed = handle.snapshots.changed(), if !events && snapshots_open => {
                if changed.is_err() {
                    snapshots_open = false;
                    continue;
                }
                let line = status_line(&handle.snapshots.borrow_and_update());
                write!(out, "\r\x1b[2K{line}")?;
                out.flush()?;
            }
        }
    };

    if events {
        while let Ok(event) = handle.events.try_recv() {
            writeln!(out, "{}", serde_json::to_string(&event)?)?;
        }
    } else {
        writeln!(out, "\r\x1b[2K{}", status_line(&last))?;
    }
    Ok(last)
}
