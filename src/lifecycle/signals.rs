//! Operator stop requests.
//!
//! # Responsibilities
//! - Listen for Ctrl+C
//! - Read operator commands from stdin (`q` stops the server)
//! - Report whichever comes first
//!
//! Console input is read on a detached OS thread and handed over through a
//! channel. A blocking stdin read cannot be cancelled, and a detached thread
//! does not keep the process alive once `main` returns.

use std::io::BufRead;

use tokio::sync::mpsc;

/// Command the operator types to stop the server.
pub const QUIT_COMMAND: &str = "q";

/// What asked the server to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopRequest {
    Interrupt,
    QuitCommand,
}

/// Stream stdin line by line. The channel closes at end of input.
pub fn console_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Console read failed");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "Failed to start console reader");
    }
    rx
}

/// Wait until a line equal to `q` arrives. Returns `false` once input ends.
pub async fn wait_for_quit_command(lines: &mut mpsc::UnboundedReceiver<String>) -> bool {
    while let Some(line) = lines.recv().await {
        if line.trim() == QUIT_COMMAND {
            return true;
        }
        tracing::debug!(command = %line.trim(), "Unknown console command");
    }
    false
}

/// Wait for Ctrl+C or the `q` console command.
pub async fn wait_for_stop_request() -> StopRequest {
    let mut lines = console_lines();
    let console = async {
        if wait_for_quit_command(&mut lines).await {
            StopRequest::QuitCommand
        } else {
            tracing::debug!("Console closed, waiting for Ctrl+C");
            wait_for_interrupt().await;
            StopRequest::Interrupt
        }
    };

    tokio::select! {
        _ = wait_for_interrupt() => StopRequest::Interrupt,
        request = console => request,
    }
}

async fn wait_for_interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
