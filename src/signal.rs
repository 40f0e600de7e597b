use tokio::sync::mpsc;

use crate::sampler::StopHandle;

/// Exit status used when a second signal abandons the run.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Spawns tasks that turn the first SIGINT or SIGTERM (Ctrl+C elsewhere)
/// into a stop request. A second signal exits the process at once without
/// saving, for when the current tick never finishes.
pub fn install(handle: StopHandle) -> std::io::Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::spawn(async move {
            loop {
                let name = tokio::select! {
                    _ = interrupt.recv() => "SIGINT",
                    _ = terminate.recv() => "SIGTERM",
                };
                if tx.send(name).is_err() {
                    break;
                }
            }
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if tx.send("ctrl-c").is_err() {
                    break;
                }
            }
        });
    }

    tokio::spawn(async move {
        if escalate(rx, handle).await.is_some() {
            eprintln!("Second signal received, exiting without saving.");
            std::process::exit(FORCED_EXIT_CODE);
        }
    });

    Ok(())
}

/// Requests a stop on the first signal and returns the name of the second
/// one, or `None` if the signal source goes away first.
async fn escalate(
    mut signals: mpsc::UnboundedReceiver<&'static str>,
    handle: StopHandle,
) -> Option<&'static str> {
    let first = signals.recv().await?;
    tracing::info!(signal = first, "shutdown signal received");
    println!("\n\nShutting down gracefully... (press Ctrl+C again to exit immediately)");
    handle.request_stop();

    let second = signals.recv().await?;
    tracing::warn!(signal = second, "second shutdown signal, abandoning run");
    Some(second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::RunState;

    #[tokio::test]
    async fn first_signal_only_requests_a_stop() {
        let state = RunState::new();
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send("SIGINT").unwrap();
        drop(tx);

        assert_eq!(escalate(rx, state.stop_handle()).await, None);
        assert!(state.stop_requested());
    }

    #[tokio::test]
    async fn second_signal_escalates() {
        let state = RunState::new();
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send("SIGINT").unwrap();
        tx.send("SIGTERM").unwrap();

        assert_eq!(escalate(rx, state.stop_handle()).await, Some("SIGTERM"));
        assert!(state.stop_requested());
    }

    #[tokio::test]
    async fn no_signal_leaves_the_run_alone() {
        let state = RunState::new();
        let (tx, rx) = mpsc::unbounded_channel::<&'static str>();
        drop(tx);

        assert_eq!(escalate(rx, state.stop_handle()).await, None);
        assert!(!state.stop_requested());
    }
}
