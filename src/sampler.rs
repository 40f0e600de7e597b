use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::SamplingSettings;
use crate::report::ProgressReporter;
use crate::session::{FlushReport, Session, SessionError};
use crate::system::provider::{MetricsProvider, ProviderError};
use crate::system::snapshot::{SnapshotBuilder, WallClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Requests a cooperative stop. The loop notices it before starting the
/// next tick; a snapshot that is already being built is finished and kept.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Lifecycle and stop flag of one run.
#[derive(Debug)]
pub struct RunState {
    phase: Phase,
    // Held here so `stop_rx.changed()` can never observe a closed channel.
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        RunState {
            phase: Phase::Idle,
            stop_tx: Arc::new(tx),
            stop_rx: rx,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    fn enter(&mut self, next: Phase) {
        tracing::debug!(from = ?self.phase, to = ?next, "sampler phase");
        self.phase = next;
    }
}

#[derive(Debug)]
pub enum StopReason {
    /// A stop was requested (signal or operator).
    Interrupted,
    /// The configured sample limit was reached.
    Completed,
    /// The provider could not produce a snapshot.
    Fatal(ProviderError),
}

impl StopReason {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StopReason::Fatal(_))
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub stop: StopReason,
    pub samples: usize,
    pub flush: Result<FlushReport, SessionError>,
}

/// Drives one sampling session from priming to the final flush.
///
/// The first tick comes one interval after priming; later ticks are spaced
/// `settings.interval` apart measured from tick start. Every
/// way out of `Running` goes through a single flush of what was collected.
/// An `Err` is returned only when priming fails, before any sample exists.
pub async fn run<P, R>(
    provider: &mut P,
    settings: &SamplingSettings,
    state: &mut RunState,
    reporter: &mut R,
) -> Result<RunOutcome, ProviderError>
where
    P: MetricsProvider + ?Sized,
    R: ProgressReporter + ?Sized,
{
    provider.prime()?;
    let builder = SnapshotBuilder::new(
        settings.foreground.clone(),
        settings.background.clone(),
        WallClock::start(),
    );
    let mut session = Session::new(settings.interval);

    // First tick: one interval after priming, never sooner than the warmup.
    let first_tick = Instant::now() + settings.interval.max(provider.warmup());
    let mut ticker = tokio::time::interval_at(first_tick, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    state.enter(Phase::Running);

    let stop = loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = state.stop_rx.changed() => {}
        }
        if state.stop_requested() {
            tracing::info!(samples = session.len(), "stop requested");
            break StopReason::Interrupted;
        }

        let built = {
            let _tick_span =
                tracing::debug_span!("sampler.tick", sample = session.len() + 1).entered();
            builder.build(provider)
        };
        match built {
            Ok(snapshot) => {
                let system_cpu = snapshot.system_cpu_percent;
                session.append(snapshot);
                let samples = session.len();
                if samples.is_multiple_of(settings.progress_every) {
                    reporter.progress(samples, system_cpu);
                }
            }
            Err(err) => {
                tracing::error!(error = %err, samples = session.len(), "snapshot failed");
                break StopReason::Fatal(err);
            }
        }

        if let Some(max) = settings.max_samples
            && session.len() >= max
        {
            break StopReason::Completed;
        }
    };

    state.enter(Phase::Stopping);
    let samples = session.len();
    let flush = session.flush(&settings.output);
    if let Err(err) = &flush {
        tracing::error!(error = %err, "flush failed");
    }
    state.enter(Phase::Stopped);

    Ok(RunOutcome {
        stop,
        samples,
        flush,
    })
}
