use chrono::{Local, NaiveDateTime, TimeDelta};
use tokio::time::Instant;

use super::aggregate::{AppUsage, aggregate};
use super::provider::{MetricsProvider, ProviderError};
use super::resolver::{Selector, resolve};

/// One tick's worth of system-wide and per-application figures.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamp: NaiveDateTime,
    pub system_cpu_percent: f64,
    pub system_memory_percent: f64,
    pub network_bytes_sent: u64,
    pub network_bytes_recv: u64,
    pub app_a_cpu_percent: f64,
    pub app_a_memory_percent: f64,
    pub app_b_cpu_percent: f64,
    pub app_b_memory_percent: f64,
}

/// Local wall clock read once, then advanced with the monotonic clock so
/// successive timestamps never go backwards.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    wall: NaiveDateTime,
    mono: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self::start()
    }
}

impl WallClock {
    pub fn start() -> Self {
        Self::anchored_at(Local::now().naive_local())
    }

    pub fn anchored_at(wall: NaiveDateTime) -> Self {
        WallClock {
            wall,
            mono: Instant::now(),
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        TimeDelta::from_std(self.mono.elapsed())
            .ok()
            .and_then(|delta| self.wall.checked_add_signed(delta))
            .unwrap_or(self.wall)
    }
}

/// Assembles snapshots for a foreground/background application pair.
#[derive(Debug)]
pub struct SnapshotBuilder {
    foreground: Selector,
    background: Selector,
    clock: WallClock,
}

impl SnapshotBuilder {
    pub fn new(foreground: Selector, background: Selector, clock: WallClock) -> Self {
        SnapshotBuilder {
            foreground,
            background,
            clock,
        }
    }

    pub fn foreground(&self) -> &Selector {
        &self.foreground
    }

    pub fn background(&self) -> &Selector {
        &self.background
    }

    /// Reads everything for one tick. Any fatal provider error aborts the
    /// whole snapshot; nothing partial is returned.
    pub fn build<P: MetricsProvider + ?Sized>(
        &self,
        provider: &mut P,
    ) -> Result<Snapshot, ProviderError> {
        let _build_span = tracing::debug_span!("snapshot.build").entered();

        let timestamp = self.clock.now();
        provider.refresh()?;

        let system_cpu_percent = provider.system_cpu_percent()?;
        let system_memory_percent = provider.virtual_memory()?.used_percent();
        let network = provider.network_counters()?;

        let app_a = self.usage_of(provider, &self.foreground)?;
        let app_b = self.usage_of(provider, &self.background)?;

        Ok(Snapshot {
            timestamp,
            system_cpu_percent,
            system_memory_percent,
            network_bytes_sent: network.bytes_sent,
            network_bytes_recv: network.bytes_recv,
            app_a_cpu_percent: app_a.cpu_percent,
            app_a_memory_percent: app_a.memory_percent,
            app_b_cpu_percent: app_b.cpu_percent,
            app_b_memory_percent: app_b.memory_percent,
        })
    }

    fn usage_of<P: MetricsProvider + ?Sized>(
        &self,
        provider: &mut P,
        selector: &Selector,
    ) -> Result<AppUsage, ProviderError> {
        let resolution = resolve(provider, selector)?;
        let usage = aggregate(provider, resolution.matched)?;
        tracing::debug!(
            selector = selector.pattern(),
            counted = usage.counted,
            skipped = usage.skipped.len() + resolution.skipped.len(),
            cpu = usage.cpu_percent,
            "application aggregated"
        );
        Ok(usage)
    }
}
