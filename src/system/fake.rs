use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use super::provider::{
    MetricsProvider, NetworkCounters, Probe, ProcessEntry, ProcessHandle, ProviderError,
    SkipReason, VirtualMemory,
};

pub const FAKE_TOTAL_MEMORY: u64 = 16 * 1024 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FakeProcess {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    hidden: Option<SkipReason>,
    vanishes: Option<SkipReason>,
}

impl FakeProcess {
    pub fn new(pid: u32, name: &str, cpu_percent: f64, memory_bytes: u64) -> Self {
        Self {
            pid,
            name: name.to_string(),
            cpu_percent,
            memory_bytes,
            hidden: None,
            vanishes: None,
        }
    }

    /// Enumeration reports the entry as uninspectable.
    pub fn hidden(mut self, reason: SkipReason) -> Self {
        self.hidden = Some(reason);
        self
    }

    /// Enumeration succeeds but every later read is skipped.
    pub fn vanishing(mut self, reason: SkipReason) -> Self {
        self.vanishes = Some(reason);
        self
    }
}

type RefreshHook = Box<dyn FnMut(usize) + Send>;

/// Scriptable in-memory provider for tests and benches.
pub struct FakeProvider {
    table: Vec<FakeProcess>,
    schedule: BTreeMap<usize, Vec<FakeProcess>>,
    system_cpu: f64,
    memory: VirtualMemory,
    network: NetworkCounters,
    network_step: u64,
    refreshes: usize,
    warmup: Duration,
    primed_at: Option<Instant>,
    first_refresh_at: Option<Instant>,
    unsupported: bool,
    fail_on_refresh: Option<(usize, String)>,
    on_refresh: Option<RefreshHook>,
}

impl FakeProvider {
    pub fn new(table: Vec<FakeProcess>) -> Self {
        Self {
            table,
            schedule: BTreeMap::new(),
            system_cpu: 12.5,
            memory: VirtualMemory {
                total_bytes: FAKE_TOTAL_MEMORY,
                used_bytes: FAKE_TOTAL_MEMORY / 4,
            },
            network: NetworkCounters::default(),
            network_step: 1_500,
            refreshes: 0,
            warmup: Duration::ZERO,
            primed_at: None,
            first_refresh_at: None,
            unsupported: false,
            fail_on_refresh: None,
            on_refresh: None,
        }
    }

    pub fn with_system_cpu(mut self, percent: f64) -> Self {
        self.system_cpu = percent;
        self
    }

    pub fn with_memory(mut self, memory: VirtualMemory) -> Self {
        self.memory = memory;
        self
    }

    /// Replaces the process table from the given refresh (1-based) onwards.
    pub fn table_from(mut self, refresh: usize, table: Vec<FakeProcess>) -> Self {
        self.schedule.insert(refresh, table);
        self
    }

    /// The given refresh (1-based) fails with a fatal provider error.
    pub fn fail_on_refresh(mut self, refresh: usize, message: &str) -> Self {
        self.fail_on_refresh = Some((refresh, message.to_string()));
        self
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn unsupported(mut self) -> Self {
        self.unsupported = true;
        self
    }

    /// Runs after every successful refresh with the refresh count.
    pub fn on_refresh(mut self, hook: impl FnMut(usize) + Send + 'static) -> Self {
        self.on_refresh = Some(Box::new(hook));
        self
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }

    pub fn is_primed(&self) -> bool {
        self.primed_at.is_some()
    }

    /// Time between `prime` and the first `refresh`, once both happened.
    pub fn first_refresh_gap(&self) -> Option<Duration> {
        Some(self.first_refresh_at? - self.primed_at?)
    }

    fn find(&self, process: &ProcessHandle) -> Result<&FakeProcess, SkipReason> {
        let found = self
            .table
            .iter()
            .find(|p| p.pid == process.pid && p.name == process.name)
            .ok_or(SkipReason::Exited)?;
        match found.vanishes.or(found.hidden) {
            Some(reason) => Err(reason),
            None => Ok(found),
        }
    }
}

impl MetricsProvider for FakeProvider {
    fn prime(&mut self) -> Result<(), ProviderError> {
        if self.unsupported {
            return Err(ProviderError::Unsupported);
        }
        self.primed_at = Some(Instant::now());
        Ok(())
    }

    fn warmup(&self) -> Duration {
        self.warmup
    }

    fn refresh(&mut self) -> Result<(), ProviderError> {
        self.refreshes += 1;
        self.first_refresh_at.get_or_insert_with(Instant::now);
        if let Some((at, message)) = &self.fail_on_refresh
            && *at == self.refreshes
        {
            return Err(ProviderError::Other(message.clone()));
        }
        if let Some(table) = self.schedule.remove(&self.refreshes) {
            self.table = table;
        }
        self.network.bytes_sent += self.network_step;
        self.network.bytes_recv += self.network_step * 2;
        if let Some(hook) = self.on_refresh.as_mut() {
            hook(self.refreshes);
        }
        Ok(())
    }

    fn processes(&mut self) -> Result<Vec<ProcessEntry>, ProviderError> {
        Ok(self
            .table
            .iter()
            .map(|p| match p.hidden {
                Some(reason) => ProcessEntry::Hidden { pid: p.pid, reason },
                None => ProcessEntry::Visible(ProcessHandle::new(p.pid, p.name.clone())),
            })
            .collect())
    }

    fn process_cpu_percent(
        &mut self,
        process: &ProcessHandle,
    ) -> Result<Probe<f64>, ProviderError> {
        Ok(match self.find(process) {
            Ok(p) => Probe::Value(p.cpu_percent),
            Err(reason) => Probe::Skipped(reason),
        })
    }

    fn process_memory_bytes(
        &mut self,
        process: &ProcessHandle,
    ) -> Result<Probe<u64>, ProviderError> {
        Ok(match self.find(process) {
            Ok(p) => Probe::Value(p.memory_bytes),
            Err(reason) => Probe::Skipped(reason),
        })
    }

    fn system_cpu_percent(&mut self) -> Result<f64, ProviderError> {
        Ok(self.system_cpu)
    }

    fn virtual_memory(&mut self) -> Result<VirtualMemory, ProviderError> {
        if self.memory.total_bytes == 0 {
            return Err(ProviderError::MemoryUnavailable);
        }
        Ok(self.memory)
    }

    fn network_counters(&mut self) -> Result<NetworkCounters, ProviderError> {
        Ok(self.network)
    }
}
