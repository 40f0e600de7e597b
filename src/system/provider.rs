use std::fmt;
use std::time::Duration;

/// Why a single process was left out of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The process exited between enumeration and the read.
    Exited,
    AccessDenied,
    Zombie,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipReason::Exited => "exited",
            SkipReason::AccessDenied => "access denied",
            SkipReason::Zombie => "zombie",
        };
        f.write_str(label)
    }
}

/// Outcome of a per-process read. A skipped process is not an error: it is
/// excluded from whatever the caller is computing.
#[derive(Debug, Clone, PartialEq)]
pub enum Probe<T> {
    Value(T),
    Skipped(SkipReason),
}

impl<T> Probe<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Probe::Value(v) => Some(v),
            Probe::Skipped(_) => None,
        }
    }
}

/// Failures that make a whole snapshot impossible.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("process metrics are not supported on this platform")]
    Unsupported,
    #[error("total physical memory reported as zero")]
    MemoryUnavailable,
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Other(String),
}

/// A process observed during the current tick.
///
/// Handles are produced fresh by every enumeration and consumed by the
/// aggregator in the same tick. PIDs get reused, so a handle is never kept
/// for a later tick; it deliberately does not implement `Clone`.
#[derive(Debug, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    pub name: String,
}

impl ProcessHandle {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }
}

/// An enumerated process table entry. Entries that could not be inspected
/// still carry their pid so the skip can be attributed.
#[derive(Debug)]
pub enum ProcessEntry {
    Visible(ProcessHandle),
    Hidden { pid: u32, reason: SkipReason },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualMemory {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

impl VirtualMemory {
    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64 * 100.0
    }
}

/// Cumulative byte counters since boot, summed over all interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// The OS-facing source of raw metrics.
///
/// CPU readings are deltas since the previous `refresh`; `prime` establishes
/// the first baseline without blocking. Everything else reads the state
/// captured by the latest `refresh`.
pub trait MetricsProvider {
    fn prime(&mut self) -> Result<(), ProviderError>;

    /// Shortest gap between `prime` and the first `refresh` for CPU deltas
    /// to mean anything.
    fn warmup(&self) -> Duration {
        Duration::ZERO
    }

    /// Samples OS counters for the current tick.
    fn refresh(&mut self) -> Result<(), ProviderError>;

    fn processes(&mut self) -> Result<Vec<ProcessEntry>, ProviderError>;

    fn process_cpu_percent(&mut self, process: &ProcessHandle)
    -> Result<Probe<f64>, ProviderError>;

    fn process_memory_bytes(&mut self, process: &ProcessHandle)
    -> Result<Probe<u64>, ProviderError>;

    fn system_cpu_percent(&mut self) -> Result<f64, ProviderError>;

    fn virtual_memory(&mut self) -> Result<VirtualMemory, ProviderError>;

    fn network_counters(&mut self) -> Result<NetworkCounters, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_percent_handles_zero_total() {
        let mem = VirtualMemory {
            total_bytes: 0,
            used_bytes: 10,
        };
        assert_eq!(mem.used_percent(), 0.0);
    }

    #[test]
    fn used_percent_is_ratio() {
        let mem = VirtualMemory {
            total_bytes: 400,
            used_bytes: 100,
        };
        assert!((mem.used_percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn probe_value_drops_skips() {
        assert_eq!(Probe::Value(3u64).value(), Some(3));
        assert_eq!(Probe::<u64>::Skipped(SkipReason::Zombie).value(), None);
    }
}
