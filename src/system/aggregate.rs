use super::provider::{MetricsProvider, Probe, ProcessHandle, ProviderError, SkipReason};

/// Summed usage of one application's processes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    /// Processes that contributed to the sums.
    pub counted: usize,
    /// Processes excluded because a read failed, with the reason.
    pub skipped: Vec<(u32, SkipReason)>,
}

/// Sums CPU and resident-memory share over `processes`.
///
/// A process whose CPU or memory read is skipped contributes nothing, so a
/// partially readable set still yields a result. Only fatal provider errors
/// are returned as `Err`.
pub fn aggregate<P: MetricsProvider + ?Sized>(
    provider: &mut P,
    processes: Vec<ProcessHandle>,
) -> Result<AppUsage, ProviderError> {
    let mut usage = AppUsage::default();
    if processes.is_empty() {
        return Ok(usage);
    }

    let total_memory = provider.virtual_memory()?.total_bytes;
    if total_memory == 0 {
        return Err(ProviderError::MemoryUnavailable);
    }

    for process in processes {
        let cpu = match provider.process_cpu_percent(&process)? {
            Probe::Value(cpu) => cpu,
            Probe::Skipped(reason) => {
                usage.skip(&process, reason);
                continue;
            }
        };
        let rss = match provider.process_memory_bytes(&process)? {
            Probe::Value(rss) => rss,
            Probe::Skipped(reason) => {
                usage.skip(&process, reason);
                continue;
            }
        };
        usage.cpu_percent += cpu;
        usage.memory_percent += rss as f64 / total_memory as f64 * 100.0;
        usage.counted += 1;
    }

    Ok(usage)
}

impl AppUsage {
    fn skip(&mut self, process: &ProcessHandle, reason: SkipReason) {
        tracing::trace!(pid = process.pid, name = %process.name, %reason, "process skipped");
        self.skipped.push((process.pid, reason));
    }
}
