use std::time::Duration;

use sysinfo::{Networks, Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

use super::provider::{
    MetricsProvider, NetworkCounters, Probe, ProcessEntry, ProcessHandle, ProviderError,
    SkipReason, VirtualMemory,
};

/// `MetricsProvider` backed by `sysinfo`.
///
/// Per-process CPU is computed by sysinfo over the time between two process
/// refreshes, so one `refresh` per tick gives "percent since last tick".
pub struct Collector {
    sys: System,
    networks: Networks,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    pub fn new() -> Self {
        Collector {
            sys: System::new(),
            networks: Networks::new(),
        }
    }

    pub fn system(&self) -> &System {
        &self.sys
    }

    fn refresh_all(&mut self) {
        self.sys.refresh_memory();
        self.sys.refresh_cpu_usage();
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        self.networks.refresh(true);
    }

    fn lookup(&self, process: &ProcessHandle) -> Result<&sysinfo::Process, SkipReason> {
        let found = self
            .sys
            .process(Pid::from_u32(process.pid))
            .ok_or(SkipReason::Exited)?;
        // The pid was reused by a different program since enumeration.
        if found.name().to_string_lossy() != process.name.as_str() {
            return Err(SkipReason::Exited);
        }
        if found.status() == ProcessStatus::Zombie {
            return Err(SkipReason::Zombie);
        }
        Ok(found)
    }
}

impl MetricsProvider for Collector {
    fn prime(&mut self) -> Result<(), ProviderError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(ProviderError::Unsupported);
        }
        self.networks = Networks::new_with_refreshed_list();
        self.refresh_all();
        Ok(())
    }

    fn warmup(&self) -> Duration {
        sysinfo::MINIMUM_CPU_UPDATE_INTERVAL
    }

    fn refresh(&mut self) -> Result<(), ProviderError> {
        let _refresh_span = tracing::trace_span!("collector.refresh").entered();

        self.refresh_all();
        if self.sys.total_memory() == 0 {
            return Err(ProviderError::MemoryUnavailable);
        }
        Ok(())
    }

    fn processes(&mut self) -> Result<Vec<ProcessEntry>, ProviderError> {
        let entries = self
            .sys
            .processes()
            .iter()
            .map(|(pid, process)| {
                let pid = pid.as_u32();
                if process.status() == ProcessStatus::Zombie {
                    return ProcessEntry::Hidden {
                        pid,
                        reason: SkipReason::Zombie,
                    };
                }
                let name = process.name().to_string_lossy().to_string();
                ProcessEntry::Visible(ProcessHandle::new(pid, name))
            })
            .collect();
        Ok(entries)
    }

    fn process_cpu_percent(
        &mut self,
        process: &ProcessHandle,
    ) -> Result<Probe<f64>, ProviderError> {
        Ok(match self.lookup(process) {
            Ok(found) => Probe::Value(f64::from(found.cpu_usage())),
            Err(reason) => Probe::Skipped(reason),
        })
    }

    fn process_memory_bytes(
        &mut self,
        process: &ProcessHandle,
    ) -> Result<Probe<u64>, ProviderError> {
        Ok(match self.lookup(process) {
            Ok(found) => Probe::Value(found.memory()),
            Err(reason) => Probe::Skipped(reason),
        })
    }

    fn system_cpu_percent(&mut self) -> Result<f64, ProviderError> {
        Ok(f64::from(self.sys.global_cpu_usage()))
    }

    fn virtual_memory(&mut self) -> Result<VirtualMemory, ProviderError> {
        let total_bytes = self.sys.total_memory();
        if total_bytes == 0 {
            return Err(ProviderError::MemoryUnavailable);
        }
        // "Used" follows total minus available, which counts reclaimable
        // cache as free.
        let used_bytes = total_bytes.saturating_sub(self.sys.available_memory());
        Ok(VirtualMemory {
            total_bytes,
            used_bytes,
        })
    }

    fn network_counters(&mut self) -> Result<NetworkCounters, ProviderError> {
        let counters = self
            .networks
            .list()
            .values()
            .fold(NetworkCounters::default(), |acc, data| NetworkCounters {
                bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
                bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
            });
        Ok(counters)
    }
}
