use super::provider::{MetricsProvider, ProcessEntry, ProcessHandle, ProviderError, SkipReason};

/// Case-insensitive substring pattern naming one monitored application.
///
/// Plain containment, no word boundaries: `"code"` matches `"decode"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pattern: String,
}

impl Selector {
    pub fn new(pattern: &str) -> Self {
        Selector {
            pattern: pattern.to_lowercase(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, process_name: &str) -> bool {
        process_name.to_lowercase().contains(&self.pattern)
    }
}

/// Matching processes for one selector in one tick.
#[derive(Debug, Default)]
pub struct Resolution {
    pub matched: Vec<ProcessHandle>,
    /// Table entries that could not be inspected, so whether they would
    /// have matched is unknown.
    pub skipped: Vec<(u32, SkipReason)>,
}

/// Enumerates the live process table and keeps the entries whose name
/// contains the selector's pattern.
pub fn resolve<P: MetricsProvider + ?Sized>(
    provider: &mut P,
    selector: &Selector,
) -> Result<Resolution, ProviderError> {
    let mut resolution = Resolution::default();
    for entry in provider.processes()? {
        match entry {
            ProcessEntry::Visible(handle) => {
                if selector.matches(&handle.name) {
                    resolution.matched.push(handle);
                }
            }
            ProcessEntry::Hidden { pid, reason } => {
                tracing::trace!(pid, %reason, "process hidden from enumeration");
                resolution.skipped.push((pid, reason));
            }
        }
    }
    Ok(resolution)
}
