/// Receives periodic progress observations from the sampling loop.
pub trait ProgressReporter {
    fn progress(&mut self, samples: usize, system_cpu_percent: f64);
}

/// Prints progress lines to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn progress(&mut self, samples: usize, system_cpu_percent: f64) {
        println!("{}", progress_line(samples, system_cpu_percent));
    }
}

/// Keeps every observation; used by tests.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub reports: Vec<(usize, f64)>,
}

impl ProgressReporter for RecordingReporter {
    fn progress(&mut self, samples: usize, system_cpu_percent: f64) {
        self.reports.push((samples, system_cpu_percent));
    }
}

pub fn progress_line(samples: usize, system_cpu_percent: f64) -> String {
    format!("Collected {samples} samples... (System CPU: {system_cpu_percent:.1}%)")
}
