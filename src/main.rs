use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::Report;
use restax::config::{Config, SamplingRequest, SamplingSettings, load_config, load_config_from_path};
use restax::logging;
use restax::report::ConsoleReporter;
use restax::sampler::{self, RunOutcome, RunState, StopReason};
use restax::session::FlushReport;
use restax::signal;
use restax::system::collector::Collector;

#[derive(Parser)]
#[command(
    name = "restax",
    about = "Sample system and per-application resource usage into a CSV file",
    after_help = "Examples:\n  \
        # Baseline condition (background app closed)\n  \
        restax --app-foreground Code --app-background Spotify --output data/baseline_log.csv\n\n  \
        # Treatment condition (background app streaming)\n  \
        restax --app-foreground Code --app-background Spotify --output data/treatment_log.csv"
)]
struct Cli {
    /// Name of the foreground application (case-insensitive substring, e.g. "Code")
    #[arg(long)]
    app_foreground: String,

    /// Name of the background application (case-insensitive substring, e.g. "Spotify")
    #[arg(long)]
    app_background: String,

    /// Output CSV file path
    #[arg(long)]
    output: PathBuf,

    /// Sampling interval in seconds [default: 2.0]
    #[arg(long, allow_negative_numbers = true)]
    interval: Option<f64>,

    /// Stop after this many samples instead of waiting for Ctrl+C
    #[arg(long)]
    max_samples: Option<usize>,

    /// Print a progress line every N samples [default: 10]
    #[arg(long)]
    progress_every: Option<usize>,

    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter for stderr (e.g. "info", "restax=debug")
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);

    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = logging::filter_directive(
        cli.log_level.as_deref(),
        rust_log.as_deref(),
        &config.logging.level,
    );
    logging::init(&directive, cli.log_json || config.logging.json)?;

    let settings = sampling_request(&cli, &config).validate()?;
    print_banner(&settings);

    let mut state = RunState::new();
    signal::install(state.stop_handle())?;

    let mut collector = Collector::new();
    let mut reporter = ConsoleReporter;
    let outcome = sampler::run(&mut collector, &settings, &mut state, &mut reporter).await?;

    finish(outcome)
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(interval) = cli.interval {
        config.sampling.interval_secs = interval;
    }
    if let Some(every) = cli.progress_every {
        config.sampling.progress_every = every;
    }
    if cli.max_samples.is_some() {
        config.sampling.max_samples = cli.max_samples;
    }

    config
}

fn sampling_request(cli: &Cli, config: &Config) -> SamplingRequest {
    SamplingRequest {
        foreground: cli.app_foreground.clone(),
        background: cli.app_background.clone(),
        output: cli.output.clone(),
        interval_secs: config.sampling.interval_secs,
        progress_every: config.sampling.progress_every,
        max_samples: config.sampling.max_samples,
    }
}

fn print_banner(settings: &SamplingSettings) {
    println!("Starting data collection...");
    println!("Foreground app: {}", settings.foreground.pattern());
    println!("Background app: {}", settings.background.pattern());
    println!(
        "Sampling interval: {} seconds",
        settings.interval.as_secs_f64()
    );
    println!("Output file: {}", settings.output.display());
    println!("\nPress Ctrl+C to stop collection and save data...\n");
}

fn print_flush_summary(report: &FlushReport) {
    match report {
        FlushReport::Empty => println!("\nNo data collected. Exiting."),
        FlushReport::Written {
            rows,
            path,
            duration,
        } => {
            println!("\nSaved {rows} snapshots to {}", path.display());
            println!("Total samples: {rows}");
            println!("Duration: {:.1} minutes", duration.as_secs_f64() / 60.0);
        }
    }
}

/// Interrupts, sample limits and empty sessions exit successfully. A provider
/// failure exits with an error even when the collected rows were saved.
fn finish(outcome: RunOutcome) -> Result<()> {
    let RunOutcome {
        stop,
        samples,
        flush,
    } = outcome;

    if let Ok(report) = &flush {
        print_flush_summary(report);
    }

    match stop {
        StopReason::Fatal(err) => {
            let aborted = Report::new(err)
                .wrap_err(format!("sampling aborted by a provider error after {samples} samples"));
            match flush {
                Ok(_) => Err(aborted),
                Err(flush_err) => {
                    Err(aborted.wrap_err(format!("collected data was not saved: {flush_err}")))
                }
            }
        }
        StopReason::Interrupted | StopReason::Completed => {
            flush?;
            Ok(())
        }
    }
}
