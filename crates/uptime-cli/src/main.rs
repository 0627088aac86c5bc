mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

use uptime_core::{
    CheckResult, ConfigError, CycleReport, HttpProber, Monitor, ProbeOutcome, WebhookNotifier,
};

use crate::config::{AppConfig, LoadError, Overrides, Settings};

fn version_string() -> &'static str {
    match option_env!("UPTIME_GIT_REV") {
        Some(rev) if !rev.is_empty() => {
            // Leaked once; lives for the whole process anyway.
            Box::leak(format!("{} ({})", env!("CARGO_PKG_VERSION"), rev).into_boxed_str())
        }
        _ => env!("CARGO_PKG_VERSION"),
    }
}

/// Uptime monitor: probe URLs over HTTP and alert a webhook when they fail.
#[derive(Parser)]
#[command(name = "uptime-monitor", version = version_string(), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single check cycle and exit.
    Check {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Run check cycles on an interval until interrupted.
    Watch {
        #[command(flatten)]
        common: CommonArgs,

        /// Seconds between cycles. Overrides config file.
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Run check cycles on an interval and expose results over HTTP.
    Serve {
        #[command(flatten)]
        common: CommonArgs,

        /// Seconds between cycles. Overrides config file.
        #[arg(short, long)]
        interval: Option<u64>,

        /// Listen address (e.g. 0.0.0.0:8080). Overrides config file.
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Path to TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// URL to check. Repeatable; replaces the targets from the config file.
    #[arg(short, long = "target", value_name = "URL")]
    targets: Vec<String>,

    /// Webhook URL that receives alerts.
    #[arg(long, env = "UPTIME_WEBHOOK_URL", hide_env_values = true)]
    webhook_url: Option<String>,

    /// Per-probe timeout in seconds.
    #[arg(long)]
    timeout: Option<f64>,

    /// Number of targets probed at the same time.
    #[arg(long)]
    concurrency: Option<usize>,
}

impl CommonArgs {
    fn overrides(self) -> Overrides {
        Overrides {
            targets: self.targets,
            webhook_url: self.webhook_url,
            timeout_secs: self.timeout,
            max_concurrent: self.concurrency,
            ..Overrides::default()
        }
    }
}

/// Anything that stops the binary before or instead of running cycles.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Monitor(#[from] ConfigError),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
    #[error("Server failed: {0}")]
    Server(String),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Check,
    Watch,
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli.command).await;
    if let Err(e) = &result {
        tracing::error!("{}", e);
    }
    ExitCode::from(exit_status(&result))
}

/// Failed targets never change the status; only startup and server errors do.
fn exit_status(result: &Result<(), CliError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

async fn run(command: Commands) -> Result<(), CliError> {
    let (mode, common, extra) = match command {
        Commands::Check { common } => (Mode::Check, common, Overrides::default()),
        Commands::Watch { common, interval } => (
            Mode::Watch,
            common,
            Overrides {
                interval_secs: interval,
                ..Overrides::default()
            },
        ),
        Commands::Serve {
            common,
            interval,
            listen,
        } => (
            Mode::Serve,
            common,
            Overrides {
                interval_secs: interval,
                listen,
                ..Overrides::default()
            },
        ),
    };
    let default_level = if mode == Mode::Serve { "info" } else { "error" };

    let config_path = common.config.clone();
    let settings = match resolve_settings(common, extra) {
        Ok(settings) => settings,
        Err(e) => {
            init_tracing("pretty", default_level);
            return Err(e.into());
        }
    };
    init_tracing(&settings.server.log_format, default_level);
    if let Some(path) = config_path {
        tracing::info!(path = %path.display(), "Loaded config file");
    }

    let monitor = build_monitor(&settings)?;
    match mode {
        Mode::Check => run_check(&monitor, &settings).await,
        Mode::Watch => {
            run_watch(&monitor, &settings).await;
            Ok(())
        }
        Mode::Serve => run_serve(monitor, &settings).await,
    }
}

/// Loads, merges and validates configuration. Nothing runs if this fails.
fn resolve_settings(common: CommonArgs, extra: Overrides) -> Result<Settings, LoadError> {
    let config_path = common.config.clone();
    let mut overrides = common.overrides();
    overrides.interval_secs = extra.interval_secs;
    overrides.listen = extra.listen;

    let mut config = AppConfig::load_optional(config_path.as_deref())?;
    config.apply_overrides(overrides);
    config.into_settings()
}

/// Targets and the webhook get separate clients: only target checks may
/// follow redirects.
fn build_monitor(settings: &Settings) -> Result<Arc<Monitor>, CliError> {
    let target_client = HttpProber::build_client(&settings.monitor)
        .map_err(|e| CliError::HttpClient(e.to_string()))?;
    let webhook_client = WebhookNotifier::build_client(&settings.monitor.user_agent)
        .map_err(|e| CliError::HttpClient(e.to_string()))?;

    let prober = Arc::new(HttpProber::with_client(target_client));
    let notifier = Arc::new(WebhookNotifier::new(settings.webhook.clone(), webhook_client));

    let monitor = Monitor::new(
        settings.targets.clone(),
        settings.monitor.clone(),
        prober,
        notifier,
    )?;
    Ok(Arc::new(monitor))
}

/// One cycle. Succeeds no matter how many targets failed.
async fn run_check(monitor: &Monitor, settings: &Settings) -> Result<(), CliError> {
    print_banner(settings, None);

    let spinner = cycle_spinner(monitor.targets().len());
    let report = monitor.run_cycle().await;
    spinner.finish_and_clear();

    print_report(&report);
    Ok(())
}

async fn run_watch(monitor: &Monitor, settings: &Settings) {
    let cancel = monitor.cancel_handle();
    print_banner(settings, Some(settings.interval));
    println!("{}\n", style("Press Ctrl+C to stop").dim());

    let shutdown = uptime_api::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let spinner = cycle_spinner(monitor.targets().len());
        let cycle = monitor.run_cycle();
        tokio::pin!(cycle);

        let report = tokio::select! {
            report = &mut cycle => report,
            _ = &mut shutdown => {
                cancel.cancel();
                let report = cycle.await;
                spinner.finish_and_clear();
                print_report(&report);
                println!("\n{}", style("Monitor stopped.").dim());
                return;
            }
        };
        spinner.finish_and_clear();
        print_report(&report);

        tokio::select! {
            _ = tokio::time::sleep(jittered(settings.interval)) => {}
            _ = &mut shutdown => {
                println!("\n{}", style("Monitor stopped.").dim());
                return;
            }
        }
    }
}

async fn run_serve(monitor: Arc<Monitor>, settings: &Settings) -> Result<(), CliError> {
    let cancel = monitor.cancel_handle();
    let state = uptime_api::state::AppState::new(Arc::clone(&monitor));

    let scheduler = {
        let state = state.clone();
        let interval = settings.interval;
        tokio::spawn(async move {
            loop {
                let report = state.run_cycle().await;
                if report.cancelled {
                    break;
                }
                tokio::time::sleep(jittered(interval)).await;
            }
        })
    };
    tracing::info!(
        targets = monitor.targets().len(),
        interval_secs = settings.interval.as_secs(),
        "Scheduler started"
    );

    let listen = settings.server.listen;
    tracing::info!(%listen, "Starting uptime monitor API server");
    let served = uptime_api::serve_with_state(listen, state, uptime_api::shutdown_signal())
        .await
        .map_err(|e| CliError::Server(e.to_string()));

    tracing::info!("Stopping scheduler...");
    cancel.cancel();

    // The in-flight cycle finishes its current targets, bounded by the probe
    // and webhook timeouts; anything longer is aborted.
    let grace = settings.monitor.request_timeout + settings.webhook.timeout() + Duration::from_secs(1);
    let abort = scheduler.abort_handle();
    match tokio::time::timeout(grace, scheduler).await {
        Ok(_) => tracing::info!("Scheduler shut down"),
        Err(_) => {
            abort.abort();
            tracing::warn!("Scheduler did not shut down in time, aborted");
        }
    }

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Spreads cycles by +/- 1/7 of the interval.
fn jittered(interval: Duration) -> Duration {
    let base_ms = interval.as_millis() as u64;
    let jitter_range = base_ms / 7;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range * 2) as i64 - jitter_range as i64
    } else {
        0
    };
    Duration::from_millis((base_ms as i64 + jitter).max(1) as u64)
}

fn cycle_spinner(target_count: usize) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(s) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(s);
    }
    spinner.set_message(format!("Checking {} target(s)...", target_count));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_banner(settings: &Settings, interval: Option<Duration>) {
    println!(
        "{} {}",
        style("uptime-monitor").bold(),
        style(env!("CARGO_PKG_VERSION")).dim()
    );
    println!("  {} {}", style("targets: ").dim(), settings.targets.len());
    println!(
        "  {} {}s",
        style("timeout: ").dim(),
        settings.monitor.request_timeout.as_secs_f64()
    );
    if let Some(i) = interval {
        println!("  {} {}s", style("interval:").dim(), i.as_secs());
    }
    println!(
        "  {} webhook (expects HTTP {})",
        style("alerts:  ").dim(),
        settings.webhook.success_status
    );
    println!();
}

fn print_report(report: &CycleReport) {
    println!(
        "{} {}",
        style("──").dim(),
        style(report.started_at.format("%Y-%m-%d %H:%M:%S UTC")).dim().bold()
    );

    for r in &report.results {
        print_result(r);
    }

    let summary = format!(
        "{} up, {} down, {} alert(s) failed",
        report.up_count(),
        report.down_count(),
        report.deliveries_failed()
    );
    if report.cancelled {
        println!("  {} {}", style(summary).dim(), style("(cancelled)").yellow());
    } else {
        println!("  {}", style(summary).dim());
    }
}

fn print_result(r: &CheckResult) {
    let label = format!("{:<7}", status_label(&r.outcome));
    match &r.outcome {
        ProbeOutcome::Up { latency } => println!(
            "  {} {}  {}",
            style(label).green().bold(),
            r.target.url,
            style(format!("{:.3}s", latency.as_secs_f64())).dim()
        ),
        outcome => println!(
            "  {} {}  {}",
            style(label).red().bold(),
            r.target.url,
            style(outcome).red()
        ),
    }

    if let Some(d) = &r.delivery {
        if d.success {
            println!("         {}", style("alert sent").dim());
        } else {
            println!(
                "         {} {}",
                style("alert failed:").yellow(),
                d.detail.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

fn status_label(outcome: &ProbeOutcome) -> &'static str {
    match outcome {
        ProbeOutcome::Up { .. } => "UP",
        ProbeOutcome::WrongStatus { .. } => "DOWN",
        ProbeOutcome::Timeout => "TIMEOUT",
        ProbeOutcome::ConnectionFailure => "UNREACH",
        ProbeOutcome::OtherError { .. } => "ERROR",
    }
}

fn init_tracing(log_format: &str, default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_format {
        "json" => {
            fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}
