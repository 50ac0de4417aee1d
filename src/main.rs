use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use vitalwatch::aggregator::CategoryFilter;
use vitalwatch::broadcast::{BroadcastChannel, ChannelEvent, ViewerSession};
use vitalwatch::config::Config;
use vitalwatch::error::ConfigError;
use vitalwatch::events::AlertType;
use vitalwatch::monitor::Monitor;
use vitalwatch::store::MemoryReadingStore;

/// Command-line arguments for the vitals monitor
#[derive(Parser)]
#[command(
    name = "vitalwatch",
    about = "Vitals monitor - threshold alerts for live patient readings",
    long_about = "Ingests periodic vital-sign and motion readings from a live feed (or a synthetic \
                  generator when the feed is unavailable), classifies them against clinical \
                  thresholds and broadcasts readings and alert state to connected viewers."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    /// Run a single vitals cycle and print the alert view
    #[arg(long, help = "Evaluate one reading, print the alerts as JSON and exit")]
    once: bool,

    /// Category shown by the console viewer
    #[arg(
        long,
        value_name = "CATEGORY",
        default_value = "all",
        help = "Alert category to show: all, health, system or reminder"
    )]
    category: CategoryFilter,
}

impl Cli {
    /// Reject a `--config` path that names a directory
    ///
    /// A missing file is accepted here; `load_config` replaces it with the
    /// default thresholds and intervals.
    fn validate(&self) -> Result<(), String> {
        let Some(path) = self.config.as_deref() else {
            return Ok(());
        };

        if path.exists() && !path.is_file() {
            return Err(format!("--config must name a file, {} is not a file", path.display()));
        }
        if path.extension().is_some_and(|ext| ext != "toml") {
            warn!("Config file {} is not a .toml file, parsing it as TOML anyway", path.display());
        }

        Ok(())
    }

    /// The `--config` path as UTF-8, or `None` to run on built-in defaults
    fn config_path_str(&self) -> Result<Option<&str>, String> {
        self.config
            .as_deref()
            .map(|path| {
                path.to_str()
                    .ok_or_else(|| format!("--config path is not valid UTF-8: {}", path.display()))
            })
            .transpose()
    }
}

/// Load configuration from file or use defaults
///
/// A missing or unreadable file falls back to defaults with a warning; an
/// invalid file is reported and also falls back to defaults.
fn load_config(config_path: Option<&str>) -> Result<Config, ConfigError> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            match Config::from_file(std::path::Path::new(path)) {
                Ok(config) => Ok(config),
                Err(ConfigError::ReadError(_)) => {
                    warn!(
                        "Configuration file '{}' not found or unreadable, using defaults",
                        path
                    );
                    Ok(Config::default())
                }
                Err(e) => {
                    error!("Configuration error in '{}': {}", path, e);
                    warn!("Using default configuration due to invalid config file");
                    Ok(Config::default())
                }
            }
        }
        None => {
            info!("Using default configuration");
            Ok(Config::default())
        }
    }
}

/// Evaluate a single reading and print the viewer's alert list
async fn run_once(
    monitor: &Monitor,
    config: &Config,
    category: CategoryFilter,
) -> anyhow::Result<()> {
    let mut viewer =
        ViewerSession::connect(monitor.channel(), config.alerts.standing_notifications);

    monitor.vitals_cycle().await;
    viewer.drain();

    let output = serde_json::json!({
        "reading": viewer.latest_reading(),
        "category": category.to_string(),
        "count": viewer.count(category),
        "alerts": viewer.view(category),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to serialize alerts")?
    );

    viewer.disconnect();
    Ok(())
}

/// Log alert state changes as seen by one console viewer
async fn console_viewer(
    mut viewer: ViewerSession,
    category: CategoryFilter,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            event = viewer.recv() => event,
            _ = shutdown.changed() => None,
        };

        match event {
            Some(ChannelEvent::AlertState(_)) => {
                for alert in viewer.view(category) {
                    if alert.alert_type == AlertType::Danger {
                        warn!(
                            "{}: {} ({}, threshold {})",
                            alert.metric, alert.message, alert.value, alert.threshold
                        );
                    }
                }
                info!("{} {} alerts visible", viewer.count(category), category);
            }
            Some(ChannelEvent::ReadingUpdate(_)) => {}
            None => break,
        }
    }

    viewer.disconnect();
}

async fn run(cli: &Cli, config: Config) -> anyhow::Result<()> {
    let channel = Arc::new(BroadcastChannel::new());
    let store = Arc::new(MemoryReadingStore::new());
    let monitor = Monitor::new(&config, Arc::clone(&channel), store)
        .context("Failed to initialize monitor")?;

    if cli.once {
        return run_once(&monitor, &config, cli.category).await;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), shutting down gracefully...");
        if let Err(e) = shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    })
    .context("Error setting SIGINT handler for graceful shutdown")?;

    let viewer = ViewerSession::connect(&channel, config.alerts.standing_notifications);
    let viewer_task = tokio::spawn(console_viewer(viewer, cli.category, shutdown_rx.clone()));

    info!("Vitals monitor is running. Press Ctrl+C to stop.");
    monitor.run(shutdown_rx).await;

    viewer_task.await.context("Console viewer task failed")?;
    Ok(())
}

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting vitals monitor");

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config_path = match cli.config_path_str() {
        Ok(path) => path,
        Err(e) => {
            error!("Invalid configuration path: {}", e);
            std::process::exit(1);
        }
    };

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(&cli, config)) {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!("Vitals monitor shutdown complete");
}
