//! lamco-clipboard-monitor
//!
//! Prints every clipboard change until the monitor gives up or the
//! process is interrupted.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lamco_clipboard_monitor::{ClipboardMonitor, ClipboardValue, MonitorConfig, StrategyKind};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "lamco-clipboard-monitor")]
#[command(version, about = "Linux clipboard change monitor", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        env = "LAMCO_CLIPBOARD_CONFIG",
        default_value = "/etc/lamco-clipboard-monitor/config.toml"
    )]
    pub config: String,

    /// Report image changes
    #[arg(long)]
    pub image: bool,

    /// Report file list changes
    #[arg(long)]
    pub files: bool,

    /// Use only this strategy (data-control|toolkit|polling)
    #[arg(short, long)]
    pub strategy: Option<StrategyKind>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    /// Write logs to file (in addition to stdout)
    #[arg(long)]
    pub log_file: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = MonitorConfig::load(&args.config);
    let config_level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    let _log_guard = init_logging(&args, &config_level)?;

    info!("════════════════════════════════════════════════════════");
    info!("  lamco-clipboard-monitor v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {}", env!("BUILD_DATE"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("════════════════════════════════════════════════════════");

    lamco_clipboard_monitor::utils::log_startup_diagnostics();

    let config = loaded.unwrap_or_else(|e| {
        warn!("Failed to load config: {:#}, using defaults", e);
        MonitorConfig::default()
    });
    let config = config.with_overrides(args.image, args.files, args.strategy);
    config.validate()?;

    info!("Configuration loaded successfully");
    debug!("Config: {:?}", config);

    let enable_image = config.enable_image;
    let enable_files = config.enable_files;
    let monitor = ClipboardMonitor::new(config);

    monitor.on_update(
        |kind, value| match &value {
            ClipboardValue::Files(paths) => {
                info!("📋 {}: {}", kind, value.summary());
                for path in paths {
                    info!("    {}", path);
                }
            }
            _ => info!("📋 {}: {}", kind, value.summary()),
        },
        enable_image,
        enable_files,
    )?;

    monitor.wait();

    warn!("Clipboard monitor exited: no strategy left to run");
    monitor.stop()?;
    Ok(())
}

fn init_logging(args: &Args, config_level: &str) -> Result<Option<WorkerGuard>> {
    let log_level = match args.verbose {
        0 => config_level,
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "lamco_clipboard_monitor={level},warn",
            level = log_level
        ))
    });

    // If log file is specified, write to both stdout and file
    if let Some(log_file_path) = &args.log_file {
        let file = std::fs::File::create(log_file_path)?;
        let (writer, guard) = tracing_appender::non_blocking(file);

        match args.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stdout),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(writer)
                            .with_ansi(false),
                    )
                    .init();
            }
            "compact" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stdout),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(writer)
                            .with_ansi(false),
                    )
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stdout),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(writer)
                            .with_ansi(false),
                    )
                    .init();
            }
        }
        info!("Logging to file: {}", log_file_path);
        return Ok(Some(guard));
    }

    match args.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(None)
}
