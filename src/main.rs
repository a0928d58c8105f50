use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use signal_scanner::logging::{cleanup_old_logs, init_dual_logging, LogRotation, LoggingConfig};
use signal_scanner::scanner::{ScannerActor, ScannerAsk, ScannerConfig, ScannerReply};
use signal_scanner::universe::UniverseBuilder;

/// Scanner configuration from config.toml
#[derive(Debug, Clone, Deserialize)]
struct ScannerTomlConfig {
    pub timeframe: String,
    pub batch_size: usize,
    pub rotation_interval_secs: Option<u64>,
    pub quote_asset: Option<String>,
}

/// Logging configuration from config.toml
#[derive(Debug, Clone, Deserialize)]
struct LoggingTomlConfig {
    pub log_dir: Option<String>,
    pub level_filter: Option<String>,
    pub rotation: Option<String>, // "daily" or "hourly"
    pub console_timestamps: Option<bool>,
    pub file_json_format: Option<bool>,
    pub cleanup_days: Option<u32>,
}

/// Full TOML configuration structure
#[derive(Debug, Clone, Deserialize)]
struct TomlConfig {
    pub scanner: ScannerTomlConfig,
    pub logging: Option<LoggingTomlConfig>,
}

/// Runtime configuration (converted from TOML)
#[derive(Debug, Clone)]
struct AppConfig {
    pub scanner: ScannerConfig,
    pub logging: LoggingConfig,
    pub log_cleanup_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerConfig::default(),
            logging: LoggingConfig::default(),
            log_cleanup_days: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from a config.toml file
    fn from_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let config_content = std::fs::read_to_string(path)?;
        let toml_config: TomlConfig = toml::from_str(&config_content)?;

        Ok(Self::from_toml_config(toml_config))
    }

    fn from_toml_config(toml_config: TomlConfig) -> Self {
        let mut scanner = ScannerConfig::new(
            &toml_config.scanner.timeframe,
            toml_config.scanner.batch_size.max(1),
        );
        if let Some(secs) = toml_config.scanner.rotation_interval_secs {
            scanner.rotation_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(quote_asset) = toml_config.scanner.quote_asset {
            scanner.quote_asset = quote_asset;
        }

        let (logging, log_cleanup_days) = if let Some(log_config) = toml_config.logging {
            let rotation = log_config
                .rotation
                .map(|r| match r.as_str() {
                    "hourly" => LogRotation::Hourly,
                    _ => LogRotation::Daily,
                })
                .unwrap_or(LogRotation::Daily);

            let config = LoggingConfig {
                log_dir: log_config.log_dir.unwrap_or_else(|| "logs".to_string()),
                level_filter: log_config
                    .level_filter
                    .unwrap_or_else(|| "info,signal_scanner=info".to_string()),
                rotation,
                console_timestamps: log_config.console_timestamps.unwrap_or(true),
                file_json_format: log_config.file_json_format.unwrap_or(true),
            };
            (config, log_config.cleanup_days.unwrap_or(30))
        } else {
            (LoggingConfig::default(), 30)
        };

        Self {
            scanner,
            logging,
            log_cleanup_days,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Pre-load configuration to get logging settings
    let config = match AppConfig::from_toml("config.toml") {
        Ok(config) => {
            println!("✅ Loaded configuration from config.toml");
            config
        }
        Err(e) => {
            println!("⚠️ Failed to load config.toml: {}. Using default configuration", e);
            AppConfig::default()
        }
    };

    let _logging_guard = match init_dual_logging(config.logging.clone()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("❌ Failed to initialize logging system: {}", e);
            tracing_subscriber::fmt()
                .with_env_filter("info,signal_scanner=info")
                .init();
            error!("⚠️ Using fallback console-only logging due to error: {}", e);
            None
        }
    };

    if let Err(e) = cleanup_old_logs(&config.logging.log_dir, config.log_cleanup_days) {
        warn!("⚠️ Failed to clean up old log files: {}", e);
    }

    info!(
        timeframe = %config.scanner.interval,
        batch_size = config.scanner.batch_size,
        rotation_interval = ?config.scanner.rotation_interval,
        "🚀 Starting perpetual-futures signal scanner"
    );

    // Build the symbol universe once; falls back to a fixed list on failure
    let universe_builder = UniverseBuilder::new(
        config.scanner.rest_base_url.clone(),
        config.scanner.quote_asset.clone(),
    )?;
    let universe = universe_builder.build(config.scanner.batch_size).await;
    info!(
        "🌐 Universe ready: {} symbols in {} batches",
        universe.total_symbols(),
        universe.batch_count()
    );

    let scanner = kameo::spawn(ScannerActor::new(config.scanner.clone(), universe)?);

    match scanner.ask(ScannerAsk::Start).await {
        Ok(ScannerReply::Started) => info!("✅ Scanning started"),
        Ok(ScannerReply::NoOp(reason)) => warn!("Scanner start was a no-op: {}", reason),
        Ok(reply) => warn!("Unexpected start reply: {:?}", reply),
        Err(e) => {
            error!("Failed to start scanner: {}", e);
            return Err(format!("Failed to start scanner: {}", e).into());
        }
    }

    info!("⏹️  Press Ctrl+C to stop");

    let mut status_interval = tokio::time::interval(Duration::from_secs(30));
    status_interval.tick().await; // the first tick completes immediately

    loop {
        tokio::select! {
            _ = status_interval.tick() => {
                report_status(&scanner).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Shutdown signal received");
                break;
            }
        }
    }

    match scanner.ask(ScannerAsk::Stop).await {
        Ok(ScannerReply::Stopped) => info!("✅ Scanning stopped"),
        Ok(_) => {}
        Err(e) => error!("Failed to stop scanner cleanly: {}", e),
    }

    info!("🏁 Graceful shutdown completed");
    Ok(())
}

/// Log a status snapshot and the currently active signals
async fn report_status(scanner: &kameo::actor::ActorRef<ScannerActor>) {
    match scanner.ask(ScannerAsk::GetStatus).await {
        Ok(ScannerReply::Status(status)) => {
            info!(
                "📊 scanning={} batch={} active_symbols={} total_symbols={} signals={} timeframe={}",
                status.scanning,
                status.current_batch,
                status.active_symbols,
                status.total_symbols,
                status.signal_count,
                status.timeframe
            );
        }
        Ok(_) => {}
        Err(e) => warn!("⚠️ Status query failed: {}", e),
    }

    match scanner.ask(ScannerAsk::GetActiveSignals).await {
        Ok(ScannerReply::ActiveSignals(signals)) => {
            for record in signals.values() {
                info!(
                    "🎯 {}: {} | price: {:.4} | RSI: {:.1} | trend: {} | volume: {}",
                    record.symbol,
                    record.kinds(),
                    record.price,
                    record.rsi,
                    record.trend,
                    record.volume_status
                );
            }
        }
        Ok(_) => {}
        Err(e) => warn!("⚠️ Signal query failed: {}", e),
    }
}
