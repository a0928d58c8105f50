//! Logging configuration for dual output (console + file) with rotation.

use tracing_appender::non_blocking;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration options
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory to store log files
    pub log_dir: String,
    /// Log level filter (e.g., "info", "signal_scanner=debug")
    pub level_filter: String,
    /// File rotation cadence
    pub rotation: LogRotation,
    /// Whether to include timestamps in console output
    pub console_timestamps: bool,
    /// Whether to use JSON format for file logs
    pub file_json_format: bool,
}

/// Log rotation configuration
#[derive(Debug, Clone)]
pub enum LogRotation {
    /// Rotate daily (recommended for production)
    Daily,
    /// Rotate hourly (for debugging heavy loads)
    Hourly,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            level_filter: "info,signal_scanner=info".to_string(),
            rotation: LogRotation::Daily,
            console_timestamps: true,
            file_json_format: true,
        }
    }
}

/// Initialize dual output logging (console + rotating files).
///
/// Returns a guard that must be kept alive for the duration of the
/// application so the background logging thread keeps running.
pub fn init_dual_logging(
    config: LoggingConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&config.log_dir)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level_filter));
    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level_filter));

    let file_appender = match config.rotation {
        LogRotation::Daily => tracing_appender::rolling::daily(&config.log_dir, "signal_scanner.log"),
        LogRotation::Hourly => {
            tracing_appender::rolling::hourly(&config.log_dir, "signal_scanner.log")
        }
    };

    let (file_writer, guard) = non_blocking(file_appender);

    // Console layer: human-readable with colors
    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_level(true)
        .with_target(true)
        .with_timer(if config.console_timestamps {
            ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string())
        } else {
            ChronoUtc::new("".to_string())
        })
        .with_filter(console_filter);

    // File layer: structured JSON or plain text
    let file_layer = if config.file_json_format {
        fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_level(true)
            .with_target(true)
            .with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string()))
            .with_filter(file_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_level(true)
            .with_target(true)
            .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string()))
            .with_filter(file_filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        log_dir = %config.log_dir,
        rotation = ?config.rotation,
        json_format = config.file_json_format,
        "📁 Dual logging initialized - console + rotating files"
    );

    Ok(guard)
}

/// Clean up old log files (keep only recent ones)
pub fn cleanup_old_logs(log_dir: &str, keep_days: u32) -> Result<usize, std::io::Error> {
    let cutoff_time =
        std::time::SystemTime::now() - std::time::Duration::from_secs(keep_days as u64 * 24 * 3600);

    let mut removed_count = 0;

    if let Ok(entries) = std::fs::read_dir(log_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file()
                && path.extension().map(|ext| ext == "log").unwrap_or(false)
            {
                if let Ok(metadata) = path.metadata() {
                    if let Ok(modified) = metadata.modified() {
                        if modified < cutoff_time && std::fs::remove_file(&path).is_ok() {
                            removed_count += 1;
                            tracing::debug!("🗑️ Removed old log file: {:?}", path);
                        }
                    }
                }
            }
        }
    }

    if removed_count > 0 {
        tracing::info!(
            "🧹 Cleaned up {} old log files (older than {} days)",
            removed_count,
            keep_days
        );
    }

    Ok(removed_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.level_filter, "info,signal_scanner=info");
        assert!(matches!(config.rotation, LogRotation::Daily));
        assert!(config.console_timestamps);
        assert!(config.file_json_format);
    }

    #[test]
    fn test_cleanup_ignores_recent_logs() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();

        std::fs::write(log_dir.join("signal_scanner.2026-01-01.log"), "test").unwrap();
        std::fs::write(log_dir.join("notes.txt"), "test").unwrap();

        let removed = cleanup_old_logs(log_dir.to_str().unwrap(), 30).unwrap();
        assert_eq!(removed, 0);
        assert!(log_dir.join("signal_scanner.2026-01-01.log").exists());
    }
}
