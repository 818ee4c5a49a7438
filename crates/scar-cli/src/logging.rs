//! Logging bootstrap using `tracing` and `tracing-subscriber`.
//!
//! Log levels follow the usual split: `error` for fatal load failures,
//! `warn` for recoverable oddities (fallback window substitution, ignored
//! relations), `info` for load progress, `debug`/`trace` for block-level
//! detail.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON format for machine parsing.
    Json,
}

/// Configuration for logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Maximum level to emit.
    pub level_filter: LevelFilter,
    /// Respect `RUST_LOG` instead of the fixed level.
    pub use_env_filter: bool,
    /// Output format.
    pub format: LogFormat,
    /// Write to this file instead of stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::WARN,
            use_env_filter: true,
            format: LogFormat::default(),
            log_file: None,
        }
    }
}

/// Initialize the global tracing subscriber. Call once at startup.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    let filter = build_filter(config);

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            install(config.format, filter, Arc::new(file), false);
        }
        None => {
            install(config.format, filter, io::stderr, true);
        }
    }
    Ok(())
}

fn install<W>(format: LogFormat, filter: EnvFilter, writer: W, ansi: bool)
where
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => {
            let layer = fmt::layer().json().with_writer(writer);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(writer)
                .with_ansi(ansi)
                .without_time();
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(false)
                .without_time();
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
}

/// Build the level filter, letting `RUST_LOG` override when allowed.
fn build_filter(config: &LogConfig) -> EnvFilter {
    if config.use_env_filter {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    // Keep external crates at warn to reduce noise.
    EnvFilter::new(format!(
        "warn,scar_cli={level},scar_session={level},scar_archive={level},scar_model={level}",
        level = config.level_filter.to_string().to_lowercase()
    ))
}
