//! Structured logging configuration for WhisperDeck
//!
//! Logging is off unless `WHISPERDECK_LOG_LEVEL` is set, so normal CLI
//! output is never interleaved with diagnostics. Output goes to stderr in
//! one of three formats:
//! - `pretty` for development
//! - `compact` single-line
//! - `json` for machine consumption

use anyhow::Result;
use std::env;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Logging configuration for different environments
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level or filter directive (e.g. `debug`, `whisperdeck=trace`)
    pub level: String,
    pub format: LogFormat,
    pub colored: bool,
    /// Include file and line of each event
    pub with_location: bool,
    /// Emit span open/close events
    pub with_spans: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "error".to_string(),
            format: LogFormat::Pretty,
            colored: is_terminal::IsTerminal::is_terminal(&std::io::stderr()),
            with_location: false,
            with_spans: false,
        }
    }
}

impl LogConfig {
    /// Create logging configuration from environment variables
    pub fn from_env() -> Self {
        let level = env::var("WHISPERDECK_LOG_LEVEL")
            .or_else(|_| env::var("LOG_LEVEL"))
            .unwrap_or_else(|_| "error".to_string());

        let format = match env::var("WHISPERDECK_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };

        let colored = env::var("WHISPERDECK_LOG_COLOR")
            .map(|v| flag_enabled(&v))
            .unwrap_or_else(|_| is_terminal::IsTerminal::is_terminal(&std::io::stderr()));

        let with_location = env::var("WHISPERDECK_LOG_LOCATION")
            .map(|v| flag_enabled(&v))
            .unwrap_or(false);

        let with_spans = env::var("WHISPERDECK_LOG_SPANS")
            .map(|v| flag_enabled(&v))
            .unwrap_or(false);

        Self {
            level,
            format,
            colored,
            with_location,
            with_spans,
        }
    }
}

fn flag_enabled(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Initialize the global tracing subscriber
pub fn init_logging(config: LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_new(&config.level)
        .or_else(|_| EnvFilter::try_new("error"))
        .unwrap_or_else(|_| EnvFilter::new("error"));

    let span_events = if config.with_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.colored)
        .with_span_events(span_events)
        .with_file(config.with_location)
        .with_line_number(config.with_location);

    match config.format {
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize JSON logging: {}", e))?,
        LogFormat::Pretty => subscriber
            .pretty()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize pretty logging: {}", e))?,
        LogFormat::Compact => subscriber
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize compact logging: {}", e))?,
    }

    info!(
        level = %config.level,
        format = ?config.format,
        colored = config.colored,
        "Logging initialized"
    );

    Ok(())
}

/// Log the outcome of a persisted-state write
pub fn log_state_write(key: &str, result: &Result<()>) {
    match result {
        Ok(()) => debug!(key = key, "State persisted"),
        Err(e) => warn!(key = key, error = %e, "Failed to persist state"),
    }
}
