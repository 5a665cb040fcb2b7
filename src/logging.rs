//! Logging System
//!
//! Structured logging via the `tracing` crate. Level, format, and
//! destination come from CLI flags, with the `PIXELART_LOG` environment
//! variable taking precedence over the configured level. Command output
//! prints to stdout, so diagnostics default to stderr.

use crate::error::PipelineError;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable overriding the configured log level/filter.
pub const LOG_ENV_VAR: &str = "PIXELART_LOG";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    pub level: String,

    /// Output format: json, text
    pub format: String,

    /// Output destination: stdout, stderr
    pub output: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            output: "stderr".to_string(),
        }
    }
}

/// Initialize the logging system.
///
/// Priority order (highest to lowest):
/// 1. `PIXELART_LOG` environment variable (full filter syntax)
/// 2. The passed configuration (built from CLI flags)
/// 3. Defaults (info, text, stderr)
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), PipelineError> {
    let filter = build_env_filter(config)?;
    let format = validated_format(config)?;
    let output = validated_output(config)?;

    let base = Registry::default().with(filter);

    if format == "json" {
        if output == "stdout" {
            base.with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stdout),
            )
            .init();
        } else {
            base.with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .init();
        }
    } else if output == "stdout" {
        base.with(
            fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_writer(std::io::stdout),
        )
        .init();
    } else {
        base.with(
            fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .init();
    }

    Ok(())
}

/// Build the level filter, letting `PIXELART_LOG` win over the config.
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, PipelineError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV_VAR) {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    EnvFilter::try_new(level)
        .map_err(|e| PipelineError::Config(format!("Invalid log level '{}': {}", level, e)))
}

fn validated_format<'a>(config: Option<&'a LoggingConfig>) -> Result<&'a str, PipelineError> {
    let format = config.map(|c| c.format.as_str()).unwrap_or("text");
    if format != "json" && format != "text" {
        return Err(PipelineError::Config(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            format
        )));
    }
    Ok(format)
}

fn validated_output<'a>(config: Option<&'a LoggingConfig>) -> Result<&'a str, PipelineError> {
    let output = config.map(|c| c.output.as_str()).unwrap_or("stderr");
    if output != "stdout" && output != "stderr" {
        return Err(PipelineError::Config(format!(
            "Invalid log output: {} (must be 'stdout' or 'stderr')",
            output
        )));
    }
    Ok(output)
}
