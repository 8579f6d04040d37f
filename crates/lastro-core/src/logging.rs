//! Structured logging schema, field name constants, and subscriber setup.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (candidate queries, records) |

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::defaults;
use crate::error::{Error, Result};

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "search", "db"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "fallback", "sampler", "series", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "apply_fallback", "get_direct", "execute"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Identity of the reference record a suggestion is built for.
pub const RECORD_ID: &str = "record_id";

/// Record attribute (column) involved in a query.
pub const ATTRIBUTE: &str = "attribute";

/// Rendered query text.
pub const QUERY: &str = "query";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of records returned by a query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of groups or suggestions produced.
pub const GROUP_COUNT: &str = "group_count";

/// Number of candidates dispatched in a concurrent batch.
pub const CANDIDATE_COUNT: &str = "candidate_count";

// ─── Search-specific fields ────────────────────────────────────────────────

/// Fallback tier that produced the answer.
pub const FALLBACK_LEVEL: &str = "fallback_level";

/// Free terms extracted from failed queries.
pub const TERMS: &str = "terms";

/// Year constraint extracted from failed queries.
pub const DATE_TERM: &str = "date_term";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Subscriber configuration.
///
/// Environment variables read by [`LogConfig::from_env`]:
/// - `LOG_FORMAT` - "json" or "text" (default: "text")
/// - `LOG_FILE`   - path to log file (optional, enables daily-rotated file logging)
/// - `LOG_ANSI`   - "true"/"false" override ANSI colors (auto-detected by default)
/// - `RUST_LOG`   - standard env filter, read at init time
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub file: Option<PathBuf>,
    pub ansi: Option<bool>,
    /// Directive used when `RUST_LOG` is absent or invalid.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            file: None,
            ansi: None,
            default_filter: defaults::LOG_FILTER.to_string(),
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let format = match std::env::var("LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        Self {
            format,
            file: std::env::var("LOG_FILE").ok().map(PathBuf::from),
            ansi: std::env::var("LOG_ANSI")
                .ok()
                .map(|v| v == "true" || v == "1"),
            ..Default::default()
        }
    }
}

/// Install the global tracing subscriber.
///
/// Returns the non-blocking writer guard when file logging is enabled; the
/// caller must keep it alive for buffered lines to be flushed. Fails with
/// [`Error::Config`] if a global subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    let registry = tracing_subscriber::registry().with(env_filter);
    let json = config.format == LogFormat::Json;

    let (outcome, guard) = match config.file {
        Some(ref path) => {
            let file_dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or(defaults::LOG_FILE_NAME);
            let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let outcome = if json {
                registry
                    .with(fmt::layer().json().with_writer(non_blocking))
                    .try_init()
            } else {
                // no ANSI in files unless explicitly requested
                registry
                    .with(
                        fmt::layer()
                            .with_writer(non_blocking)
                            .with_ansi(config.ansi.unwrap_or(false)),
                    )
                    .try_init()
            };
            (outcome, Some(guard))
        }
        None => {
            let outcome = if json {
                registry.with(fmt::layer().json()).try_init()
            } else {
                let mut layer = fmt::layer();
                if let Some(ansi) = config.ansi {
                    layer = layer.with_ansi(ansi);
                }
                registry.with(layer).try_init()
            };
            (outcome, None)
        }
    };

    outcome.map_err(|e| Error::Config(format!("tracing subscriber: {e}")))?;

    tracing::info!(
        subsystem = "core",
        component = "logging",
        json,
        log_file = config
            .file
            .as_deref()
            .and_then(|p| p.to_str())
            .unwrap_or("(stdout)"),
        "Logging initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_text_stdout() {
        let config = LogConfig::default();
        assert_eq!(config.format, LogFormat::Text);
        assert!(config.file.is_none());
        assert_eq!(config.default_filter, defaults::LOG_FILTER);
    }

    #[test]
    fn test_second_init_is_rejected() {
        let _ = init_tracing(&LogConfig::default());
        let second = init_tracing(&LogConfig::default());
        assert!(matches!(second, Err(Error::Config(_))));
    }
}
