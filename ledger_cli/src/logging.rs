//! Structured logging configuration.
//!
//! Logs go to stderr so that stdout carries only command output.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var; the default keeps
/// sqlx quiet.
///
/// # Example
///
/// ```ignore
/// use ledger_cli::logging;
///
/// logging::init();
/// tracing::info!("Ledger starting");
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    // Also bridges `log` records from the library. A second call is a no-op.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();

    tracing::debug!("Structured logging initialized");
}

/// Log the outcome of one ledger command
///
/// # Arguments
///
/// * `operation` - Command name
/// * `duration_ms` - Duration in milliseconds
/// * `error` - Client-facing error message, if the command failed
pub fn log_ledger_operation(operation: &str, duration_ms: u64, error: Option<&str>) {
    match error {
        Some(message) => tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Ledger command failed: {}",
            message
        ),
        None => tracing::info!(
            operation = operation,
            duration_ms = duration_ms,
            "Ledger command completed"
        ),
    }

    log_performance(operation, duration_ms, None);
}

/// Log performance metric
///
/// # Arguments
///
/// * `operation` - Operation name
/// * `duration_ms` - Duration in milliseconds
/// * `metadata` - Additional metadata
pub fn log_performance(operation: &str, duration_ms: u64, metadata: Option<&str>) {
    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "Performance metric"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init();
        init();
    }

    #[test]
    fn test_log_ledger_operation() {
        log_ledger_operation("earn", 3, None);
        log_ledger_operation("spend", 5, Some("Insufficient funds"));
    }

    #[test]
    fn test_log_performance() {
        log_performance("history", 500, Some("limit=20"));
        log_performance("slow_operation", 2000, None);
    }
}
