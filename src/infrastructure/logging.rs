//! Logging configuration
//!
//! Initializes tracing for the application.

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "STAGEGATE_LOG";

/// Initializes logging with the specified level
///
/// A filter in `STAGEGATE_LOG` takes precedence over `level`. Calling this
/// more than once keeps the first subscriber.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging("debug");
        init_logging("info");
    }
}
