//! # Structured Logging
//!
//! Subscriber setup and span macros using the tracing ecosystem.
//!
//! `RUST_LOG` always wins. Otherwise the level comes from `--log-level`, or
//! `debug` under `--verbose`, or `info`.

use tracing_subscriber::{fmt, EnvFilter};

/// Level used when neither `RUST_LOG` nor a flag says otherwise.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Create a tracing span around one reconciliation stage.
///
/// ```rust,ignore
/// let span = reconcile_span!("policies");
/// let span = reconcile_span!("roles", mounts = 3);
/// ```
#[macro_export]
macro_rules! reconcile_span {
    ($stage:expr) => {
        tracing::info_span!("reconcile", stage = %$stage)
    };
    ($stage:expr, $($field:tt)*) => {
        tracing::info_span!("reconcile", stage = %$stage, $($field)*)
    };
}

/// Pick the filter directive for the given flags.
pub fn filter_directive(log_level: Option<&str>, verbose: bool) -> String {
    match log_level {
        Some(level) if !level.trim().is_empty() => level.trim().to_string(),
        _ if verbose => "debug".to_string(),
        _ => DEFAULT_LOG_LEVEL.to_string(),
    }
}

/// Install the global subscriber.
///
/// An already installed subscriber (integration tests) is left in place.
pub fn init_logging(log_level: Option<&str>, verbose: bool, json: bool) {
    let directive = filter_directive(log_level, verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

    let installed = if json {
        tracing::subscriber::set_global_default(
            fmt().json().with_env_filter(filter).with_target(false).finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            fmt().with_env_filter(filter).with_target(false).finish(),
        )
    };

    if installed.is_err() {
        // Subscriber already set elsewhere; ignore.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(None, false), "info");
        assert_eq!(filter_directive(None, true), "debug");
        assert_eq!(filter_directive(Some("warn"), true), "warn");
        assert_eq!(filter_directive(Some(" "), false), "info");
        assert_eq!(filter_directive(Some("config2vault=trace"), false), "config2vault=trace");
    }

    #[test]
    fn test_macros_compile() {
        let _span = reconcile_span!("policies");
        let _span = reconcile_span!("roles", mounts = 3);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(Some("error"), false, false);
        init_logging(None, true, true);
    }
}
