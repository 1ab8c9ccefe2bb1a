use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// `RUST_LOG` when set, otherwise the configured directives.
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Returns `false` if one was already set
/// (e.g. by a test harness).
pub fn init(config: &LoggingConfig) -> bool {
    let builder = fmt().with_env_filter(env_filter(config)).with_target(true);
    let installed = if config.json {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.compact().try_init()
    };
    installed.is_ok()
}
