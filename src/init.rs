//! Logging bootstrap for hosts embedding the engine.

use crate::config::Config;

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = config.logging.level.clone();
        if config.logging.debug && !filter.contains("page_sweeper") {
            filter.push_str(",page_sweeper=debug");
        }
        tracing_subscriber::EnvFilter::new(filter)
    });

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
