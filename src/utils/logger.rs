use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter(verbose: bool, configured: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match configured {
        Some(level) => EnvFilter::new(level),
        None if verbose => EnvFilter::new("txn_guard=debug,info"),
        None => EnvFilter::new("txn_guard=info"),
    })
}

pub fn init_cli_logger(verbose: bool, level: Option<&str>) {
    tracing_subscriber::registry()
        .with(env_filter(verbose, level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(verbose)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

pub fn init_json_logger(verbose: bool, level: Option<&str>) {
    tracing_subscriber::registry()
        .with(env_filter(verbose, level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}

/// Picks the format from the `[logging]` section. `RUST_LOG` still wins.
pub fn init_from_config(config: &LoggingConfig, verbose: bool) {
    let level = config.level.as_deref();
    match config.format {
        LogFormat::Json => init_json_logger(verbose, level),
        LogFormat::Compact => init_cli_logger(verbose, level),
    }
}
