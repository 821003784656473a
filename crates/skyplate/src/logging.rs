//! Logging initialization.
//!
//! Uses the `tracing` ecosystem for structured logging with support for
//! both human-readable and JSON output formats.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// `silent` drops the level to ERROR so the progress bar and summary own
/// the terminal; `verbose` raises it to DEBUG; the default is INFO. Log
/// output always goes to stderr because stdout may be the streaming report
/// destination, and the `RUST_LOG` environment variable can override the
/// level either way.
pub fn init(verbose: bool, silent: bool, json_format: bool) {
    let default_level = if silent {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        // JSON format for machine parsing
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        // Pretty format for humans
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the config file's settings plus CLI overrides.
pub fn init_from_config(
    config: &skyplate_core::Config,
    verbose_override: bool,
    silent_override: bool,
    json_logs_override: bool,
) {
    let verbose = verbose_override
        || config.logging.level == "debug"
        || config.logging.level == "trace";
    let silent = silent_override || config.logging.level == "error";
    let json_format = json_logs_override || config.logging.format == "json";
    init(verbose, silent, json_format);
}
