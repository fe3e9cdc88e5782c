//! Logging setup
//!
//! Configure via RUST_LOG environment variable:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=fencedfilter::scan=debug` - fence open/close transitions only
//!
//! Console logs go to stderr; stdout carries the filtered source.
//!
//! # Log Files
//!
//! With `log_to_file: true` in `config.yaml`, logs are also written to
//! `~/.config/fencedfilter/logs/fencedfilter.log` with daily rotation.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize tracing subscriber with console and optional file logging
pub fn init(log_to_file: bool) {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_filter(console_filter);

    let file_layer = if log_to_file {
        match crate::config_paths::ensure_logs_dir() {
            Ok(logs_dir) => {
                let file_appender = tracing_appender::rolling::daily(logs_dir, "fencedfilter.log");
                Some(
                    fmt::layer()
                        .with_writer(file_appender)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true)
                        .with_filter(EnvFilter::new("debug")),
                )
            }
            Err(e) => {
                eprintln!("Warning: Could not initialize file logging: {}", e);
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
