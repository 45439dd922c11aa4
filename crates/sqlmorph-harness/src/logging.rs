//! Tracing subscriber setup.
//!
//! Human-readable compact output to stderr, plus optional JSON lines to a
//! file for post-hoc analysis. `RUST_LOG` overrides the default filter.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use sqlmorph_error::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global subscriber.
///
/// `default_filter` applies when `RUST_LOG` is unset. With `json_log`, every
/// event is also written as one JSON object per line to that file. Returns
/// `false` when a subscriber was already installed, which makes this safe to
/// call from every test.
pub fn init_logging(default_filter: &str, json_log: Option<&Path>) -> Result<bool> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json_layer = match json_log {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(Mutex::new(file))
                    .with_target(true)
                    .with_thread_ids(true),
            )
        }
        None => None,
    };

    let terminal_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(terminal_layer)
        .with(json_layer)
        .try_init()
        .is_ok())
}

/// Terminal-only logging routed through the test writer.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_test_writer()
                .compact(),
        )
        .try_init();
}
