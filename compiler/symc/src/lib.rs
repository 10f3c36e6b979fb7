//! Symc command-line driver.
//!
//! Hosts the built-in catalogue of functions, the `generate` and `list`
//! commands and logging setup. The binary in `main.rs` only parses
//! arguments and reports results.

pub mod catalogue;
pub mod commands;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the global subscriber: `RUST_LOG` filtering (default `info`)
/// rendered as an indented span tree on stderr.
///
/// Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_tree::HierarchicalLayer::new(2)
                    .with_writer(std::io::stderr)
                    .with_targets(true),
            )
            .init();
    });
}
