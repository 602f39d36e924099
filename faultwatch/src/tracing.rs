//! Logging setup and the macro prelude used throughout the crate.
//!
//! Modules pull the macros in with `use crate::tracing::prelude::*` so the
//! subscriber choice stays in one place.

use std::env;

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, prelude::*};

pub mod prelude {
    pub use tracing::{debug, error, info, trace, warn};
}

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.
///
/// Under systemd (`JOURNAL_STREAM` is set) events go to the journal with
/// structured fields intact. Everywhere else they go to stderr through the
/// fmt layer, leaving stdout to the program's own output. In both cases
/// `RUST_LOG` controls filtering.
pub fn init_journald_or_stderr() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if env::var_os("JOURNAL_STREAM").is_some() {
        match tracing_journald::layer() {
            Ok(journald) => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(journald)
                    .init();
                return;
            }
            Err(e) => {
                eprintln!("journald unavailable, logging to stdout: {e}");
            }
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(std::io::stderr))
        .init();
}

fn fmt_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
}
