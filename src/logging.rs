//! Logging and tracing infrastructure.
//!
//! Structured logging via the tracing crate, initialized once at program
//! startup with an environment-driven filter.

use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the default level; `verbose` raises the default
/// from `info` to `debug`. Subsequent calls are ignored.
pub fn init_tracing(verbose: bool) {
    INIT.call_once(|| {
        let default_filter = if verbose { "debug" } else { "info" };
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        // Reports go to stdout; diagnostics stay on stderr.
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    });
}
