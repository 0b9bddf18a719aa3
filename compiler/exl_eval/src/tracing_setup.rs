//! Opt-in diagnostics output.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Runs at most once per process and does nothing when `RUST_LOG` is
/// unset, so hosts embedding the runtime keep control of their own
/// subscriber.
///
/// ```text
/// RUST_LOG=exl_eval::closure=debug,exl_eval::operators=trace
/// ```
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            // A host may already own the global subscriber.
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
