//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "LINEUP_LOG";

/// Filter used when `LINEUP_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "lineup_optimizer=info";

/// Install the global tracing subscriber.
///
/// Reads `LINEUP_LOG` for per-module levels, e.g.
/// `LINEUP_LOG=lineup_optimizer::search=debug,lineup_optimizer::storage=warn`.
///
/// Idempotent. If another subscriber is already installed it is left alone.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_names(true))
            .with(filter)
            .try_init();
    });
}
