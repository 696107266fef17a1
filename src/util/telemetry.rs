//! Telemetry helpers for structured logging.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
///
/// At `info`, the crate reports ticker start/cancel/stop, join watchdog
/// warnings, and task panics. Raise to `paddock=debug` for worker cohort
/// start/stop and skipped scheduler ticks.
pub const DEFAULT_DIRECTIVE: &str = "paddock=info";

/// Install an fmt subscriber filtered by `RUST_LOG` (falling back to
/// [`DEFAULT_DIRECTIVE`]) unless a subscriber is already set.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
