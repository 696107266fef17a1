//! Tests for utility functions

use paddock::util::{init_tracing, DEFAULT_DIRECTIVE};
use tracing_subscriber::EnvFilter;

#[test]
fn test_default_directive_targets_crate() {
    assert!(DEFAULT_DIRECTIVE.starts_with("paddock="));
    let filter = EnvFilter::try_new(DEFAULT_DIRECTIVE).unwrap();
    assert!(filter.to_string().contains("paddock"));
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    assert!(tracing::dispatcher::has_been_set());
}
