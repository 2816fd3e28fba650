//! Tracing subscriber setup

use crate::azure::arm::HTTP_TRACE_TARGET;
use tracing_subscriber::EnvFilter;

/// Default filter directives. `RUST_LOG` replaces them entirely when set.
pub fn filter_directives(verbose: bool) -> Vec<String> {
    let (crate_level, http_level) = if verbose {
        ("debug", "debug")
    } else {
        ("info", "warn")
    };

    vec![
        "info".to_string(),
        format!("netapp_teardown={crate_level}"),
        format!("{HTTP_TRACE_TARGET}={http_level}"),
        format!("reqwest={http_level}"),
        format!("hyper_util={http_level}"),
    ]
}

/// Install the global fmt subscriber.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(verbose).join(",")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .init();
}
