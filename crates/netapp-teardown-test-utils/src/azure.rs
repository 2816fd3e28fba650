//! Azure test utilities
//!
//! Provides subscription detection and unique run ID generation for Azure
//! integration tests.

use chrono::Utc;

/// Get the subscription for live tests from `AZURE_SUBSCRIPTION_ID`.
///
/// Returns `None` when unset so tests can fall back to CLI resolution.
pub fn get_test_subscription() -> Option<String> {
    std::env::var("AZURE_SUBSCRIPTION_ID")
        .ok()
        .filter(|s| !s.trim().is_empty())
}

/// Generate a unique run ID for test resources.
///
/// Format: `test-{timestamp_ms}-{counter}`, unique even when tests start
/// simultaneously.
///
/// # Example
///
/// ```
/// use netapp_teardown_test_utils::azure::test_run_id;
///
/// let run_id = test_run_id();
/// assert!(run_id.starts_with("test-"));
/// ```
pub fn test_run_id() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let ts = Utc::now().timestamp_millis();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("test-{}-{}", ts, counter)
}

/// Generate a resource group name that is guaranteed not to exist yet.
///
/// # Example
///
/// ```
/// use netapp_teardown_test_utils::azure::test_resource_group_name;
///
/// let rg = test_resource_group_name();
/// assert!(rg.starts_with("netapp-teardown-test-"));
/// ```
pub fn test_resource_group_name() -> String {
    format!("netapp-teardown-{}", test_run_id())
}
