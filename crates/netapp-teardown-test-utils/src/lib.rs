//! Shared test utilities for netapp-teardown
//!
//! Helpers for the live integration tests, kept out of the main crate so they
//! never ship in the binary.
//!
//! ## Modules
//!
//! - [`azure`]: Subscription detection and unique test resource names

pub mod azure;

// Re-export commonly used items
pub use azure::{get_test_subscription, test_resource_group_name, test_run_id};
