//! netapp-teardown-common - Shared types and utilities
//!
//! This crate holds the pieces of the teardown model that need no HTTP or
//! runtime dependencies, so they can be reused by the binary and by tests.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values
//! - [`names`]: Composite child names returned by list APIs
//! - [`resource_id`]: Typed parsing of ARM resource identifiers
//! - [`resource_kind`]: Resource kinds and their deletion order

pub mod defaults;
pub mod names;
pub mod resource_id;
pub mod resource_kind;

// Re-export commonly used types
pub use names::ChildName;
pub use resource_id::{ResourceId, ResourceIdError};
pub use resource_kind::ResourceKind;
