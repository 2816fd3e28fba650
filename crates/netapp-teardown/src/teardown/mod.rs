//! Account teardown
//!
//! - `cascade`: ordered deletion of one account's hierarchy
//! - `fleet`: bounded parallel teardown of every account with first-failure abort

pub mod cascade;
pub mod fleet;

pub use cascade::CascadeDeleter;
pub use fleet::{FleetOrchestrator, FleetOutcome, FleetReport};
