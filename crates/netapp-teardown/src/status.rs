//! Colored status lines for deletion outcomes
//!
//! Colors are dropped automatically when the output is not a terminal.

use console::{StyledObject, style};

/// A line reporting a completed deletion, rendered green.
pub fn deleted(message: impl std::fmt::Display) -> StyledObject<String> {
    style(message.to_string()).green()
}

/// A line reporting a failure, rendered red.
pub fn failed(message: impl std::fmt::Display) -> StyledObject<String> {
    style(message.to_string()).red()
}
