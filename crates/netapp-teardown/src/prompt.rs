//! Interactive confirmation before anything is deleted

use anyhow::{Context, Result};
use dialoguer::Confirm;

/// Question asked before deleting `count` accounts
pub fn confirm_prompt(count: usize) -> String {
    format!(
        "This will delete all {count} NetApp accounts in your subscription. \
         Are you sure you want to proceed?"
    )
}

/// Source of a yes/no answer from the operator.
///
/// Blocking; callers on the async runtime should run it on a blocking thread.
#[cfg_attr(test, mockall::automock)]
pub trait Confirmation: Send + Sync {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Asks on the controlling terminal, defaulting to "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Confirmation for TerminalPrompt {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }
}
