//! Run configuration for the teardown

use netapp_teardown_common::defaults::{
    ACCOUNT_DELETE_MAX_ATTEMPTS, ACCOUNT_DELETE_RETRY_DELAY, DEFAULT_MAX_WORKERS,
};
use std::time::Duration;
use thiserror::Error;

/// Invalid command-line values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--workers must be at least 1, got {0}")]
    InvalidWorkers(usize),
}

/// Retry policy for the nested-resources conflict on account deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: usize,
    /// Fixed wait between attempts
    pub delay: Duration,
}

impl Default for AccountRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: ACCOUNT_DELETE_MAX_ATTEMPTS,
            delay: ACCOUNT_DELETE_RETRY_DELAY,
        }
    }
}

/// Everything a teardown run needs besides the provider clients
#[derive(Debug, Clone)]
pub struct TeardownConfig {
    /// Skip the interactive confirmation
    pub skip_confirmation: bool,
    /// Accounts torn down concurrently
    pub max_workers: usize,
    /// Debug logging including HTTP traffic
    pub verbose: bool,
    pub retry: AccountRetryPolicy,
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self {
            skip_confirmation: false,
            max_workers: DEFAULT_MAX_WORKERS,
            verbose: false,
            retry: AccountRetryPolicy::default(),
        }
    }
}

impl TeardownConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::InvalidWorkers(self.max_workers));
        }
        Ok(())
    }
}
