//! Parallel teardown of every account in the subscription
//!
//! One task per account on a pool bounded by a semaphore. The first failing
//! task trips a cancellation token before it releases its permit, so no
//! account that was still queued gets started afterwards.

use super::cascade::CascadeDeleter;
use crate::azure::operations::{NetAppOperations, ResourceGroupOperations};
use crate::config::AccountRetryPolicy;
use crate::error::TeardownError;
use crate::prompt::{Confirmation, confirm_prompt};
use netapp_teardown_common::ResourceKind;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{error, info, warn};

/// How a run ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetOutcome {
    /// The subscription has no NetApp accounts
    NothingToDelete,
    /// The operator declined the confirmation
    Cancelled,
    /// Every account was torn down
    Completed,
}

/// Per-account results of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetReport {
    pub outcome: FleetOutcome,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub cancelled: Vec<String>,
}

impl FleetReport {
    fn empty(outcome: FleetOutcome) -> Self {
        Self {
            outcome,
            succeeded: Vec::new(),
            failed: Vec::new(),
            cancelled: Vec::new(),
        }
    }
}

enum TaskOutcome {
    Deleted,
    NotStarted,
    Failed(TeardownError),
}

/// Lists accounts, asks for confirmation, and drives one cascade per account.
pub struct FleetOrchestrator<N, R, C> {
    netapp: Arc<N>,
    groups: Arc<R>,
    confirmation: Arc<C>,
    retry: AccountRetryPolicy,
}

impl<N, R, C> FleetOrchestrator<N, R, C>
where
    N: NetAppOperations + 'static,
    R: ResourceGroupOperations + 'static,
    C: Confirmation + 'static,
{
    pub fn new(
        netapp: Arc<N>,
        groups: Arc<R>,
        confirmation: Arc<C>,
        retry: AccountRetryPolicy,
    ) -> Self {
        Self {
            netapp,
            groups,
            confirmation,
            retry,
        }
    }

    /// Tear down every NetApp account in the subscription.
    ///
    /// # Returns
    /// * `Ok(report)` - Nothing to do, declined, or every account deleted
    /// * `Err` - The first cascade failure, after all started tasks settled
    pub async fn run(
        &self,
        skip_confirmation: bool,
        max_workers: usize,
    ) -> Result<FleetReport, TeardownError> {
        let accounts = self
            .netapp
            .list_accounts()
            .await
            .map_err(|e| TeardownError::provider("list", ResourceKind::NetAppAccount, "*", e))?;

        if accounts.is_empty() {
            info!("No NetApp accounts found");
            return Ok(FleetReport::empty(FleetOutcome::NothingToDelete));
        }

        info!(count = accounts.len(), "Found NetApp accounts to delete");
        for account in &accounts {
            info!("  - {}", account.name);
        }

        if !skip_confirmation && !self.confirm(accounts.len()).await? {
            info!("Operation cancelled by user");
            return Ok(FleetReport::empty(FleetOutcome::Cancelled));
        }

        info!(
            accounts = accounts.len(),
            workers = max_workers,
            "Starting parallel deletion"
        );

        let deleter = Arc::new(CascadeDeleter::new(
            Arc::clone(&self.netapp),
            Arc::clone(&self.groups),
            self.retry,
        ));
        let permits = Arc::new(Semaphore::new(max_workers));
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for account in accounts {
            let deleter = Arc::clone(&deleter);
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (account.name, TaskOutcome::NotStarted);
                };
                if cancel.is_cancelled() {
                    return (account.name, TaskOutcome::NotStarted);
                }

                // A separate task so a panic is reported against this account.
                // Aborted with its worker if the run is dropped.
                let id = account.id.clone();
                let cascade = AbortOnDropHandle::new(tokio::spawn(async move {
                    deleter.delete_account(&id).await
                }));
                let outcome = match cascade.await {
                    Ok(Ok(())) => TaskOutcome::Deleted,
                    Ok(Err(e)) => TaskOutcome::Failed(e),
                    Err(source) => TaskOutcome::Failed(TeardownError::TaskPanicked {
                        account: account.name.clone(),
                        source,
                    }),
                };
                if matches!(outcome, TaskOutcome::Failed(_)) {
                    cancel.cancel();
                }
                (account.name, outcome)
            });
        }

        let mut report = FleetReport::empty(FleetOutcome::Completed);
        let mut first_error = None;

        while let Some(joined) = tasks.join_next().await {
            let (name, outcome) = match joined {
                Ok(result) => result,
                Err(source) => (
                    "<unknown>".to_string(),
                    TaskOutcome::Failed(TeardownError::TaskPanicked {
                        account: "<unknown>".to_string(),
                        source,
                    }),
                ),
            };

            match outcome {
                TaskOutcome::Deleted => report.succeeded.push(name),
                TaskOutcome::NotStarted => report.cancelled.push(name),
                TaskOutcome::Failed(e) => {
                    report.failed.push(name);
                    if first_error.is_none() {
                        warn!("Deletion failed, cancelling accounts that have not started");
                        cancel.cancel();
                        permits.close();
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            error!(
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                cancelled = report.cancelled.len(),
                "Teardown aborted"
            );
            return Err(e);
        }

        info!(count = report.succeeded.len(), "All NetApp accounts deleted successfully");
        Ok(report)
    }

    async fn confirm(&self, count: usize) -> Result<bool, TeardownError> {
        let confirmation = Arc::clone(&self.confirmation);
        let prompt = confirm_prompt(count);
        tokio::task::spawn_blocking(move || confirmation.confirm(&prompt))
            .await
            .map_err(|e| TeardownError::ConfirmationFailed { source: e.into() })?
            .map_err(|source| TeardownError::ConfirmationFailed { source })
    }
}
