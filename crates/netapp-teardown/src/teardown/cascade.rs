//! Bottom-up deletion of one NetApp account
//!
//! Volumes, then backups and their vaults, then the account itself, then the
//! resource group that contained it. The first failure stops the cascade;
//! nothing already deleted is restored.

use crate::azure::error::{classify_anyhow_error, ignore_not_found};
use crate::azure::operations::{NetAppOperations, ResourceGroupOperations};
use crate::config::AccountRetryPolicy;
use crate::error::TeardownError;
use crate::status;
use backon::{ConstantBuilder, Retryable};
use netapp_teardown_common::{ResourceId, ResourceKind};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Render an error with its causes on one line.
fn describe(err: &TeardownError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Log a failure in red and hand it back for propagation.
fn logged(err: TeardownError) -> TeardownError {
    error!("{}", status::failed(describe(&err)));
    err
}

fn stage(kind: ResourceKind, account: &str) {
    debug!(account = %account, stage = kind.cleanup_priority(), kind = %kind, "Starting stage");
}

fn deleted(kind: ResourceKind, path: &str) {
    info!("{}", status::deleted(format!("Successfully deleted {kind} '{path}'")));
}

/// Deletes one account's hierarchy through shared provider handles.
pub struct CascadeDeleter<N, R> {
    netapp: Arc<N>,
    groups: Arc<R>,
    retry: AccountRetryPolicy,
}

impl<N, R> CascadeDeleter<N, R>
where
    N: NetAppOperations,
    R: ResourceGroupOperations,
{
    pub fn new(netapp: Arc<N>, groups: Arc<R>, retry: AccountRetryPolicy) -> Self {
        Self {
            netapp,
            groups,
            retry,
        }
    }

    /// Delete the account at `account_id` and everything beneath it, then
    /// its resource group.
    pub async fn delete_account(&self, account_id: &str) -> Result<(), TeardownError> {
        let id = ResourceId::parse(account_id).map_err(|source| {
            logged(TeardownError::MalformedIdentifier {
                id: account_id.to_string(),
                source,
            })
        })?;
        let resource_group = id.resource_group();
        let account = id.name();

        info!(
            account = %account,
            resource_group = %resource_group,
            subscription_id = %id.subscription_id(),
            resource_type = id.resource_kind().unwrap_or("unknown"),
            "Tearing down NetApp account"
        );

        stage(ResourceKind::Volume, account);
        self.delete_volumes(resource_group, account).await?;
        stage(ResourceKind::BackupVault, account);
        self.delete_backup_vaults(resource_group, account).await?;
        stage(ResourceKind::NetAppAccount, account);
        self.delete_account_with_retry(resource_group, account).await?;
        stage(ResourceKind::ResourceGroup, account);
        self.delete_resource_group(resource_group).await?;

        Ok(())
    }

    async fn delete_volumes(&self, resource_group: &str, account: &str) -> Result<(), TeardownError> {
        let pools = self
            .netapp
            .list_pools(resource_group, account)
            .await
            .map_err(|e| logged(TeardownError::provider("list", ResourceKind::CapacityPool, account, e)))?;

        for pool in &pools {
            let pool = pool.leaf();
            let pool_path = format!("{account}/{pool}");

            let volumes = self
                .netapp
                .list_volumes(resource_group, account, pool)
                .await
                .map_err(|e| logged(TeardownError::provider("list", ResourceKind::Volume, &pool_path, e)))?;

            for volume in &volumes {
                let path = format!("{pool_path}/{}", volume.leaf());
                debug!(listed = volume.listed(), path = %path, "Deleting volume");
                self.netapp
                    .delete_volume(resource_group, account, pool, volume.leaf())
                    .await
                    .map_err(|e| logged(TeardownError::provider("delete", ResourceKind::Volume, &path, e)))?;
                deleted(ResourceKind::Volume, &path);
            }
        }

        Ok(())
    }

    async fn delete_backup_vaults(
        &self,
        resource_group: &str,
        account: &str,
    ) -> Result<(), TeardownError> {
        let vaults = self
            .netapp
            .list_backup_vaults(resource_group, account)
            .await
            .map_err(|e| logged(TeardownError::provider("list", ResourceKind::BackupVault, account, e)))?;

        for vault in &vaults {
            let vault = vault.leaf();
            let vault_path = format!("{account}/{vault}");

            let backups = self
                .netapp
                .list_backups(resource_group, account, vault)
                .await
                .map_err(|e| logged(TeardownError::provider("list", ResourceKind::Backup, &vault_path, e)))?;

            for backup in &backups {
                let path = format!("{vault_path}/{}", backup.leaf());
                self.netapp
                    .delete_backup(resource_group, account, vault, backup.leaf())
                    .await
                    .map_err(|e| logged(TeardownError::provider("delete", ResourceKind::Backup, &path, e)))?;
                deleted(ResourceKind::Backup, &path);
            }

            self.netapp
                .delete_backup_vault(resource_group, account, vault)
                .await
                .map_err(|e| {
                    logged(TeardownError::provider("delete", ResourceKind::BackupVault, &vault_path, e))
                })?;
            self.verify_vault_gone(resource_group, account, vault, &vault_path)
                .await?;
            deleted(ResourceKind::BackupVault, &vault_path);
        }

        Ok(())
    }

    /// A vault that can still be fetched after its delete completed is an error.
    async fn verify_vault_gone(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
        vault_path: &str,
    ) -> Result<(), TeardownError> {
        let fetched = self
            .netapp
            .get_backup_vault(resource_group, account, vault)
            .await;

        match ignore_not_found(fetched) {
            Ok(None) => Ok(()),
            Ok(Some(_)) => Err(logged(TeardownError::PostDeleteInconsistency {
                path: vault_path.to_string(),
            })),
            Err(e) => Err(logged(TeardownError::provider(
                "get",
                ResourceKind::BackupVault,
                vault_path,
                e,
            ))),
        }
    }

    /// Child deletions can take a while to propagate, so the account delete
    /// is retried on the nested-resources conflict alone.
    async fn delete_account_with_retry(
        &self,
        resource_group: &str,
        account: &str,
    ) -> Result<(), TeardownError> {
        let policy = self.retry;
        let mut retries = 0usize;

        let result = (|| async {
            self.netapp
                .delete_account(resource_group, account)
                .await
                .map_err(|e| {
                    if classify_anyhow_error(&e).is_nested_resources() {
                        TeardownError::NestedResourcesConflict {
                            kind: ResourceKind::NetAppAccount,
                            path: account.to_string(),
                            source: e,
                        }
                    } else {
                        TeardownError::provider("delete", ResourceKind::NetAppAccount, account, e)
                    }
                })
        })
        .retry(
            ConstantBuilder::default()
                .with_delay(policy.delay)
                .with_max_times(policy.max_attempts.saturating_sub(1)),
        )
        .when(TeardownError::is_nested_resources_conflict)
        .notify(|_, dur| {
            retries += 1;
            info!(
                account = %account,
                delay = ?dur,
                "Nested resources still exist, retrying account deletion ({}/{})",
                retries + 1,
                policy.max_attempts
            );
        })
        .await
        .map_err(TeardownError::into_exhausted);

        match result {
            Ok(()) => {
                deleted(ResourceKind::NetAppAccount, account);
                Ok(())
            }
            Err(e) => Err(logged(e)),
        }
    }

    async fn delete_resource_group(&self, resource_group: &str) -> Result<(), TeardownError> {
        self.groups
            .delete_resource_group(resource_group)
            .await
            .map_err(|e| {
                logged(TeardownError::provider(
                    "delete",
                    ResourceKind::ResourceGroup,
                    resource_group,
                    e,
                ))
            })?;
        deleted(ResourceKind::ResourceGroup, resource_group);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeAccount, FakeProvider, account_id};
    use netapp_teardown_common::ResourceIdError;
    use std::time::Duration;

    fn deleter(fake: &Arc<FakeProvider>) -> CascadeDeleter<FakeProvider, FakeProvider> {
        CascadeDeleter::new(Arc::clone(fake), Arc::clone(fake), AccountRetryPolicy::default())
    }

    fn populated() -> FakeProvider {
        FakeProvider::new().with_account(
            "acct1",
            FakeAccount::in_group("rg1")
                .with_pool("pool1", &["vol1", "vol2"])
                .with_pool("pool2", &["vol3"])
                .with_vault("vault1", &["b1", "b2"]),
        )
    }

    #[tokio::test]
    async fn test_malformed_identifier_makes_no_calls() {
        let fake = Arc::new(FakeProvider::new());

        let err = deleter(&fake)
            .delete_account("/subscriptions/sub")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TeardownError::MalformedIdentifier {
                source: ResourceIdError::TooFewSegments { found: 3 },
                ..
            }
        ));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_full_cascade_runs_in_order() {
        let fake = Arc::new(populated());

        deleter(&fake)
            .delete_account(&account_id("rg1", "acct1"))
            .await
            .unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                "list_pools:acct1",
                "list_volumes:acct1/pool1",
                "delete_volume:acct1/pool1/vol1",
                "delete_volume:acct1/pool1/vol2",
                "list_volumes:acct1/pool2",
                "delete_volume:acct1/pool2/vol3",
                "list_backup_vaults:acct1",
                "list_backups:acct1/vault1",
                "delete_backup:acct1/vault1/b1",
                "delete_backup:acct1/vault1/b2",
                "delete_backup_vault:acct1/vault1",
                "get_backup_vault:acct1/vault1",
                "delete_account:acct1",
                "delete_resource_group:rg1",
            ]
        );
        assert!(!fake.account_exists("acct1"));
        assert!(fake.group_deleted("rg1"));
    }

    #[tokio::test]
    async fn test_empty_account_skips_to_account_and_group() {
        let fake = Arc::new(FakeProvider::new().with_account("bare", FakeAccount::in_group("rg2")));

        deleter(&fake)
            .delete_account(&account_id("rg2", "bare"))
            .await
            .unwrap();

        assert_eq!(fake.count("list_volumes"), 0);
        assert_eq!(fake.count("list_backups"), 0);
        assert_eq!(fake.count("delete_account"), 1);
        assert_eq!(fake.count("delete_resource_group"), 1);
    }

    #[tokio::test]
    async fn test_children_gone_after_their_stage() {
        let fake = Arc::new(populated().fail("delete_account:acct1", "boom"));
        let deleter = deleter(&fake);

        assert!(deleter.delete_account(&account_id("rg1", "acct1")).await.is_err());

        assert_eq!(fake.remaining_volumes("acct1"), 0);
        for pool in ["pool1", "pool2"] {
            assert!(fake.list_volumes("rg1", "acct1", pool).await.unwrap().is_empty());
        }
        assert!(fake.list_backup_vaults("rg1", "acct1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_volume_failure_stops_cascade() {
        let fake = Arc::new(populated().fail("delete_volume:acct1/pool1/vol2", "volume busy"));

        let err = deleter(&fake)
            .delete_account(&account_id("rg1", "acct1"))
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            TeardownError::ProviderOperationFailed {
                action: "delete",
                kind: ResourceKind::Volume,
                path,
                ..
            } if path == "acct1/pool1/vol2"
        ));
        assert!(describe(&err).contains("volume busy"));
        assert_eq!(fake.count("list_backup_vaults"), 0);
        assert_eq!(fake.count("delete_account"), 0);
        assert_eq!(fake.count("delete_resource_group"), 0);
    }

    #[tokio::test]
    async fn test_surviving_vault_is_inconsistency() {
        let fake = Arc::new(populated().vault_survives("acct1", "vault1"));

        let err = deleter(&fake)
            .delete_account(&account_id("rg1", "acct1"))
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            TeardownError::PostDeleteInconsistency { path } if path == "acct1/vault1"
        ));
        assert_eq!(
            err.to_string(),
            "Backup vault 'acct1/vault1' deletion failed - resource still exists"
        );
        assert_eq!(fake.count("delete_account"), 0);
    }

    #[tokio::test]
    async fn test_vault_fetch_error_is_provider_failure() {
        let fake = Arc::new(populated().fail("get_backup_vault:acct1/vault1", "timeout"));

        let err = deleter(&fake)
            .delete_account(&account_id("rg1", "acct1"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TeardownError::ProviderOperationFailed {
                action: "get",
                kind: ResourceKind::BackupVault,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_account_retry_recovers_from_transient_conflict() {
        let fake = Arc::new(
            FakeProvider::new()
                .with_account("acct1", FakeAccount::in_group("rg1"))
                .nested_conflicts("acct1", 2),
        );
        let start = tokio::time::Instant::now();

        deleter(&fake)
            .delete_account(&account_id("rg1", "acct1"))
            .await
            .unwrap();

        assert_eq!(fake.count("delete_account"), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
        assert!(fake.group_deleted("rg1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_account_retry_bounded_to_three_attempts() {
        let fake = Arc::new(
            FakeProvider::new()
                .with_account("acct1", FakeAccount::in_group("rg1"))
                .nested_conflicts("acct1", 10),
        );
        let start = tokio::time::Instant::now();

        let err = deleter(&fake)
            .delete_account(&account_id("rg1", "acct1"))
            .await
            .unwrap_err();

        assert_eq!(fake.count("delete_account"), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
        assert!(matches!(
            err,
            TeardownError::ProviderOperationFailed {
                action: "delete",
                kind: ResourceKind::NetAppAccount,
                ..
            }
        ));
        assert!(describe(&err).contains("nested resources exist"));
        assert_eq!(fake.count("delete_resource_group"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_account_errors_are_not_retried() {
        let fake = Arc::new(
            FakeProvider::new()
                .with_account("acct1", FakeAccount::in_group("rg1"))
                .fail("delete_account:acct1", "forbidden"),
        );
        let start = tokio::time::Instant::now();

        let err = deleter(&fake)
            .delete_account(&account_id("rg1", "acct1"))
            .await
            .unwrap_err();

        assert_eq!(fake.count("delete_account"), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(matches!(err, TeardownError::ProviderOperationFailed { .. }));
    }

    #[tokio::test]
    async fn test_resource_group_failure_is_fatal() {
        let fake = Arc::new(
            FakeProvider::new()
                .with_account("acct1", FakeAccount::in_group("rg1"))
                .fail("delete_resource_group:rg1", "locked"),
        );

        let err = deleter(&fake)
            .delete_account(&account_id("rg1", "acct1"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TeardownError::ProviderOperationFailed {
                kind: ResourceKind::ResourceGroup,
                ..
            }
        ));
        assert!(!fake.account_exists("acct1"));
    }
}
