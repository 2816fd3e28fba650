//! Azure NetApp Files resource management

use super::arm::{ArmClient, ArmResource};
use super::subscription::SubscriptionId;
use anyhow::Result;
use netapp_teardown_common::ChildName;
use netapp_teardown_common::defaults::NETAPP_API_VERSION;
use tracing::debug;

const PROVIDER: &str = "providers/Microsoft.NetApp/netAppAccounts";

/// Collection of all NetApp accounts in a subscription
pub fn accounts_path(subscription: &str) -> String {
    format!("/subscriptions/{subscription}/{PROVIDER}")
}

/// A single NetApp account
pub fn account_path(subscription: &str, resource_group: &str, account: &str) -> String {
    format!("/subscriptions/{subscription}/resourceGroups/{resource_group}/{PROVIDER}/{account}")
}

pub fn pools_path(subscription: &str, resource_group: &str, account: &str) -> String {
    format!("{}/capacityPools", account_path(subscription, resource_group, account))
}

pub fn volumes_path(subscription: &str, resource_group: &str, account: &str, pool: &str) -> String {
    format!("{}/{pool}/volumes", pools_path(subscription, resource_group, account))
}

pub fn backup_vaults_path(subscription: &str, resource_group: &str, account: &str) -> String {
    format!("{}/backupVaults", account_path(subscription, resource_group, account))
}

pub fn backups_path(subscription: &str, resource_group: &str, account: &str, vault: &str) -> String {
    format!(
        "{}/{vault}/backups",
        backup_vaults_path(subscription, resource_group, account)
    )
}

/// NetApp Files client scoped to one subscription
#[derive(Debug, Clone)]
pub struct NetAppClient {
    arm: ArmClient,
    subscription: SubscriptionId,
}

impl NetAppClient {
    pub fn new(arm: ArmClient, subscription: SubscriptionId) -> Self {
        Self { arm, subscription }
    }

    async fn list_children(&self, path: &str) -> Result<Vec<ChildName>> {
        let resources: Vec<ArmResource> = self.arm.list(path, NETAPP_API_VERSION).await?;
        debug!(path = %path, count = resources.len(), "Listed children");
        Ok(resources.into_iter().map(|r| ChildName::new(r.name)).collect())
    }

    /// List every NetApp account in the subscription
    pub async fn list_accounts(&self) -> Result<Vec<ArmResource>> {
        let accounts: Vec<ArmResource> = self
            .arm
            .list(&accounts_path(&self.subscription), NETAPP_API_VERSION)
            .await?;
        debug!(count = accounts.len(), "Listed NetApp accounts");
        Ok(accounts)
    }

    pub async fn list_pools(&self, resource_group: &str, account: &str) -> Result<Vec<ChildName>> {
        self.list_children(&pools_path(&self.subscription, resource_group, account))
            .await
    }

    pub async fn list_volumes(
        &self,
        resource_group: &str,
        account: &str,
        pool: &str,
    ) -> Result<Vec<ChildName>> {
        self.list_children(&volumes_path(&self.subscription, resource_group, account, pool))
            .await
    }

    /// Delete a volume and wait for the operation to finish
    pub async fn delete_volume(
        &self,
        resource_group: &str,
        account: &str,
        pool: &str,
        volume: &str,
    ) -> Result<()> {
        let path = format!(
            "{}/{volume}",
            volumes_path(&self.subscription, resource_group, account, pool)
        );
        self.arm.delete(&path, NETAPP_API_VERSION).await
    }

    pub async fn list_backup_vaults(
        &self,
        resource_group: &str,
        account: &str,
    ) -> Result<Vec<ChildName>> {
        self.list_children(&backup_vaults_path(&self.subscription, resource_group, account))
            .await
    }

    pub async fn list_backups(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
    ) -> Result<Vec<ChildName>> {
        self.list_children(&backups_path(&self.subscription, resource_group, account, vault))
            .await
    }

    /// Delete a backup and wait for the operation to finish
    pub async fn delete_backup(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
        backup: &str,
    ) -> Result<()> {
        let path = format!(
            "{}/{backup}",
            backups_path(&self.subscription, resource_group, account, vault)
        );
        self.arm.delete(&path, NETAPP_API_VERSION).await
    }

    fn backup_vault_path(&self, resource_group: &str, account: &str, vault: &str) -> String {
        format!(
            "{}/{vault}",
            backup_vaults_path(&self.subscription, resource_group, account)
        )
    }

    /// Delete a backup vault and wait for the operation to finish
    pub async fn delete_backup_vault(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
    ) -> Result<()> {
        self.arm
            .delete(
                &self.backup_vault_path(resource_group, account, vault),
                NETAPP_API_VERSION,
            )
            .await
    }

    /// Fetch a backup vault. Fails with a not-found [`super::ArmError`] once it is gone.
    pub async fn get_backup_vault(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
    ) -> Result<ArmResource> {
        self.arm
            .get(
                &self.backup_vault_path(resource_group, account, vault),
                NETAPP_API_VERSION,
            )
            .await
    }

    /// Delete a NetApp account and wait for the operation to finish
    pub async fn delete_account(&self, resource_group: &str, account: &str) -> Result<()> {
        self.arm
            .delete(
                &account_path(&self.subscription, resource_group, account),
                NETAPP_API_VERSION,
            )
            .await
    }
}
