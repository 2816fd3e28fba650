//! Provider operations traits for testing
//!
//! The teardown logic only talks to these traits, so it can be exercised
//! against an in-memory provider without reaching Azure.

use super::arm::ArmResource;
use super::netapp::NetAppClient;
use super::resources::ResourceGroupClient;
use anyhow::Result;
use netapp_teardown_common::ChildName;
use std::future::Future;

/// NetApp Files operations used by the cascade.
///
/// Every delete blocks until the provider reports the operation complete.
pub trait NetAppOperations: Send + Sync {
    /// List all accounts in the subscription
    fn list_accounts(&self) -> impl Future<Output = Result<Vec<ArmResource>>> + Send;

    fn list_pools(
        &self,
        resource_group: &str,
        account: &str,
    ) -> impl Future<Output = Result<Vec<ChildName>>> + Send;

    fn list_volumes(
        &self,
        resource_group: &str,
        account: &str,
        pool: &str,
    ) -> impl Future<Output = Result<Vec<ChildName>>> + Send;

    fn delete_volume(
        &self,
        resource_group: &str,
        account: &str,
        pool: &str,
        volume: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    fn list_backup_vaults(
        &self,
        resource_group: &str,
        account: &str,
    ) -> impl Future<Output = Result<Vec<ChildName>>> + Send;

    fn list_backups(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
    ) -> impl Future<Output = Result<Vec<ChildName>>> + Send;

    fn delete_backup(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
        backup: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_backup_vault(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Fetch a backup vault; a deleted vault yields a not-found error
    fn get_backup_vault(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
    ) -> impl Future<Output = Result<ArmResource>> + Send;

    fn delete_account(
        &self,
        resource_group: &str,
        account: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Resource group operations used by the cascade.
pub trait ResourceGroupOperations: Send + Sync {
    fn delete_resource_group(&self, resource_group: &str)
    -> impl Future<Output = Result<()>> + Send;
}

impl NetAppOperations for NetAppClient {
    async fn list_accounts(&self) -> Result<Vec<ArmResource>> {
        NetAppClient::list_accounts(self).await
    }

    async fn list_pools(&self, resource_group: &str, account: &str) -> Result<Vec<ChildName>> {
        NetAppClient::list_pools(self, resource_group, account).await
    }

    async fn list_volumes(
        &self,
        resource_group: &str,
        account: &str,
        pool: &str,
    ) -> Result<Vec<ChildName>> {
        NetAppClient::list_volumes(self, resource_group, account, pool).await
    }

    async fn delete_volume(
        &self,
        resource_group: &str,
        account: &str,
        pool: &str,
        volume: &str,
    ) -> Result<()> {
        NetAppClient::delete_volume(self, resource_group, account, pool, volume).await
    }

    async fn list_backup_vaults(
        &self,
        resource_group: &str,
        account: &str,
    ) -> Result<Vec<ChildName>> {
        NetAppClient::list_backup_vaults(self, resource_group, account).await
    }

    async fn list_backups(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
    ) -> Result<Vec<ChildName>> {
        NetAppClient::list_backups(self, resource_group, account, vault).await
    }

    async fn delete_backup(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
        backup: &str,
    ) -> Result<()> {
        NetAppClient::delete_backup(self, resource_group, account, vault, backup).await
    }

    async fn delete_backup_vault(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
    ) -> Result<()> {
        NetAppClient::delete_backup_vault(self, resource_group, account, vault).await
    }

    async fn get_backup_vault(
        &self,
        resource_group: &str,
        account: &str,
        vault: &str,
    ) -> Result<ArmResource> {
        NetAppClient::get_backup_vault(self, resource_group, account, vault).await
    }

    async fn delete_account(&self, resource_group: &str, account: &str) -> Result<()> {
        NetAppClient::delete_account(self, resource_group, account).await
    }
}

impl ResourceGroupOperations for ResourceGroupClient {
    async fn delete_resource_group(&self, resource_group: &str) -> Result<()> {
        ResourceGroupClient::delete_resource_group(self, resource_group).await
    }
}
