//! In-memory provider for teardown tests.
//!
//! Holds a small NetApp inventory, records every call, and can inject
//! failures, nested-resource conflicts, surviving vaults, latency and panics.

use crate::azure::arm::ArmResource;
use crate::azure::error::{ArmError, NESTED_RESOURCES_MESSAGE, classify_arm_error};
use crate::azure::operations::{NetAppOperations, ResourceGroupOperations};
use anyhow::{Result, anyhow};
use netapp_teardown_common::ChildName;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One account's inventory
#[derive(Debug, Clone, Default)]
pub struct FakeAccount {
    pub resource_group: String,
    /// pool -> volumes
    pub pools: BTreeMap<String, Vec<String>>,
    /// vault -> backups
    pub vaults: BTreeMap<String, Vec<String>>,
}

impl FakeAccount {
    pub fn in_group(resource_group: &str) -> Self {
        Self {
            resource_group: resource_group.to_string(),
            ..Default::default()
        }
    }

    pub fn with_pool(mut self, pool: &str, volumes: &[&str]) -> Self {
        self.pools
            .insert(pool.to_string(), volumes.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn with_vault(mut self, vault: &str, backups: &[&str]) -> Self {
        self.vaults
            .insert(vault.to_string(), backups.iter().map(|b| b.to_string()).collect());
        self
    }
}

pub fn account_id(resource_group: &str, account: &str) -> String {
    format!(
        "/subscriptions/sub-1/resourceGroups/{resource_group}/providers/Microsoft.NetApp/netAppAccounts/{account}"
    )
}

#[derive(Default)]
struct Inventory {
    accounts: BTreeMap<String, FakeAccount>,
    deleted_groups: HashSet<String>,
}

#[derive(Default)]
pub struct FakeProvider {
    inventory: Mutex<Inventory>,
    /// Accounts listed with a raw identifier instead of a well-formed one
    raw_ids: Mutex<Vec<ArmResource>>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, String>>,
    panics: Mutex<HashSet<String>>,
    conflicts: Mutex<HashMap<String, usize>>,
    surviving_vaults: Mutex<HashSet<String>>,
    latency: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, name: &str, account: FakeAccount) -> Self {
        self.inventory
            .lock()
            .unwrap()
            .accounts
            .insert(name.to_string(), account);
        self
    }

    /// List an extra account whose identifier is taken verbatim
    pub fn with_raw_account(self, id: &str, name: &str) -> Self {
        self.raw_ids.lock().unwrap().push(ArmResource {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Fail the call recorded as `key` with `message`
    pub fn fail(self, key: &str, message: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(key.to_string(), message.to_string());
        self
    }

    /// Panic when the call recorded as `key` is made
    pub fn panic_on(self, key: &str) -> Self {
        self.panics.lock().unwrap().insert(key.to_string());
        self
    }

    /// Reject the next `times` deletions of `account` with the nested-resources conflict
    pub fn nested_conflicts(self, account: &str, times: usize) -> Self {
        self.conflicts
            .lock()
            .unwrap()
            .insert(account.to_string(), times);
        self
    }

    /// Keep `account/vault` fetchable after its deletion is acknowledged
    pub fn vault_survives(self, account: &str, vault: &str) -> Self {
        self.surviving_vaults
            .lock()
            .unwrap()
            .insert(format!("{account}/{vault}"));
        self
    }

    /// Make every call take `latency` of (virtual) time
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock().unwrap() = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose path is `account` or lies beneath it
    pub fn calls_for(&self, account: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                c.split_once(':')
                    .map(|(_, path)| path == account || path.starts_with(&format!("{account}/")))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split_once(':').map(|(o, _)| o) == Some(op))
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn remaining_volumes(&self, account: &str) -> usize {
        self.inventory
            .lock()
            .unwrap()
            .accounts
            .get(account)
            .map(|a| a.pools.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn account_exists(&self, account: &str) -> bool {
        self.inventory.lock().unwrap().accounts.contains_key(account)
    }

    pub fn group_deleted(&self, resource_group: &str) -> bool {
        self.inventory
            .lock()
            .unwrap()
            .deleted_groups
            .contains(resource_group)
    }

    /// Record the call, simulate latency, then apply injected faults.
    async fn enter(&self, op: &str, path: &str) -> Result<()> {
        let key = format!("{op}:{path}");
        self.calls.lock().unwrap().push(key.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panics.lock().unwrap().contains(&key) {
            panic!("injected panic at {key}");
        }
        if let Some(message) = self.failures.lock().unwrap().get(&key) {
            return Err(anyhow!(ArmError::Api {
                status: 500,
                code: Some("InternalServerError".to_string()),
                message: message.clone(),
            }));
        }
        Ok(())
    }

    fn not_found(path: &str) -> anyhow::Error {
        anyhow!(ArmError::NotFound {
            message: format!("'{path}' was not found"),
        })
    }

    fn children<F>(&self, account: &str, pick: F) -> Result<Vec<ChildName>>
    where
        F: FnOnce(&FakeAccount) -> Vec<String>,
    {
        let inventory = self.inventory.lock().unwrap();
        let acct = inventory
            .accounts
            .get(account)
            .ok_or_else(|| Self::not_found(account))?;
        Ok(pick(acct).into_iter().map(ChildName::new).collect())
    }
}

impl NetAppOperations for FakeProvider {
    async fn list_accounts(&self) -> Result<Vec<ArmResource>> {
        self.enter("list_accounts", "*").await?;
        let inventory = self.inventory.lock().unwrap();
        let mut accounts: Vec<ArmResource> = inventory
            .accounts
            .iter()
            .map(|(name, a)| ArmResource {
                id: account_id(&a.resource_group, name),
                name: name.clone(),
            })
            .collect();
        accounts.extend(self.raw_ids.lock().unwrap().iter().cloned());
        Ok(accounts)
    }

    async fn list_pools(&self, _resource_group: &str, account: &str) -> Result<Vec<ChildName>> {
        self.enter("list_pools", account).await?;
        self.children(account, |a| {
            a.pools.keys().map(|p| format!("{account}/{p}")).collect()
        })
    }

    async fn list_volumes(
        &self,
        _resource_group: &str,
        account: &str,
        pool: &str,
    ) -> Result<Vec<ChildName>> {
        self.enter("list_volumes", &format!("{account}/{pool}")).await?;
        self.children(account, |a| {
            a.pools
                .get(pool)
                .map(|vols| {
                    vols.iter()
                        .map(|v| format!("{account}/{pool}/{v}"))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    async fn delete_volume(
        &self,
        _resource_group: &str,
        account: &str,
        pool: &str,
        volume: &str,
    ) -> Result<()> {
        let path = format!("{account}/{pool}/{volume}");
        self.enter("delete_volume", &path).await?;
        let mut inventory = self.inventory.lock().unwrap();
        let volumes = inventory
            .accounts
            .get_mut(account)
            .and_then(|a| a.pools.get_mut(pool))
            .ok_or_else(|| Self::not_found(&path))?;
        volumes.retain(|v| v != volume);
        Ok(())
    }

    async fn list_backup_vaults(
        &self,
        _resource_group: &str,
        account: &str,
    ) -> Result<Vec<ChildName>> {
        self.enter("list_backup_vaults", account).await?;
        self.children(account, |a| {
            a.vaults.keys().map(|v| format!("{account}/{v}")).collect()
        })
    }

    async fn list_backups(
        &self,
        _resource_group: &str,
        account: &str,
        vault: &str,
    ) -> Result<Vec<ChildName>> {
        self.enter("list_backups", &format!("{account}/{vault}")).await?;
        self.children(account, |a| {
            a.vaults
                .get(vault)
                .map(|backups| {
                    backups
                        .iter()
                        .map(|b| format!("{account}/{vault}/{b}"))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    async fn delete_backup(
        &self,
        _resource_group: &str,
        account: &str,
        vault: &str,
        backup: &str,
    ) -> Result<()> {
        let path = format!("{account}/{vault}/{backup}");
        self.enter("delete_backup", &path).await?;
        let mut inventory = self.inventory.lock().unwrap();
        let backups = inventory
            .accounts
            .get_mut(account)
            .and_then(|a| a.vaults.get_mut(vault))
            .ok_or_else(|| Self::not_found(&path))?;
        backups.retain(|b| b != backup);
        Ok(())
    }

    async fn delete_backup_vault(
        &self,
        _resource_group: &str,
        account: &str,
        vault: &str,
    ) -> Result<()> {
        let path = format!("{account}/{vault}");
        self.enter("delete_backup_vault", &path).await?;
        if self.surviving_vaults.lock().unwrap().contains(&path) {
            return Ok(());
        }
        let mut inventory = self.inventory.lock().unwrap();
        inventory
            .accounts
            .get_mut(account)
            .and_then(|a| a.vaults.remove(vault))
            .ok_or_else(|| Self::not_found(&path))?;
        Ok(())
    }

    async fn get_backup_vault(
        &self,
        _resource_group: &str,
        account: &str,
        vault: &str,
    ) -> Result<ArmResource> {
        let path = format!("{account}/{vault}");
        self.enter("get_backup_vault", &path).await?;
        let inventory = self.inventory.lock().unwrap();
        match inventory.accounts.get(account) {
            Some(a) if a.vaults.contains_key(vault) => Ok(ArmResource {
                id: format!("{}/backupVaults/{vault}", account_id(&a.resource_group, account)),
                name: path,
            }),
            _ => Err(Self::not_found(&path)),
        }
    }

    async fn delete_account(&self, _resource_group: &str, account: &str) -> Result<()> {
        self.enter("delete_account", account).await?;

        {
            let mut conflicts = self.conflicts.lock().unwrap();
            let remaining = conflicts.entry(account.to_string()).or_default();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(anyhow!(classify_arm_error(
                    409,
                    Some("Conflict"),
                    Some(&format!("{NESTED_RESOURCES_MESSAGE}: {account}")),
                )));
            }
        }

        let mut inventory = self.inventory.lock().unwrap();
        let acct = inventory
            .accounts
            .get(account)
            .ok_or_else(|| Self::not_found(account))?;
        let has_children =
            acct.pools.values().any(|v| !v.is_empty()) || !acct.vaults.is_empty();
        if has_children {
            return Err(anyhow!(ArmError::NestedResourcesExist {
                message: NESTED_RESOURCES_MESSAGE.to_string(),
            }));
        }
        inventory.accounts.remove(account);
        Ok(())
    }
}

impl ResourceGroupOperations for FakeProvider {
    async fn delete_resource_group(&self, resource_group: &str) -> Result<()> {
        self.enter("delete_resource_group", resource_group).await?;
        self.inventory
            .lock()
            .unwrap()
            .deleted_groups
            .insert(resource_group.to_string());
        Ok(())
    }
}
