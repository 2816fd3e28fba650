//! Azure NetApp resource kinds and deletion ordering
//!
//! Provides one ordering for the whole cascade. Children must be gone before
//! their parent can be deleted, so lower priorities are deleted first.

use std::fmt;

/// Kinds of resources touched during a teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Volume inside a capacity pool
    Volume,
    /// Capacity pool (enumerated to reach volumes, never deleted directly)
    CapacityPool,
    /// Backup inside a backup vault
    Backup,
    /// Backup vault (must be empty before deletion)
    BackupVault,
    /// NetApp account (must have no nested resources)
    NetAppAccount,
    /// Resource group holding the account
    ResourceGroup,
}

impl ResourceKind {
    /// Get cleanup priority (lower number = cleanup first)
    ///
    /// - 0: Volumes (and the pools they are listed from)
    /// - 1: Backups
    /// - 2: Backup vaults
    /// - 3: NetApp account
    /// - 4: Resource group
    pub fn cleanup_priority(self) -> u8 {
        match self {
            ResourceKind::Volume | ResourceKind::CapacityPool => 0,
            ResourceKind::Backup => 1,
            ResourceKind::BackupVault => 2,
            ResourceKind::NetAppAccount => 3,
            ResourceKind::ResourceGroup => 4,
        }
    }

    /// Human-readable label for log lines
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Volume => "volume",
            ResourceKind::CapacityPool => "capacity pool",
            ResourceKind::Backup => "backup",
            ResourceKind::BackupVault => "backup vault",
            ResourceKind::NetAppAccount => "NetApp account",
            ResourceKind::ResourceGroup => "resource group",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
