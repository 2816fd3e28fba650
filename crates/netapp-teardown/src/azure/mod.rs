//! Azure client modules
//!
//! This module provides thin Azure Resource Manager adapters for:
//! - credentials (service principal, managed identity, Azure CLI) and
//!   subscription resolution
//! - NetApp Files accounts, pools, volumes, backup vaults and backups
//! - resource groups

pub mod arm;
pub mod context;
pub mod credential;
pub mod error;
pub mod netapp;
pub mod operations;
pub mod resources;
pub mod subscription;

pub use arm::{ArmClient, ArmResource, RetryConfig};
pub use context::AzureContext;
pub use credential::{AzureCredential, TokenSource};
pub use netapp::NetAppClient;
pub use operations::{NetAppOperations, ResourceGroupOperations};
pub use resources::ResourceGroupClient;
pub use subscription::SubscriptionId;

// Error handling
pub use error::{ArmError, classify_anyhow_error, ignore_not_found};
