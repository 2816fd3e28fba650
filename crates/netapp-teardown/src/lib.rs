//! netapp-teardown: ordered, parallel teardown of Azure NetApp Files accounts
//!
//! Deletes every NetApp account in a subscription together with its volumes,
//! backups and backup vaults, then the resource group that held it.

pub mod azure;
pub mod config;
pub mod error;
pub mod logging;
pub mod prompt;
pub mod status;
pub mod teardown;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

pub use error::TeardownError;
