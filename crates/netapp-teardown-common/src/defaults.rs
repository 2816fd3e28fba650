//! Default configuration values shared across netapp-teardown components

use std::time::Duration;

/// Default number of accounts torn down concurrently
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Total attempts at deleting an account while nested resources are still settling
pub const ACCOUNT_DELETE_MAX_ATTEMPTS: usize = 3;

/// Fixed wait between account deletion attempts
pub const ACCOUNT_DELETE_RETRY_DELAY: Duration = Duration::from_secs(30);

/// CA bundle variable that conflicts with the TLS trust configuration of the HTTP client
pub const CA_BUNDLE_ENV_VAR: &str = "REQUESTS_CA_BUNDLE";

/// Azure Resource Manager endpoint
pub const ARM_ENDPOINT: &str = "https://management.azure.com";

/// Token audience for Azure Resource Manager
pub const ARM_TOKEN_RESOURCE: &str = "https://management.azure.com/";

/// `Microsoft.NetApp` resource provider API version
pub const NETAPP_API_VERSION: &str = "2024-07-01";

/// `Microsoft.Resources` resource group API version
pub const RESOURCE_GROUPS_API_VERSION: &str = "2021-04-01";
