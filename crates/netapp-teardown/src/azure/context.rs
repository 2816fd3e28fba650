//! Shared Azure context
//!
//! Resolves credentials and the subscription once, then hands out clients
//! that share one HTTP connection pool and token cache.

use super::arm::ArmClient;
use super::credential::AzureCredential;
use super::netapp::NetAppClient;
use super::resources::ResourceGroupClient;
use super::subscription::{SubscriptionId, resolve_subscription};
use crate::wait::WaitConfig;
use anyhow::{Context, Result};
use netapp_teardown_common::defaults::{ARM_ENDPOINT, ARM_TOKEN_RESOURCE};
use std::sync::Arc;

/// Shared Azure configuration for creating service clients.
///
/// # Example
/// ```ignore
/// let azure = AzureContext::new().await?;
///
/// let netapp = azure.netapp_client();
/// let groups = azure.resource_group_client();
/// ```
#[derive(Clone)]
pub struct AzureContext {
    http: reqwest::Client,
    credential: Arc<AzureCredential>,
    subscription: SubscriptionId,
    endpoint: String,
    wait: WaitConfig,
}

impl AzureContext {
    /// Load credentials from the environment's credential chain and resolve
    /// the subscription.
    pub async fn new() -> Result<Self> {
        let http = http_client()?;
        let credential = Arc::new(AzureCredential::from_env(http.clone(), ARM_TOKEN_RESOURCE));
        let arm = ArmClient::new(
            http.clone(),
            Arc::clone(&credential),
            ARM_ENDPOINT,
            WaitConfig::default(),
        );
        let subscription = resolve_subscription(&credential, &arm).await?;
        Ok(Self::from_parts(http, credential, subscription))
    }

    /// Build a context for a known subscription.
    pub fn with_subscription(
        credential: Arc<AzureCredential>,
        subscription: SubscriptionId,
    ) -> Result<Self> {
        Ok(Self::from_parts(http_client()?, credential, subscription))
    }

    fn from_parts(
        http: reqwest::Client,
        credential: Arc<AzureCredential>,
        subscription: SubscriptionId,
    ) -> Self {
        Self {
            http,
            credential,
            subscription,
            endpoint: ARM_ENDPOINT.to_string(),
            wait: WaitConfig::default(),
        }
    }

    /// The subscription every client is scoped to.
    pub fn subscription(&self) -> &SubscriptionId {
        &self.subscription
    }

    fn arm(&self) -> ArmClient {
        ArmClient::new(
            self.http.clone(),
            Arc::clone(&self.credential),
            &self.endpoint,
            self.wait.clone(),
        )
    }

    /// Create a NetApp Files client from this context.
    pub fn netapp_client(&self) -> NetAppClient {
        NetAppClient::new(self.arm(), self.subscription.clone())
    }

    /// Create a resource group client from this context.
    pub fn resource_group_client(&self) -> ResourceGroupClient {
        ResourceGroupClient::new(self.arm(), self.subscription.clone())
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("netapp-teardown/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

impl std::fmt::Debug for AzureContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureContext")
            .field("subscription", &self.subscription)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
