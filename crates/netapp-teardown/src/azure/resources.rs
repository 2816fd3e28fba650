//! Resource group management

use super::arm::ArmClient;
use super::subscription::SubscriptionId;
use anyhow::Result;
use netapp_teardown_common::defaults::RESOURCE_GROUPS_API_VERSION;

pub fn resource_group_path(subscription: &str, resource_group: &str) -> String {
    format!("/subscriptions/{subscription}/resourcegroups/{resource_group}")
}

/// Resource group client scoped to one subscription
#[derive(Debug, Clone)]
pub struct ResourceGroupClient {
    arm: ArmClient,
    subscription: SubscriptionId,
}

impl ResourceGroupClient {
    pub fn new(arm: ArmClient, subscription: SubscriptionId) -> Self {
        Self { arm, subscription }
    }

    /// Delete a resource group and everything left in it, waiting for completion
    pub async fn delete_resource_group(&self, resource_group: &str) -> Result<()> {
        self.arm
            .delete(
                &resource_group_path(&self.subscription, resource_group),
                RESOURCE_GROUPS_API_VERSION,
            )
            .await
    }
}
