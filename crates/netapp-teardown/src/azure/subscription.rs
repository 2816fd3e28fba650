//! Subscription resolution

use super::arm::ArmClient;
use super::credential::{AzureCredential, SubscriptionInfo, TokenSource};
use crate::error::TeardownError;
use anyhow::Result;
use serde::Deserialize;
use tracing::info;

const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";

/// Subscription as listed by Resource Manager
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmSubscription {
    subscription_id: String,
    #[serde(default)]
    display_name: String,
}

impl From<ArmSubscription> for SubscriptionInfo {
    fn from(sub: ArmSubscription) -> Self {
        SubscriptionInfo {
            id: sub.subscription_id,
            name: sub.display_name,
            is_default: false,
        }
    }
}

/// Strongly-typed Azure subscription ID
///
/// Keeps the subscription scope from being mixed up with other identifiers
/// once it has been resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::Deref)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        SubscriptionId(id.into())
    }
}

/// Pick the subscription to operate on.
///
/// A single visible subscription is used as-is. With several, the one
/// flagged as default wins, else the first one listed.
pub fn select_subscription(subscriptions: &[SubscriptionInfo]) -> Result<SubscriptionId, TeardownError> {
    let chosen = match subscriptions {
        [] => return Err(TeardownError::NoScopeFound),
        [only] => only,
        [first, ..] => subscriptions
            .iter()
            .find(|s| s.is_default)
            .unwrap_or(first),
    };
    Ok(SubscriptionId(chosen.id.clone()))
}

/// Resolve the subscription to operate on.
///
/// A CLI login knows its default subscription, so the CLI lists them. Any
/// other credential lists them through Resource Manager.
pub async fn resolve_subscription(
    credential: &AzureCredential,
    arm: &ArmClient,
) -> Result<SubscriptionId> {
    credential.token().await?;
    let subscriptions = match credential.active_source().await {
        Some(TokenSource::AzureCli) => credential.list_cli_subscriptions().await?,
        _ => arm
            .list::<ArmSubscription>("/subscriptions", SUBSCRIPTIONS_API_VERSION)
            .await?
            .into_iter()
            .map(SubscriptionInfo::from)
            .collect(),
    };
    let subscription = select_subscription(&subscriptions)?;
    info!(subscription_id = %subscription, "Using subscription");
    Ok(subscription)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(id: &str, is_default: bool) -> SubscriptionInfo {
        SubscriptionInfo {
            id: id.to_string(),
            name: format!("name-{id}"),
            is_default,
        }
    }

    #[test]
    fn test_no_subscriptions() {
        assert!(matches!(
            select_subscription(&[]),
            Err(TeardownError::NoScopeFound)
        ));
    }

    #[test]
    fn test_single_subscription_used_even_if_not_default() {
        let chosen = select_subscription(&[sub("only", false)]).unwrap();
        assert_eq!(chosen, SubscriptionId::new("only"));
    }

    #[test]
    fn test_default_preferred_among_many() {
        let subs = [sub("a", false), sub("b", true), sub("c", false)];
        assert_eq!(*select_subscription(&subs).unwrap(), "b");
    }

    #[test]
    fn test_arm_listing_has_no_default() {
        let json = r#"{"value": [
            {"id": "/subscriptions/s1", "subscriptionId": "s1", "displayName": "One", "state": "Enabled"},
            {"id": "/subscriptions/s2", "subscriptionId": "s2", "displayName": "Two", "state": "Enabled"}
        ]}"#;
        let page: crate::azure::arm::Page<ArmSubscription> = serde_json::from_str(json).unwrap();
        let subs: Vec<SubscriptionInfo> = page.value.into_iter().map(Into::into).collect();
        assert_eq!(subs[1].name, "Two");
        assert!(subs.iter().all(|s| !s.is_default));
        assert_eq!(*select_subscription(&subs).unwrap(), "s1");
    }

    #[test]
    fn test_first_used_without_default() {
        let subs = [sub("a", false), sub("b", false)];
        assert_eq!(select_subscription(&subs).unwrap().to_string(), "a");
    }
}
