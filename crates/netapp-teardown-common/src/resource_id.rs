//! Typed ARM resource identifiers
//!
//! Account identifiers have the shape
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`.
//! Splitting on `/` puts the subscription at position 2, the resource group at
//! position 4 and the resource name in the last segment.

use std::fmt;
use thiserror::Error;

/// Minimum number of `/`-separated segments needed to reach the resource group.
const MIN_SEGMENTS: usize = 5;

const SUBSCRIPTION_SEGMENT: usize = 2;
const RESOURCE_GROUP_SEGMENT: usize = 4;
const NAMESPACE_SEGMENT: usize = 6;
const TYPE_SEGMENT: usize = 7;

/// Identifier parse failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdError {
    /// Not enough segments to locate the resource group
    #[error("expected at least {} '/'-separated segments, found {found}", MIN_SEGMENTS)]
    TooFewSegments { found: usize },

    /// The resource group segment is empty
    #[error("resource group segment is empty")]
    EmptyResourceGroup,

    /// The trailing name segment is empty
    #[error("resource name segment is empty")]
    EmptyName,
}

/// A parsed ARM resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    raw: String,
    subscription_id: String,
    resource_group: String,
    resource_kind: Option<String>,
    name: String,
}

impl ResourceId {
    /// Parse an identifier into its fixed-position parts.
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let segments: Vec<&str> = id.split('/').collect();
        if segments.len() < MIN_SEGMENTS {
            return Err(ResourceIdError::TooFewSegments {
                found: segments.len(),
            });
        }

        let resource_group = segments[RESOURCE_GROUP_SEGMENT];
        if resource_group.is_empty() {
            return Err(ResourceIdError::EmptyResourceGroup);
        }

        let name = segments.last().copied().unwrap_or_default();
        if name.is_empty() {
            return Err(ResourceIdError::EmptyName);
        }

        let resource_kind = match (
            segments.get(NAMESPACE_SEGMENT),
            segments.get(TYPE_SEGMENT),
        ) {
            (Some(ns), Some(ty)) if !ns.is_empty() && !ty.is_empty() => Some(format!("{ns}/{ty}")),
            _ => None,
        };

        Ok(Self {
            raw: id.to_string(),
            subscription_id: segments[SUBSCRIPTION_SEGMENT].to_string(),
            resource_group: resource_group.to_string(),
            resource_kind,
            name: name.to_string(),
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    /// Provider namespace and type, e.g. `Microsoft.NetApp/netAppAccounts`
    pub fn resource_kind(&self) -> Option<&str> {
        self.resource_kind.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
