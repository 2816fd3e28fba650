//! Teardown errors
//!
//! Every stage of a cascade returns one of these. The first one produced by
//! any task is the error surfaced at the process boundary.

use netapp_teardown_common::{ResourceIdError, ResourceKind};
use thiserror::Error;

/// Teardown failures
#[derive(Debug, Error)]
pub enum TeardownError {
    /// An account identifier could not be split into resource group and name
    #[error("Malformed resource identifier '{id}'")]
    MalformedIdentifier {
        id: String,
        #[source]
        source: ResourceIdError,
    },

    /// A provider list, get or delete call failed
    #[error("Failed to {action} {kind} '{path}'")]
    ProviderOperationFailed {
        action: &'static str,
        kind: ResourceKind,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// Account deletion hit the nested-resources conflict
    #[error("Cannot delete {kind} '{path}' while nested resources exist")]
    NestedResourcesConflict {
        kind: ResourceKind,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// A deleted backup vault could still be fetched
    #[error("Backup vault '{path}' deletion failed - resource still exists")]
    PostDeleteInconsistency { path: String },

    /// No subscription is visible to the current credentials
    #[error("No subscriptions found. Please ensure you have access to at least one subscription.")]
    NoScopeFound,

    /// The operator's answer could not be read
    #[error("Failed to read confirmation")]
    ConfirmationFailed {
        #[source]
        source: anyhow::Error,
    },

    /// A worker task panicked before reporting an outcome
    #[error("Teardown task for '{account}' panicked")]
    TaskPanicked {
        account: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl TeardownError {
    /// Build a provider failure for `action` on the resource at `path`.
    pub fn provider(
        action: &'static str,
        kind: ResourceKind,
        path: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        TeardownError::ProviderOperationFailed {
            action,
            kind,
            path: path.into(),
            source,
        }
    }

    /// Check if this is the retryable nested-resources conflict
    pub fn is_nested_resources_conflict(&self) -> bool {
        matches!(self, TeardownError::NestedResourcesConflict { .. })
    }

    /// Turn an exhausted nested-resources conflict into a plain provider failure.
    pub fn into_exhausted(self) -> Self {
        match self {
            TeardownError::NestedResourcesConflict { kind, path, source } => {
                TeardownError::ProviderOperationFailed {
                    action: "delete",
                    kind,
                    path,
                    source,
                }
            }
            other => other,
        }
    }
}
