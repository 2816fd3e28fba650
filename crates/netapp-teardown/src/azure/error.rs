//! ARM error classification and handling
//!
//! Provides typed errors for Azure Resource Manager responses using the
//! status code and the `error.code` field of the response body, with a
//! message-based fallback for errors that only survive as text.

use serde::Deserialize;
use thiserror::Error;

/// Message ARM returns when deleting an account that still has children
pub const NESTED_RESOURCES_MESSAGE: &str = "Cannot delete resource while nested resources exist";

/// ARM error categories for retry and existence checks
#[derive(Debug, Clone, Error)]
pub enum ArmError {
    /// Resource was not found
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Parent still has nested resources (settles once child deletions propagate)
    #[error("{message}")]
    NestedResourcesExist { message: String },

    /// Request rate exceeded
    #[error("Rate limit exceeded: {message}")]
    Throttled { message: String },

    /// Any other ARM failure
    #[error("ARM error (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A long-running operation finished in a non-success state
    #[error("Operation ended with status '{status}': {message}")]
    OperationFailed { status: String, message: String },
}

impl ArmError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArmError::NotFound { .. })
    }

    /// Check if this is the nested-resources conflict
    pub fn is_nested_resources(&self) -> bool {
        matches!(self, ArmError::NestedResourcesExist { .. })
    }

    /// Check if this is a throttling error
    pub fn is_throttled(&self) -> bool {
        matches!(self, ArmError::Throttled { .. })
    }

    /// Check if repeating the same request may succeed: throttling, request
    /// timeouts and gateway/server errors. The nested-resources conflict is
    /// never included; the account stage handles it.
    pub fn is_retryable(&self) -> bool {
        match self {
            ArmError::Throttled { .. } => true,
            ArmError::Api { status, .. } => matches!(status, 408 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

/// Known ARM error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &["ResourceNotFound", "ResourceGroupNotFound", "NotFound"];

/// Known ARM error codes for throttling
const THROTTLING_CODES: &[&str] = &["TooManyRequests", "SubscriptionRequestsThrottled"];

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Classify an ARM failure from its HTTP status, error code and message.
pub fn classify_arm_error(status: u16, code: Option<&str>, message: Option<&str>) -> ArmError {
    let message = message.unwrap_or("Unknown error").to_string();

    if message.contains(NESTED_RESOURCES_MESSAGE) {
        return ArmError::NestedResourcesExist { message };
    }

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => ArmError::NotFound { message },
        Some(c) if THROTTLING_CODES.contains(&c) => ArmError::Throttled { message },
        _ if status == 404 => ArmError::NotFound { message },
        _ if status == 429 => ArmError::Throttled { message },
        _ => ArmError::Api {
            status,
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify a failed response body. Bodies that are not an ARM error
/// envelope are used verbatim as the message.
pub fn classify_response(status: u16, body: &str) -> ArmError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: Some(ErrorBody { code, message }),
        }) => classify_arm_error(status, code.as_deref(), message.as_deref()),
        _ => {
            let message = if body.trim().is_empty() {
                None
            } else {
                Some(body.trim())
            };
            classify_arm_error(status, None, message)
        }
    }
}

/// Classify an error from an anyhow::Error.
///
/// Walks the error chain looking for an [`ArmError`]. Falls back to matching
/// the rendered chain for the nested-resources message so that errors which
/// only carry text are still recognized.
pub fn classify_anyhow_error(error: &anyhow::Error) -> ArmError {
    for cause in error.chain() {
        if let Some(arm) = cause.downcast_ref::<ArmError>() {
            return match arm {
                // A failed delete operation can carry the conflict in its message
                ArmError::OperationFailed { message, .. }
                    if message.contains(NESTED_RESOURCES_MESSAGE) =>
                {
                    ArmError::NestedResourcesExist {
                        message: message.clone(),
                    }
                }
                other => other.clone(),
            };
        }
    }

    let rendered = format!("{:#}", error);
    if rendered.contains(NESTED_RESOURCES_MESSAGE) {
        return ArmError::NestedResourcesExist { message: rendered };
    }

    ArmError::Api {
        status: 0,
        code: None,
        message: rendered,
    }
}

/// Convert a not-found error into `Ok(None)`, passing everything else through.
pub fn ignore_not_found<T>(result: anyhow::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if classify_anyhow_error(&e).is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
