//! Minimal Azure Resource Manager REST client
//!
//! Covers what a teardown needs: paged list, get, and long-running delete
//! polled to completion.

use super::credential::AzureCredential;
use super::error::{ArmError, ErrorBody, classify_anyhow_error, classify_response};
use crate::wait::{Poll, WaitConfig, wait_for_resource};
use anyhow::{Context, Result};
use backon::{BackoffBuilder, ExponentialBuilder};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Tracing target for request/response logging, enabled by `--verbose`
pub const HTTP_TRACE_TARGET: &str = "netapp_teardown::azure::http";

const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";
const LOCATION_HEADER: &str = "location";

/// One page of an ARM list response
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink")]
    pub next_link: Option<String>,
}

/// The fields of an ARM resource the teardown needs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArmResource {
    /// Full ARM identifier
    pub id: String,
    /// Name as listed; children come back qualified by their parents
    pub name: String,
}

/// Body of an `Azure-AsyncOperation` status resource
#[derive(Debug, Deserialize)]
pub struct OperationStatus {
    pub status: String,
    pub error: Option<ErrorBody>,
}

/// How to follow a long-running operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationTracker {
    /// Poll a status resource until it reports a terminal state
    AsyncOperation(String),
    /// Poll the location until it stops answering 202
    Location(String),
}

/// Pick the polling strategy for an accepted request, or `None` when the
/// response is already final.
pub fn operation_tracker(status: StatusCode, headers: &HeaderMap) -> Option<OperationTracker> {
    if status != StatusCode::ACCEPTED && status != StatusCode::CREATED {
        return None;
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    header(ASYNC_OPERATION_HEADER)
        .map(OperationTracker::AsyncOperation)
        .or_else(|| header(LOCATION_HEADER).map(OperationTracker::Location))
}

/// Provider-suggested polling interval
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Interpret an async operation status: `Ok(true)` when it succeeded,
/// `Ok(false)` while it is still running.
pub fn operation_finished(op: &OperationStatus) -> Result<bool, ArmError> {
    match op.status.to_ascii_lowercase().as_str() {
        "succeeded" => Ok(true),
        "failed" | "canceled" | "cancelled" => {
            let message = op
                .error
                .as_ref()
                .map(|e| {
                    format!(
                        "({}) {}",
                        e.code.as_deref().unwrap_or("Unknown"),
                        e.message.as_deref().unwrap_or("no details")
                    )
                })
                .unwrap_or_else(|| "no details".to_string());
            Err(ArmError::OperationFailed {
                status: op.status.clone(),
                message,
            })
        }
        _ => Ok(false),
    }
}

/// Retry policy for transient request failures (throttling, 408, 5xx,
/// dropped connections)
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    pub initial_delay: Duration,
    /// Cap for both the backoff and a provider-supplied `Retry-After`
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Delay before retrying: the provider's `Retry-After` when given, else the
/// backoff step, never above `max_delay`.
pub fn retry_delay(retry_after: Option<Duration>, backoff: Duration, max_delay: Duration) -> Duration {
    retry_after.unwrap_or(backoff).min(max_delay)
}

/// Whether a failed request is worth repeating unchanged
pub fn is_transient(error: &anyhow::Error) -> bool {
    let dropped = error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .any(|e| e.is_timeout() || e.is_connect());

    dropped || classify_anyhow_error(error).is_retryable()
}

/// REST client shared by the resource-specific clients.
#[derive(Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    credential: Arc<AzureCredential>,
    endpoint: String,
    wait: WaitConfig,
    retry: RetryConfig,
}

impl ArmClient {
    pub fn new(
        http: reqwest::Client,
        credential: Arc<AzureCredential>,
        endpoint: &str,
        wait: WaitConfig,
    ) -> Self {
        Self {
            http,
            credential,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            wait,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.endpoint, path, api_version)
    }

    async fn send(&self, method: Method, url: &str) -> Result<reqwest::Response> {
        let token = self.credential.token().await?;

        debug!(target: HTTP_TRACE_TARGET, method = %method, url = %url, "Request");
        let response = self
            .http
            .request(method.clone(), url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("{method} {url} failed"))?;
        debug!(
            target: HTTP_TRACE_TARGET,
            method = %method,
            url = %url,
            status = response.status().as_u16(),
            "Response"
        );

        Ok(response)
    }

    async fn into_error(response: reqwest::Response) -> anyhow::Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!(target: HTTP_TRACE_TARGET, status, body = %body, "Error response");
        classify_response(status, &body).into()
    }

    /// Send a request, retrying transient failures. Only 2xx responses are
    /// returned; anything else becomes a classified [`ArmError`].
    async fn execute(&self, method: Method, url: &str) -> Result<reqwest::Response> {
        let mut delays = ExponentialBuilder::default()
            .with_min_delay(self.retry.initial_delay)
            .with_max_delay(self.retry.max_delay)
            .with_max_times(self.retry.max_retries)
            .with_jitter()
            .build();

        loop {
            let (error, suggested) = match self.send(method.clone(), url).await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let suggested = retry_after(response.headers());
                    (Self::into_error(response).await, suggested)
                }
                Err(e) => (e, None),
            };

            if !is_transient(&error) {
                return Err(error);
            }
            let Some(backoff) = delays.next() else {
                return Err(error);
            };

            let delay = retry_delay(suggested, backoff, self.retry.max_delay);
            warn!(
                method = %method,
                url = %url,
                delay = ?delay,
                error = %error,
                "Transient ARM error, retrying..."
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn get_url<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.execute(Method::GET, url).await?;
        response
            .json::<T>()
            .await
            .context("Failed to decode ARM response")
    }

    /// GET a single resource
    pub async fn get<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<T> {
        self.get_url(&self.url(path, api_version)).await
    }

    /// GET a collection, following `nextLink` until exhausted
    pub async fn list<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path, api_version));

        while let Some(url) = next {
            let page: Page<T> = self.get_url(&url).await?;
            items.extend(page.value);
            next = page.next_link.filter(|link| !link.is_empty());
        }

        Ok(items)
    }

    /// Issue a DELETE and wait for the provider to report completion
    pub async fn delete(&self, path: &str, api_version: &str) -> Result<()> {
        let response = self
            .execute(Method::DELETE, &self.url(path, api_version))
            .await?;
        let status = response.status();

        let Some(tracker) = operation_tracker(status, response.headers()) else {
            return Ok(());
        };

        wait_for_resource(&self.wait, || self.poll(&tracker), path).await
    }

    async fn poll(&self, tracker: &OperationTracker) -> Result<Poll> {
        match tracker {
            OperationTracker::AsyncOperation(url) => {
                let response = self.execute(Method::GET, url).await?;
                let suggested = retry_after(response.headers());
                let op: OperationStatus = response
                    .json()
                    .await
                    .context("Failed to decode operation status")?;
                if operation_finished(&op)? {
                    Ok(Poll::Done)
                } else {
                    Ok(Poll::Pending {
                        retry_after: suggested,
                    })
                }
            }
            OperationTracker::Location(url) => {
                let response = self.execute(Method::GET, url).await?;
                if response.status() == StatusCode::ACCEPTED {
                    Ok(Poll::Pending {
                        retry_after: retry_after(response.headers()),
                    })
                } else {
                    Ok(Poll::Done)
                }
            }
        }
    }
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
