//! Azure credential chain
//!
//! Tokens come from the first source that works, tried in the same order as
//! the SDKs' default credential:
//!
//! 1. a service principal secret from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`
//!    and `AZURE_CLIENT_SECRET`
//! 2. managed identity (App Service / Functions endpoint, else IMDS)
//! 3. the locally logged-in Azure CLI
//!
//! The source that succeeds first is kept for the rest of the run.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Refresh tokens this long before they expire
const REFRESH_MARGIN_SECS: i64 = 300;

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// IMDS only answers on Azure hosts; elsewhere the connect attempt must not
/// hold up the fallback to the CLI.
const IMDS_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

/// Bearer token with its expiry
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token is still usable at `now`, keeping a refresh margin
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Where a token can be obtained from
#[derive(Clone, PartialEq, Eq)]
pub enum TokenSource {
    ClientSecret {
        authority_host: String,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    /// App Service / Functions identity endpoint
    AppServiceIdentity {
        endpoint: String,
        header: String,
        client_id: Option<String>,
    },
    /// Instance Metadata Service on VMs and AKS nodes
    InstanceMetadata { client_id: Option<String> },
    AzureCli,
}

impl TokenSource {
    pub fn name(&self) -> &'static str {
        match self {
            TokenSource::ClientSecret { .. } => "environment client secret",
            TokenSource::AppServiceIdentity { .. } => "managed identity (App Service)",
            TokenSource::InstanceMetadata { .. } => "managed identity (IMDS)",
            TokenSource::AzureCli => "Azure CLI",
        }
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the chain from environment variables looked up through `lookup`.
pub fn sources_from(lookup: impl Fn(&str) -> Option<String>) -> Vec<TokenSource> {
    let var = |name: &str| lookup(name).filter(|value| !value.is_empty());
    let mut sources = Vec::new();

    if let (Some(tenant_id), Some(client_id), Some(client_secret)) = (
        var("AZURE_TENANT_ID"),
        var("AZURE_CLIENT_ID"),
        var("AZURE_CLIENT_SECRET"),
    ) {
        let authority_host = var("AZURE_AUTHORITY_HOST")
            .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string())
            .trim_end_matches('/')
            .to_string();
        sources.push(TokenSource::ClientSecret {
            authority_host,
            tenant_id,
            client_id,
            client_secret,
        });
    }

    let client_id = var("AZURE_CLIENT_ID");
    match (var("IDENTITY_ENDPOINT"), var("IDENTITY_HEADER")) {
        (Some(endpoint), Some(header)) => sources.push(TokenSource::AppServiceIdentity {
            endpoint,
            header,
            client_id,
        }),
        _ => sources.push(TokenSource::InstanceMetadata { client_id }),
    }

    sources.push(TokenSource::AzureCli);
    sources
}

/// Token endpoint response for the client credentials grant
#[derive(Debug, Deserialize)]
struct ClientSecretToken {
    access_token: String,
    expires_in: i64,
}

/// Managed identity endpoints send `expires_on` as a string or a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct ManagedIdentityToken {
    access_token: String,
    expires_on: Timestamp,
}

/// Output of `az account get-access-token`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Unix timestamp, present in Azure CLI 2.54 and later
    #[serde(rename = "expires_on")]
    expires_on: Option<i64>,
}

/// A visible subscription and whether it is the login's default
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Default)]
struct CredentialState {
    /// Index of the source that produced the first token
    active: Option<usize>,
    token: Option<AccessToken>,
}

/// Chained Azure credential, caching the current token.
pub struct AzureCredential {
    http: reqwest::Client,
    resource: String,
    sources: Vec<TokenSource>,
    state: Mutex<CredentialState>,
}

impl AzureCredential {
    pub fn new(http: reqwest::Client, resource: &str, sources: Vec<TokenSource>) -> Self {
        Self {
            http,
            resource: resource.to_string(),
            sources,
            state: Mutex::new(CredentialState::default()),
        }
    }

    /// Chain configured from the process environment.
    pub fn from_env(http: reqwest::Client, resource: &str) -> Self {
        Self::new(http, resource, sources_from(|name| std::env::var(name).ok()))
    }

    /// Credential that always hands out `token`
    #[cfg(test)]
    pub fn fixed(token: &str) -> Self {
        let credential = Self::new(reqwest::Client::new(), "https://management.azure.com/", Vec::new());
        credential.state.try_lock().expect("fresh mutex").token = Some(AccessToken {
            token: token.to_string(),
            expires_at: Utc::now() + Duration::days(1),
        });
        credential
    }

    /// Get a bearer token, refreshing it when close to expiry.
    pub async fn token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        if let Some(token) = state.token.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.token.clone());
            }
        }

        let token = match state.active {
            Some(index) => self.fetch(&self.sources[index]).await?,
            None => {
                let (index, token) = self.first_available().await?;
                info!(source = self.sources[index].name(), "Authenticated with Azure");
                state.active = Some(index);
                token
            }
        };

        let value = token.token.clone();
        state.token = Some(token);
        Ok(value)
    }

    /// The source in use, once a token has been obtained
    pub async fn active_source(&self) -> Option<TokenSource> {
        let state = self.state.lock().await;
        state.active.map(|index| self.sources[index].clone())
    }

    async fn first_available(&self) -> Result<(usize, AccessToken)> {
        let mut failures = Vec::new();
        for (index, source) in self.sources.iter().enumerate() {
            match self.fetch(source).await {
                Ok(token) => return Ok((index, token)),
                Err(e) => {
                    debug!(source = source.name(), error = %format!("{e:#}"), "Credential source unavailable");
                    failures.push(format!("{}: {e:#}", source.name()));
                }
            }
        }
        anyhow::bail!(
            "No Azure credential available. Set AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET, \
             run on a host with a managed identity, or run 'az login'.\n  {}",
            failures.join("\n  ")
        )
    }

    async fn fetch(&self, source: &TokenSource) -> Result<AccessToken> {
        debug!(source = source.name(), resource = %self.resource, "Requesting access token");
        match source {
            TokenSource::ClientSecret {
                authority_host,
                tenant_id,
                client_id,
                client_secret,
            } => {
                let url = format!("{authority_host}/{tenant_id}/oauth2/v2.0/token");
                let scope = format!("{}.default", self.resource);
                let body = self
                    .http
                    .post(&url)
                    .form(&[
                        ("grant_type", "client_credentials"),
                        ("client_id", client_id.as_str()),
                        ("client_secret", client_secret.as_str()),
                        ("scope", scope.as_str()),
                    ])
                    .send()
                    .await
                    .context("Token request failed")?
                    .error_for_status()
                    .context("Token endpoint rejected the client secret")?
                    .text()
                    .await?;
                parse_client_secret_token(&body, Utc::now())
            }
            TokenSource::AppServiceIdentity {
                endpoint,
                header,
                client_id,
            } => {
                let mut query = vec![
                    ("api-version", APP_SERVICE_API_VERSION),
                    ("resource", self.resource.as_str()),
                ];
                if let Some(client_id) = client_id {
                    query.push(("client_id", client_id.as_str()));
                }
                let body = self
                    .http
                    .get(endpoint)
                    .header("X-IDENTITY-HEADER", header)
                    .query(&query)
                    .send()
                    .await
                    .context("Managed identity request failed")?
                    .error_for_status()?
                    .text()
                    .await?;
                parse_managed_identity_token(&body)
            }
            TokenSource::InstanceMetadata { client_id } => {
                let mut query = vec![
                    ("api-version", IMDS_API_VERSION),
                    ("resource", self.resource.as_str()),
                ];
                if let Some(client_id) = client_id {
                    query.push(("client_id", client_id.as_str()));
                }
                let body = self
                    .http
                    .get(IMDS_ENDPOINT)
                    .header("Metadata", "true")
                    .query(&query)
                    .timeout(IMDS_TIMEOUT)
                    .send()
                    .await
                    .context("Instance metadata service not reachable")?
                    .error_for_status()?
                    .text()
                    .await?;
                parse_managed_identity_token(&body)
            }
            TokenSource::AzureCli => {
                let output = run_az(&[
                    "account",
                    "get-access-token",
                    "--resource",
                    &self.resource,
                    "--output",
                    "json",
                ])
                .await
                .context("Failed to get an access token - run 'az login' first")?;
                parse_cli_token(&output, Utc::now())
            }
        }
    }

    /// List subscriptions through the Azure CLI, which also reports the
    /// login's default subscription.
    pub async fn list_cli_subscriptions(&self) -> Result<Vec<SubscriptionInfo>> {
        let output = run_az(&["account", "list", "--output", "json"])
            .await
            .context("Failed to list subscriptions")?;
        serde_json::from_str(&output).context("Failed to parse 'az account list' output")
    }
}

impl std::fmt::Debug for AzureCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureCredential")
            .field("resource", &self.resource)
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

fn parse_client_secret_token(json: &str, now: DateTime<Utc>) -> Result<AccessToken> {
    let token: ClientSecretToken =
        serde_json::from_str(json).context("Failed to parse token endpoint response")?;
    Ok(AccessToken {
        token: token.access_token,
        expires_at: now + Duration::seconds(token.expires_in),
    })
}

fn parse_managed_identity_token(json: &str) -> Result<AccessToken> {
    let token: ManagedIdentityToken =
        serde_json::from_str(json).context("Failed to parse managed identity response")?;
    let secs = match token.expires_on {
        Timestamp::Number(secs) => secs,
        Timestamp::Text(text) => text
            .trim()
            .parse()
            .with_context(|| format!("Invalid expires_on '{text}'"))?,
    };
    let expires_at = DateTime::from_timestamp(secs, 0)
        .with_context(|| format!("expires_on {secs} out of range"))?;
    Ok(AccessToken {
        token: token.access_token,
        expires_at,
    })
}

/// Parse `az account get-access-token` JSON. Tokens without an expiry are
/// treated as valid for the refresh margin only.
fn parse_cli_token(json: &str, now: DateTime<Utc>) -> Result<AccessToken> {
    let cli: CliToken =
        serde_json::from_str(json).context("Failed to parse 'az account get-access-token' output")?;

    let expires_at = cli
        .expires_on
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or(now + Duration::seconds(REFRESH_MARGIN_SECS));

    Ok(AccessToken {
        token: cli.access_token,
        expires_at,
    })
}

async fn run_az(args: &[&str]) -> Result<String> {
    let output = Command::new("az")
        .args(args)
        .output()
        .await
        .context("Failed to run the Azure CLI ('az') - is it installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("az {} failed: {}", args.join(" "), stderr.trim());
    }

    String::from_utf8(output.stdout).context("Azure CLI output is not valid UTF-8")
}
