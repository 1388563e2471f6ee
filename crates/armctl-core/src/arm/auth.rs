//! Bearer token providers
//!
//! An [`Authorizer`] is an opaque capability: the client asks it for a token
//! before each request and never inspects or stores what comes back. Token
//! acquisition itself is delegated to the environment or the Azure CLI.

use crate::config::{AuthKind, Profile};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Environment variable read by [`StaticTokenAuthorizer::from_env`]
pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";

/// Supplies bearer tokens for ARM requests
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Token to send as `Authorization: Bearer <token>`
    async fn token(&self) -> Result<String>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// A pre-issued token
pub struct StaticTokenAuthorizer {
    token: String,
}

impl StaticTokenAuthorizer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Read the token from `AZURE_ACCESS_TOKEN`
    pub fn from_env() -> Result<Self> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .map(Self::new)
            .ok_or_else(|| CoreError::Auth(format!("{ACCESS_TOKEN_ENV} is not set")))
    }
}

impl std::fmt::Debug for StaticTokenAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenAuthorizer")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Authorizer for StaticTokenAuthorizer {
    async fn token(&self) -> Result<String> {
        Ok(self.token.clone())
    }

    fn name(&self) -> &str {
        "static-token"
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Tokens from `az account get-access-token`
///
/// A token is reused until it is within five minutes of expiry.
#[derive(Debug)]
pub struct AzureCliAuthorizer {
    program: String,
    resource: String,
    tenant_id: Option<String>,
    cache: Mutex<Option<CachedToken>>,
}

impl Default for AzureCliAuthorizer {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ARM_ENDPOINT)
    }
}

impl AzureCliAuthorizer {
    /// Request tokens for `resource` (the ARM endpoint)
    pub fn new(resource: impl Into<String>) -> Self {
        let mut resource = resource.into();
        if !resource.ends_with('/') {
            resource.push('/');
        }
        Self {
            program: "az".to_string(),
            resource,
            tenant_id: None,
            cache: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Use a different executable than `az`
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn fetch(&self) -> Result<CachedToken> {
        let mut command = Command::new(&self.program);
        command.args([
            "account",
            "get-access-token",
            "--resource",
            &self.resource,
            "--output",
            "json",
        ]);
        if let Some(tenant) = &self.tenant_id {
            command.args(["--tenant", tenant]);
        }

        debug!(program = %self.program, resource = %self.resource, "Requesting token from Azure CLI");
        let output = command
            .output()
            .await
            .map_err(|e| CoreError::Auth(format!("failed to run '{}': {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::Auth(format!(
                "'{} account get-access-token' failed: {}",
                self.program,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_cli_token(&stdout)
    }
}

#[async_trait]
impl Authorizer for AzureCliAuthorizer {
    async fn token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref()
            && cached.expires_at - Utc::now() > TimeDelta::minutes(5)
        {
            trace!("Reusing cached Azure CLI token");
            return Ok(cached.token.clone());
        }

        let fresh = self.fetch().await?;
        trace!(
            "Azure CLI token {}... expires at {}",
            token_prefix(&fresh.token),
            fresh.expires_at
        );
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    fn name(&self) -> &str {
        "azure-cli"
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    /// Local time, e.g. "2025-03-01 14:05:09.000000"
    #[serde(default)]
    expires_on: Option<String>,
    /// Unix seconds, present in newer CLI versions
    #[serde(default, rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

/// First few characters of a token, for trace output
pub(crate) fn token_prefix(token: &str) -> String {
    token.chars().take(8).collect()
}

fn parse_cli_token(json: &str) -> Result<CachedToken> {
    let response: CliTokenResponse = serde_json::from_str(json)
        .map_err(|e| CoreError::Auth(format!("unexpected Azure CLI output: {e}")))?;

    let expires_at = response
        .expires_on_epoch
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .or_else(|| {
            response
                .expires_on
                .as_deref()
                .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
                .and_then(|naive| Local.from_local_datetime(&naive).single())
                .map(|local| local.with_timezone(&Utc))
        })
        // Unknown expiry: use once, refetch next time
        .unwrap_or_else(Utc::now);

    Ok(CachedToken {
        token: response.access_token,
        expires_at,
    })
}

/// Build the authorizer a profile asks for
pub fn authorizer_for_profile(profile: &Profile) -> Result<Arc<dyn Authorizer>> {
    match profile.auth {
        AuthKind::Token => {
            let token = profile
                .resolve_token()?
                .ok_or_else(|| CoreError::Auth("profile has no access token".to_string()))?;
            Ok(Arc::new(StaticTokenAuthorizer::new(token)))
        }
        AuthKind::AzureCli => {
            let mut authorizer = AzureCliAuthorizer::new(profile.base_url.as_str());
            if let Some(tenant) = &profile.tenant_id {
                authorizer = authorizer.with_tenant(tenant);
            }
            Ok(Arc::new(authorizer))
        }
    }
}
