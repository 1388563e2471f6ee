//! Connection management: profiles and environment into an `ArmClient`

use crate::error::{ArmCtlError, Result as CliResult};
use anyhow::Context;
use armctl_core::arm::auth::ACCESS_TOKEN_ENV;
use armctl_core::{ArmClient, Config, Profile};
use tracing::{debug, info, trace};

/// Subscription override used when no profile is configured
pub const SUBSCRIPTION_ENV: &str = "AZURE_SUBSCRIPTION_ID";

/// Endpoint override (sovereign clouds, local emulators, tests)
pub const BASE_URL_ENV: &str = "ARMCTL_BASE_URL";

/// Connection manager for creating authenticated clients
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<std::path::PathBuf>,
}

/// Environment values that can stand in for, or override, profile fields
#[derive(Debug, Default, Clone, PartialEq)]
struct EnvOverrides {
    subscription_id: Option<String>,
    access_token: Option<String>,
    base_url: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            subscription_id: read(SUBSCRIPTION_ENV),
            access_token: read(ACCESS_TOKEN_ENV),
            base_url: read(BASE_URL_ENV),
        }
    }
}

impl ConnectionManager {
    /// Create a connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<std::path::PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Save an updated configuration to the location it was loaded from
    pub fn save_config(&self, config: &Config) -> CliResult<()> {
        if let Some(ref path) = self.config_path {
            config
                .save_to_path(path)
                .context("Failed to save configuration")?;
        } else {
            config.save().context("Failed to save configuration")?;
        }
        Ok(())
    }

    /// Path of the configuration file in use
    pub fn config_file(&self) -> CliResult<std::path::PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::config_path()?),
        }
    }

    /// Profile for this invocation with environment overrides applied
    ///
    /// When --config-file is given explicitly, environment variables are
    /// ignored so the file alone decides.
    pub fn effective_profile(&self, profile_name: Option<&str>) -> CliResult<Profile> {
        let use_env_vars = self.config_path.is_none();
        debug!(
            "Config path: {:?}, use_env_vars: {}",
            self.config_path, use_env_vars
        );
        if !use_env_vars {
            info!("--config-file specified explicitly, ignoring environment variables");
        }

        let env = if use_env_vars {
            EnvOverrides::from_env()
        } else {
            EnvOverrides::default()
        };
        resolve_profile(&self.config, profile_name, env)
    }

    /// Create an ARM client for the resolved profile
    pub fn create_client(&self, profile_name: Option<&str>) -> CliResult<ArmClient> {
        debug!("Creating ARM client");
        trace!("Profile name: {:?}", profile_name);

        let profile = self.effective_profile(profile_name)?;
        info!(
            subscription = %profile.subscription_id,
            endpoint = %profile.base_url,
            auth = %profile.auth,
            "Using ARM profile"
        );

        Ok(ArmClient::from_profile(&profile)?)
    }

    /// Resource group from the flag, else from the profile
    pub fn resource_group(
        &self,
        profile_name: Option<&str>,
        explicit: Option<&str>,
    ) -> CliResult<String> {
        if let Some(rg) = explicit {
            return Ok(rg.to_string());
        }
        self.effective_profile(profile_name)?
            .resource_group
            .ok_or_else(|| ArmCtlError::InvalidInput {
                message: "no resource group given; pass --resource-group or set one on the profile"
                    .to_string(),
            })
    }

    /// Location from the flag, else from the profile
    pub fn location(&self, profile_name: Option<&str>, explicit: Option<&str>) -> CliResult<String> {
        if let Some(location) = explicit {
            return Ok(location.to_string());
        }
        self.effective_profile(profile_name)?
            .location
            .ok_or_else(|| ArmCtlError::InvalidInput {
                message: "no location given; pass --location or set one on the profile"
                    .to_string(),
            })
    }
}

/// Merge a configured profile with environment overrides
///
/// With no profiles configured, `AZURE_SUBSCRIPTION_ID` alone is enough to
/// build an ad-hoc profile.
fn resolve_profile(
    config: &Config,
    profile_name: Option<&str>,
    env: EnvOverrides,
) -> CliResult<Profile> {
    let (name, mut profile) = match config.resolve_profile(profile_name) {
        Ok(name) => {
            info!("Using profile: {}", name);
            let profile = config.get_profile(&name)?.clone();
            (name, profile)
        }
        Err(armctl_core::ConfigError::NoProfiles { .. })
            if profile_name.is_none() && env.subscription_id.is_some() =>
        {
            info!("No profiles configured, using {} from environment", SUBSCRIPTION_ENV);
            ("environment".to_string(), Profile::new(String::new()))
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(subscription_id) = env.subscription_id {
        debug!("Found {} environment variable", SUBSCRIPTION_ENV);
        profile.subscription_id = subscription_id;
    }
    if let Some(token) = env.access_token {
        debug!("Found {} environment variable", ACCESS_TOKEN_ENV);
        profile.auth = armctl_core::AuthKind::Token;
        profile.access_token = Some(token);
    }
    if let Some(base_url) = env.base_url {
        debug!("Found {} environment variable", BASE_URL_ENV);
        profile.base_url = base_url;
    }

    profile.validate(&name)?;
    Ok(profile)
}
