//! Named ARM profiles stored as TOML
//!
//! A profile pins the subscription every request is scoped to, the endpoint
//! (public cloud, a sovereign cloud or a local mock) and how bearer tokens
//! are obtained.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, Result};

/// Public Azure cloud management endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// Contents of `config.toml`
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Profile used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// One named target: a subscription on an ARM endpoint
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    /// Subscription every request is scoped to
    pub subscription_id: String,
    /// Entra tenant, passed to the Azure CLI when fetching tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Default location for new resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Default resource group for resource commands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    /// ARM endpoint (override for sovereign clouds or tests)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// How bearer tokens are obtained
    #[serde(default)]
    pub auth: AuthKind,
    /// Token for `auth = "token"`; usually `${AZURE_ACCESS_TOKEN}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Supported ways of obtaining a bearer token
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AuthKind {
    /// Ask the Azure CLI (`az account get-access-token`)
    #[default]
    AzureCli,
    /// Use a pre-issued token from the profile or environment
    Token,
}

impl std::fmt::Display for AuthKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthKind::AzureCli => write!(f, "azure-cli"),
            AuthKind::Token => write!(f, "token"),
        }
    }
}

impl Profile {
    /// Create a profile for `subscription_id` using Azure CLI auth
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            tenant_id: None,
            location: None,
            resource_group: None,
            base_url: default_base_url(),
            auth: AuthKind::AzureCli,
            access_token: None,
        }
    }

    /// Check if this profile carries a token
    pub fn has_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Token for `auth = "token"` profiles
    ///
    /// Unexpanded `${VAR}` references count as missing.
    pub fn resolve_token(&self) -> Result<Option<String>> {
        if self.auth == AuthKind::AzureCli {
            return Ok(None);
        }
        match self.access_token.as_deref() {
            Some(token) if unexpanded(token) => Err(ConfigError::MissingToken(format!(
                "access_token references unset environment variable {token}"
            ))),
            Some(token) if !token.is_empty() => Ok(Some(token.to_string())),
            _ => Err(ConfigError::MissingToken(
                "profile uses token auth but has no access_token".to_string(),
            )),
        }
    }

    /// Reject profiles that cannot address a subscription
    ///
    /// Run when a profile is about to be used rather than at load time, so
    /// an unused profile may reference variables that are not set.
    pub fn validate(&self, name: &str) -> Result<()> {
        let invalid = |reason: String| ConfigError::InvalidProfile {
            name: name.to_string(),
            reason,
        };

        let sub = self.subscription_id.trim();
        if sub.is_empty() {
            return Err(invalid("subscription_id is empty".to_string()));
        }
        if unexpanded(sub) {
            return Err(invalid(format!(
                "subscription_id references unset environment variable {sub}"
            )));
        }
        if sub.contains('/') {
            return Err(invalid(format!(
                "subscription_id '{sub}' looks like a resource path, expected a GUID"
            )));
        }

        match url::Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "https" | "http") => Ok(()),
            Ok(url) => Err(invalid(format!(
                "base_url scheme '{}' is not http(s)",
                url.scheme()
            ))),
            Err(e) => Err(invalid(format!("base_url '{}': {e}", self.base_url))),
        }
    }
}

fn unexpanded(value: &str) -> bool {
    value.starts_with("${")
}

impl Config {
    /// Resolve the profile name to use
    ///
    /// Order: explicit name, `default_profile`, first profile alphabetically.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(name) = explicit_profile {
            self.get_profile(name)?;
            return Ok(name.to_string());
        }

        if let Some(default) = &self.default_profile {
            return Ok(default.clone());
        }

        self.profiles
            .keys()
            .min()
            .cloned()
            .ok_or_else(|| ConfigError::NoProfiles {
                suggestion: "Use 'armctl profile set' to create a profile.".to_string(),
            })
    }

    /// Look up a profile by name
    pub fn get_profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Load from the platform config directory
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_path()?)
    }

    /// Load from `path`; a missing file is an empty config
    ///
    /// `${VAR}` references are expanded before parsing.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(toml::from_str(&Self::expand_env_vars(&raw))?)
    }

    /// Save to the platform config directory
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_path()?)
    }

    /// Save to `path`
    ///
    /// Written to a sibling temp file and renamed into place, so a failed
    /// write never truncates an existing config. Profiles may hold tokens;
    /// on Unix the file is readable by the owner only.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        let staging = path.with_extension("toml.tmp");
        fs::write(&staging, rendered).map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&staging, fs::Permissions::from_mode(0o600)).map_err(write_err)?;
        }

        fs::rename(&staging, path).map_err(|e| {
            let _ = fs::remove_file(&staging);
            write_err(e)
        })
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// Profiles ordered by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_unstable_by(|a, b| a.0.cmp(b.0));
        profiles
    }

    /// `config.toml` in the platform config directory
    ///
    /// Linux: `~/.config/armctl/config.toml`; macOS:
    /// `~/Library/Application Support/com.armctl.armctl/config.toml`.
    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("com", "armctl", "armctl")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Expand `${VAR}` and `${VAR:-default}`; unset variables stay verbatim
    ///
    /// ```toml
    /// subscription_id = "${AZURE_SUBSCRIPTION_ID}"
    /// base_url = "${ARMCTL_BASE_URL:-https://management.azure.com}"
    /// ```
    fn expand_env_vars(content: &str) -> String {
        shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok())
            .into_owned()
    }
}

fn default_base_url() -> String {
    DEFAULT_ARM_ENDPOINT.to_string()
}
