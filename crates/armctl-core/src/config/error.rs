use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profiles configured. {suggestion}")]
    NoProfiles { suggestion: String },

    /// The profile exists but cannot address a subscription
    #[error("profile '{name}' is unusable: {reason}")]
    InvalidProfile { name: String, reason: String },

    /// `auth = "token"` without a usable token
    #[error("no access token: {0}")]
    MissingToken(String),

    #[error("no platform config directory (is HOME set?)")]
    NoConfigDir,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
