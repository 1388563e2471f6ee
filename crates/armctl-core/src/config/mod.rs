//! Configuration and profile management for armctl
//!
// Allow nested config module - this is intentional for the config subsystem

#![allow(clippy::module_inception)]
//!
//! Profiles bind a name to a subscription, default addressing parameters
//! (location, resource group) and the way a bearer token is obtained.
//!
//! # Features
//!
//! - Multiple named profiles for different subscriptions or clouds
//! - Environment variable expansion in config files
//! - Platform-specific config file locations

pub mod config;
pub mod error;

// Re-export main types for convenience
pub use config::{AuthKind, Config, DEFAULT_ARM_ENDPOINT, Profile};
pub use error::{ConfigError, Result};
