//! Azure Resource Manager client and long-running operation handles
//!
//! - [`auth`] - the [`Authorizer`] capability and its implementations
//! - [`client`] - [`ArmClient`], the HTTP client bound to one subscription
//! - [`operation`] - `begin_*` submissions and [`ArmOperation`], the ARM
//!   implementation of [`crate::lro::Operation`]
//! - [`resource_id`] - parsing and formatting of ARM resource ids

pub mod auth;
pub mod client;
pub mod operation;
pub mod resource_id;

pub use auth::{Authorizer, AzureCliAuthorizer, StaticTokenAuthorizer, authorizer_for_profile};
pub use client::{ArmClient, ArmClientBuilder, ArmResponse, USER_AGENT};
pub use operation::{ArmOperation, LroMethod};
pub use resource_id::ResourceId;

/// HTTP method type accepted by [`ArmClient::request`]
pub use reqwest::Method;
