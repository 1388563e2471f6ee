//! # armctl-core
//!
//! Shared engine for driving Azure Resource Manager (ARM) operations.
//!
//! Every mutating ARM call follows the same shape:
//!
//! 1. **Client factory** - build an [`ArmClient`] bound to a subscription with an
//!    [`Authorizer`] attached
//! 2. **Operation invoker** - submit a create / update / delete request and get back
//!    a [`Submission`]: either the finished resource or a pending [`ArmOperation`]
//! 3. **Completion waiter** - drive the pending operation to a terminal state with
//!    [`wait_for_completion`] and extract the typed result
//!
//! The waiter in [`lro`] is generic over the [`Operation`] trait and knows nothing
//! about HTTP; [`arm`] provides the ARM implementation of that trait.
//!
//! ## Example
//!
//! ```rust,ignore
//! use armctl_core::{ArmClient, AzureCliAuthorizer, PollContext};
//! use armctl_core::params::CreateStorageAccountParams;
//! use armctl_core::workflows::create_storage_account_and_wait;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let client = ArmClient::builder()
//!     .subscription_id("00000000-0000-0000-0000-000000000000")
//!     .authorizer(Arc::new(AzureCliAuthorizer::default()))
//!     .build()?;
//!
//! let params = CreateStorageAccountParams::new("samplestorage01", "westeurope")
//!     .with_sku("Standard_LRS");
//! let account = create_storage_account_and_wait(
//!     &client,
//!     "rg-samples",
//!     params,
//!     &PollContext::new(Duration::from_secs(900)),
//!     None,
//! )
//! .await?;
//! ```

pub mod arm;
pub mod config;
pub mod error;
pub mod lro;
pub mod models;
pub mod params;
pub mod progress;
pub mod workflows;

pub use arm::{
    ArmClient, ArmClientBuilder, ArmOperation, ArmResponse, Authorizer, AzureCliAuthorizer,
    LroMethod, Method, ResourceId, StaticTokenAuthorizer,
};
pub use config::{AuthKind, Config, ConfigError, Profile};
pub use error::{CoreError, ErrorKind, Result};
pub use lro::{
    Operation, OperationState, PollContext, PollStatus, Poller, Submission, complete,
    wait_for_completion,
};
pub use models::ProvisionedResource;
pub use progress::{ProgressCallback, ProgressEvent};
