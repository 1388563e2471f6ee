//! Workflows - submit a mutating call and wait for its result
//!
//! Each workflow builds the resource address, submits the request through
//! the client, and hands any pending operation to the waiter. A call that
//! completes synchronously returns straight away without polling.

use crate::arm::{ArmClient, ResourceId};
use crate::error::Result;
use crate::lro::{PollContext, complete};
use crate::models::{PublicIpAddress, StorageAccount, VirtualNetwork, api_versions};
use crate::params::{
    CreatePublicIpParams, CreateStorageAccountParams, CreateVirtualNetworkParams,
};
use crate::progress::ProgressCallback;
use serde_json::Value;
use tracing::info;

/// Id of a storage account in the client's subscription
pub fn storage_account_id(client: &ArmClient, resource_group: &str, name: &str) -> ResourceId {
    ResourceId::new(
        client.subscription_id(),
        resource_group,
        "Microsoft.Storage",
        "storageAccounts",
        name,
    )
}

/// Id of a virtual network in the client's subscription
pub fn virtual_network_id(client: &ArmClient, resource_group: &str, name: &str) -> ResourceId {
    ResourceId::new(
        client.subscription_id(),
        resource_group,
        "Microsoft.Network",
        "virtualNetworks",
        name,
    )
}

/// Id of a public IP address in the client's subscription
pub fn public_ip_id(client: &ArmClient, resource_group: &str, name: &str) -> ResourceId {
    ResourceId::new(
        client.subscription_id(),
        resource_group,
        "Microsoft.Network",
        "publicIPAddresses",
        name,
    )
}

/// Create a storage account and wait until it is provisioned
///
/// # Arguments
///
/// * `client` - ARM client bound to the target subscription
/// * `resource_group` - Resource group to create the account in
/// * `params` - Account name, location and options
/// * `ctx` - Deadline, poll interval and cancellation
/// * `on_progress` - Optional callback for progress updates
///
/// # Example
///
/// ```rust,ignore
/// use armctl_core::params::CreateStorageAccountParams;
/// use armctl_core::workflows::create_storage_account_and_wait;
/// use armctl_core::PollContext;
///
/// let params = CreateStorageAccountParams::new("armctldemo01", "westeurope");
/// let account = create_storage_account_and_wait(
///     &client,
///     "rg-demo",
///     params,
///     &PollContext::default(),
///     None,
/// )
/// .await?;
/// println!("{:?}", account.properties.and_then(|p| p.primary_endpoints));
/// ```
pub async fn create_storage_account_and_wait(
    client: &ArmClient,
    resource_group: &str,
    params: CreateStorageAccountParams,
    ctx: &PollContext,
    on_progress: Option<ProgressCallback>,
) -> Result<StorageAccount> {
    params.validate()?;
    let id = storage_account_id(client, resource_group, &params.name);
    info!(resource = %id, "Creating storage account");

    let submission = client
        .begin_create_or_update::<_, StorageAccount>(
            &id.to_string(),
            api_versions::STORAGE,
            &params.into_request(),
        )
        .await?;
    complete(submission, ctx, on_progress).await
}

/// Create a virtual network (with any subnets) and wait until it is provisioned
pub async fn create_virtual_network_and_wait(
    client: &ArmClient,
    resource_group: &str,
    name: &str,
    params: CreateVirtualNetworkParams,
    ctx: &PollContext,
    on_progress: Option<ProgressCallback>,
) -> Result<VirtualNetwork> {
    params.validate()?;
    let id = virtual_network_id(client, resource_group, name);
    info!(resource = %id, "Creating virtual network");

    let submission = client
        .begin_create_or_update::<_, VirtualNetwork>(
            &id.to_string(),
            api_versions::NETWORK,
            &params.into_request(),
        )
        .await?;
    complete(submission, ctx, on_progress).await
}

/// Create a public IP address and wait until it is provisioned
pub async fn create_public_ip_and_wait(
    client: &ArmClient,
    resource_group: &str,
    name: &str,
    params: CreatePublicIpParams,
    ctx: &PollContext,
    on_progress: Option<ProgressCallback>,
) -> Result<PublicIpAddress> {
    params.validate()?;
    let id = public_ip_id(client, resource_group, name);
    info!(resource = %id, "Creating public IP address");

    let submission = client
        .begin_create_or_update::<_, PublicIpAddress>(
            &id.to_string(),
            api_versions::NETWORK,
            &params.into_request(),
        )
        .await?;
    complete(submission, ctx, on_progress).await
}

/// `PUT` an arbitrary resource definition and wait for the final resource
///
/// `resource_id` is a full ARM id (or any path below the endpoint).
pub async fn create_or_update_resource_and_wait(
    client: &ArmClient,
    resource_id: &str,
    api_version: &str,
    body: &Value,
    ctx: &PollContext,
    on_progress: Option<ProgressCallback>,
) -> Result<Value> {
    info!(resource = %resource_id, api_version, "Creating or updating resource");
    let submission = client
        .begin_create_or_update::<_, Value>(resource_id, api_version, body)
        .await?;
    complete(submission, ctx, on_progress).await
}

/// Delete a resource and wait until it is gone
pub async fn delete_resource_and_wait(
    client: &ArmClient,
    resource_id: &str,
    api_version: &str,
    ctx: &PollContext,
    on_progress: Option<ProgressCallback>,
) -> Result<()> {
    info!(resource = %resource_id, "Deleting resource");
    let submission = client.begin_delete(resource_id, api_version).await?;
    complete(submission, ctx, on_progress).await
}
