//! Virtual network and public IP address commands

use crate::cli::{OutputFormat, PublicIpCommands, VnetCommands};
use crate::commands::async_utils::{print_submission, wait_with_progress};
use crate::commands::{print_delete_submission, print_deleted};
use crate::connection::ConnectionManager;
use crate::error::{ArmCtlError, Result as CliResult};
use crate::output::{self, print_output};
use armctl_core::models::{PublicIpAddress, VirtualNetwork, api_versions};
use armctl_core::params::{CreatePublicIpParams, CreateVirtualNetworkParams};
use armctl_core::{ArmClient, ResourceId, workflows};
use serde::Serialize;

pub async fn handle_vnet_command(
    cmd: &VnetCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile_name)?;

    match cmd {
        VnetCommands::Show {
            name,
            resource_group,
        } => {
            let rg = conn_mgr.resource_group(profile_name, resource_group.as_deref())?;
            let id = workflows::virtual_network_id(&client, &rg, name);
            let vnet: VirtualNetwork = client.get(&id.to_string(), api_versions::NETWORK).await?;
            print_resource(vnet, output_format, query)?;
        }
        VnetCommands::Create {
            name,
            resource_group,
            location,
            address_prefixes,
            subnets,
            tags,
            async_ops,
        } => {
            let rg = conn_mgr.resource_group(profile_name, resource_group.as_deref())?;
            let location = conn_mgr.location(profile_name, location.as_deref())?;

            let (first, rest) =
                address_prefixes
                    .split_first()
                    .ok_or_else(|| ArmCtlError::InvalidInput {
                        message: "at least one --address-prefix is required".to_string(),
                    })?;
            let mut params = CreateVirtualNetworkParams::new(location, first.as_str());
            for prefix in rest {
                params = params.with_address_prefix(prefix.as_str());
            }
            for (subnet, prefix) in subnets {
                params = params.with_subnet(subnet.as_str(), prefix.as_str());
            }
            for (key, value) in tags {
                params = params.with_tag(key.as_str(), value.as_str());
            }

            if async_ops.no_wait {
                params.validate()?;
                let id = workflows::virtual_network_id(&client, &rg, name);
                let submission = client
                    .begin_create_or_update::<_, VirtualNetwork>(
                        &id.to_string(),
                        api_versions::NETWORK,
                        &params.into_request(),
                    )
                    .await?;
                return print_submission(
                    submission,
                    output_format,
                    query,
                    &format!("Request to create virtual network '{}' accepted.", name),
                );
            }

            let vnet = wait_with_progress(
                async_ops,
                format!("Creating virtual network {}", name),
                |ctx, progress| async move {
                    workflows::create_virtual_network_and_wait(
                        &client, &rg, name, params, &ctx, progress,
                    )
                    .await
                },
            )
            .await?;
            print_resource(vnet, output_format, query)?;
        }
        VnetCommands::Delete {
            name,
            resource_group,
            async_ops,
        } => {
            let rg = conn_mgr.resource_group(profile_name, resource_group.as_deref())?;
            let id = workflows::virtual_network_id(&client, &rg, name);
            delete(client, id, async_ops, output_format, query).await?;
        }
    }

    Ok(())
}

pub async fn handle_public_ip_command(
    cmd: &PublicIpCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile_name)?;

    match cmd {
        PublicIpCommands::Show {
            name,
            resource_group,
        } => {
            let rg = conn_mgr.resource_group(profile_name, resource_group.as_deref())?;
            let id = workflows::public_ip_id(&client, &rg, name);
            let ip: PublicIpAddress = client.get(&id.to_string(), api_versions::NETWORK).await?;
            print_resource(ip, output_format, query)?;
        }
        PublicIpCommands::Create {
            name,
            resource_group,
            location,
            sku,
            allocation_method,
            version,
            idle_timeout,
            tags,
            async_ops,
        } => {
            let rg = conn_mgr.resource_group(profile_name, resource_group.as_deref())?;
            let location = conn_mgr.location(profile_name, location.as_deref())?;

            let mut params = CreatePublicIpParams::new(location);
            if let Some(sku) = sku {
                params = params.with_sku(sku.as_str());
            }
            if let Some(method) = allocation_method {
                params = params.with_allocation_method(method.as_str());
            }
            if let Some(version) = version {
                params = params.with_version(version.as_str());
            }
            if let Some(minutes) = idle_timeout {
                params = params.with_idle_timeout(*minutes);
            }
            for (key, value) in tags {
                params = params.with_tag(key.as_str(), value.as_str());
            }

            if async_ops.no_wait {
                params.validate()?;
                let id = workflows::public_ip_id(&client, &rg, name);
                let submission = client
                    .begin_create_or_update::<_, PublicIpAddress>(
                        &id.to_string(),
                        api_versions::NETWORK,
                        &params.into_request(),
                    )
                    .await?;
                return print_submission(
                    submission,
                    output_format,
                    query,
                    &format!("Request to create public IP address '{}' accepted.", name),
                );
            }

            let ip = wait_with_progress(
                async_ops,
                format!("Creating public IP address {}", name),
                |ctx, progress| async move {
                    workflows::create_public_ip_and_wait(&client, &rg, name, params, &ctx, progress)
                        .await
                },
            )
            .await?;
            print_resource(ip, output_format, query)?;
        }
        PublicIpCommands::Delete {
            name,
            resource_group,
            async_ops,
        } => {
            let rg = conn_mgr.resource_group(profile_name, resource_group.as_deref())?;
            let id = workflows::public_ip_id(&client, &rg, name);
            delete(client, id, async_ops, output_format, query).await?;
        }
    }

    Ok(())
}

fn print_resource<T: Serialize>(
    resource: T,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let format = output::OutputFormat::resolve(output_format, output::OutputFormat::Json);
    print_output(resource, format, query)?;
    Ok(())
}

async fn delete(
    client: ArmClient,
    id: ResourceId,
    async_ops: &crate::commands::async_utils::AsyncOperationArgs,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let path = id.to_string();

    if async_ops.no_wait {
        let submission = client.begin_delete(&path, api_versions::NETWORK).await?;
        return print_delete_submission(submission, &id, output_format, query);
    }

    wait_with_progress(
        async_ops,
        format!("Deleting {}", id.name()),
        |ctx, progress| async move {
            workflows::delete_resource_and_wait(
                &client,
                &path,
                api_versions::NETWORK,
                &ctx,
                progress,
            )
            .await
        },
    )
    .await?;
    print_deleted(&id, output_format, query)
}
