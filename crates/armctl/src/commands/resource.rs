//! Generic resource commands addressed by full ARM resource id

use crate::cli::{OutputFormat, ResourceCommands};
use crate::commands::api::parse_data;
use crate::commands::async_utils::{print_submission, wait_with_progress};
use crate::commands::{print_delete_submission, print_deleted};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::{self, print_output};
use armctl_core::ResourceId;
use armctl_core::workflows;
use serde_json::Value;

pub async fn handle_resource_command(
    cmd: &ResourceCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile_name)?;

    match cmd {
        ResourceCommands::Get { id, api_version } => {
            let id: ResourceId = id.parse()?;
            let resource: Value = client.get(&id.to_string(), api_version).await?;
            let format = output::OutputFormat::resolve(output_format, output::OutputFormat::Json);
            print_output(resource, format, query)?;
        }
        ResourceCommands::Create {
            id,
            api_version,
            data,
            async_ops,
        } => {
            let id: ResourceId = id.parse()?;
            let body = parse_data(data)?;

            if async_ops.no_wait {
                let submission = client
                    .begin_create_or_update::<_, Value>(&id.to_string(), api_version, &body)
                    .await?;
                return print_submission(
                    submission,
                    output_format,
                    query,
                    &format!("Request to create {} accepted.", id.name()),
                );
            }

            let path = id.to_string();
            let resource = wait_with_progress(
                async_ops,
                format!("Creating {}", id.name()),
                |ctx, progress| async move {
                    workflows::create_or_update_resource_and_wait(
                        &client,
                        &path,
                        api_version,
                        &body,
                        &ctx,
                        progress,
                    )
                    .await
                },
            )
            .await?;
            let format = output::OutputFormat::resolve(output_format, output::OutputFormat::Json);
            print_output(resource, format, query)?;
        }
        ResourceCommands::Delete {
            id,
            api_version,
            async_ops,
        } => {
            let id: ResourceId = id.parse()?;

            if async_ops.no_wait {
                let submission = client.begin_delete(&id.to_string(), api_version).await?;
                return print_delete_submission(submission, &id, output_format, query);
            }

            let path = id.to_string();
            wait_with_progress(
                async_ops,
                format!("Deleting {}", id.name()),
                |ctx, progress| async move {
                    workflows::delete_resource_and_wait(&client, &path, api_version, &ctx, progress)
                        .await
                },
            )
            .await?;
            print_deleted(&id, output_format, query)?;
        }
    }

    Ok(())
}
