//! Resume waiting on an operation handle printed by `--no-wait`

use crate::cli::{OperationCommands, OutputFormat};
use crate::commands::async_utils::{poll_context, wait_with_context};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::{self, print_output};
use armctl_core::{ArmOperation, wait_for_completion};
use serde_json::{Value, json};
use tracing::info;

pub async fn handle_operation_command(
    cmd: &OperationCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    match cmd {
        OperationCommands::Wait {
            url,
            location,
            resource,
            wait_timeout,
            wait_interval,
        } => {
            let client = conn_mgr.create_client(profile_name)?;
            let mut operation = if *location {
                ArmOperation::<Value>::monitor_location(&client, url)?
            } else {
                ArmOperation::<Value>::monitor_async_operation(&client, url)?
            };
            if let Some(resource) = resource {
                operation = operation.with_final_resource(resource)?;
            }
            info!(
                url = %url,
                location = *location,
                resource = resource.is_some(),
                "Resuming wait on operation"
            );

            let result = wait_with_context(
                poll_context(*wait_timeout, *wait_interval),
                "Waiting for operation".to_string(),
                |ctx, progress| async move { wait_for_completion(operation, &ctx, progress).await },
            )
            .await?;

            print_result(result, output_format, query)
        }
    }
}

/// Operations without a final body (most deletes) report plain success
fn print_result(result: Value, output_format: OutputFormat, query: Option<&str>) -> CliResult<()> {
    let format = output::OutputFormat::resolve(output_format, output::OutputFormat::Json);
    if !result.is_null() {
        print_output(result, format, query)?;
    } else if matches!(output_format, OutputFormat::Auto | OutputFormat::Table) {
        println!("Operation succeeded.");
    } else {
        print_output(json!({ "status": "Succeeded" }), format, query)?;
    }
    Ok(())
}
