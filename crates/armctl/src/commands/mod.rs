//! Command implementations

pub mod api;
pub mod async_utils;
pub mod network;
pub mod operation;
pub mod profile;
pub mod resource;
pub mod storage;

use armctl_core::{ArmOperation, ResourceId, Submission};

use crate::cli::OutputFormat;
use crate::error::Result as CliResult;
use crate::output::print_output;

/// Report a finished delete
pub fn print_deleted(
    id: &ResourceId,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    match output_format {
        OutputFormat::Auto | OutputFormat::Table => {
            println!("{} '{}' deleted.", resource_kind(id), id.name());
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let format = crate::output::OutputFormat::resolve(
                output_format,
                crate::output::OutputFormat::Json,
            );
            let output_data = serde_json::json!({
                "id": id.to_string(),
                "status": "Deleted",
            });
            print_output(output_data, format, query)?;
        }
    }
    Ok(())
}

/// Report a delete submitted with `--no-wait`
pub fn print_delete_submission(
    submission: Submission<(), ArmOperation<()>>,
    id: &ResourceId,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    match submission {
        Submission::Completed(()) => print_deleted(id, output_format, query),
        Submission::Pending(operation) => async_utils::print_pending(
            &operation,
            output_format,
            query,
            &format!("Request to delete {} '{}' accepted.", resource_kind(id), id.name()),
        ),
    }
}

/// Short type name for messages, e.g. `virtualNetworks`
fn resource_kind(id: &ResourceId) -> String {
    id.resource_type()
        .and_then(|t| t.rsplit('/').next().map(str::to_string))
        .unwrap_or_else(|| "Resource".to_string())
}
