//! Raw API access commands for direct REST endpoint calls

use crate::cli::{HttpMethod, OutputFormat};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::print_output;
use anyhow::Context;
use serde_json::Value;
use tracing::debug;

/// Parameters for API command execution
pub struct ApiCommandParams<'a> {
    pub profile_name: Option<&'a str>,
    pub method: HttpMethod,
    pub path: &'a str,
    pub data: Option<&'a str>,
    pub api_version: Option<&'a str>,
    pub query: Option<&'a str>,
    pub output_format: OutputFormat,
}

/// Parse a `--data` argument: inline JSON, or `@path` to read a file
pub fn parse_data(data: &str) -> anyhow::Result<Value> {
    if let Some(file_path) = data.strip_prefix('@') {
        let content = std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read file: {}", file_path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON from file: {}", file_path))
    } else {
        serde_json::from_str(data).context("Failed to parse JSON from data parameter")
    }
}

/// Handle raw API commands
///
/// A single request is sent and its response printed as-is: no polling,
/// so a `202` prints whatever body (often none) came back.
pub async fn handle_api_command(conn_mgr: &ConnectionManager, params: ApiCommandParams<'_>) -> CliResult<()> {
    let client = conn_mgr.create_client(params.profile_name)?;

    let body = match params.data.map(parse_data).transpose()? {
        None if params.method.sends_body() => Some(serde_json::json!({})),
        body => body,
    };

    let response = client
        .request(params.method.as_method(), params.path, params.api_version, body.as_ref())
        .await?;
    debug!(status = response.status.as_u16(), "API response");

    let value: Value = if response.body.trim().is_empty() {
        serde_json::json!({ "status": response.status.as_u16() })
    } else {
        response.json()?
    };

    let format = crate::output::OutputFormat::resolve(
        params.output_format,
        crate::output::OutputFormat::Json,
    );
    print_output(value, format, params.query)?;
    Ok(())
}
