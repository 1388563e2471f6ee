//! Shared handling for long-running operations: `--no-wait`, wait limits,
//! Ctrl-C cancellation and the progress spinner
//!
//! Waiting itself is done by `armctl_core::lro`; this module only turns its
//! progress events into spinner output and its handles into something a user
//! can resume from.

use std::future::Future;
use std::time::Duration;

use armctl_core::{
    ArmOperation, LroMethod, Operation, PollContext, ProgressCallback, ProgressEvent, Submission,
};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cli::OutputFormat;
use crate::error::Result as CliResult;
use crate::output::print_output;

/// Common CLI arguments for mutating commands
#[derive(Args, Debug, Clone)]
pub struct AsyncOperationArgs {
    /// Return once the request is accepted instead of waiting for completion
    #[arg(long)]
    pub no_wait: bool,

    /// Maximum time to wait in seconds
    #[arg(long, default_value = "900", conflicts_with = "no_wait")]
    pub wait_timeout: u64,

    /// Polling interval in seconds (a Retry-After from Azure takes precedence)
    #[arg(long, default_value = "5", conflicts_with = "no_wait")]
    pub wait_interval: u64,
}

impl AsyncOperationArgs {
    pub fn poll_context(&self) -> PollContext {
        poll_context(self.wait_timeout, self.wait_interval)
    }
}

/// Build a poll context whose cancellation token fires on Ctrl-C
pub fn poll_context(timeout_secs: u64, interval_secs: u64) -> PollContext {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no longer waiting for the operation");
            on_signal.cancel();
        }
    });

    PollContext::new(Duration::from_secs(timeout_secs))
        .with_interval(Duration::from_secs(interval_secs))
        .with_cancellation(token)
}

/// What `--no-wait` reports for an operation that is still running
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedOperation {
    pub status: &'static str,
    pub operation_id: String,
    pub resource_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polling_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_with: Option<String>,
}

impl AcceptedOperation {
    pub fn from_operation<T>(operation: &ArmOperation<T>) -> Self
    where
        ArmOperation<T>: Operation,
    {
        let polling_url = operation.polling_url().map(|u| u.to_string());
        let resume_with = polling_url.as_deref().map(|url| {
            resume_command(
                url,
                operation.uses_location(),
                operation.method(),
                operation.resource_url().as_str(),
            )
        });
        Self {
            status: "Accepted",
            operation_id: operation.id().to_string(),
            resource_url: operation.resource_url().to_string(),
            polling_url,
            resume_with,
        }
    }
}

/// `armctl operation wait` invocation that picks an accepted operation back up
///
/// PUT and PATCH carry the resource URL so the resumed wait can print the
/// final resource.
fn resume_command(
    polling_url: &str,
    uses_location: bool,
    method: LroMethod,
    resource_url: &str,
) -> String {
    let mut cmd = String::from("armctl operation wait");
    if uses_location {
        cmd.push_str(" --location");
    }
    if matches!(method, LroMethod::Put | LroMethod::Patch) {
        cmd.push_str(&format!(" --resource '{}'", resource_url));
    }
    cmd.push_str(&format!(" '{}'", polling_url));
    cmd
}

/// Print the result of a submission made with `--no-wait`
pub fn print_submission<T: Serialize>(
    submission: Submission<T, ArmOperation<T>>,
    output_format: OutputFormat,
    query: Option<&str>,
    accepted_message: &str,
) -> CliResult<()>
where
    ArmOperation<T>: Operation,
{
    match submission {
        Submission::Completed(value) => {
            debug!("Operation completed synchronously");
            let format = crate::output::OutputFormat::resolve(
                output_format,
                crate::output::OutputFormat::Json,
            );
            print_output(value, format, query)?;
        }
        Submission::Pending(operation) => {
            print_pending(&operation, output_format, query, accepted_message)?;
        }
    }
    Ok(())
}

/// Print the handle of an operation that is still running
pub fn print_pending<T>(
    operation: &ArmOperation<T>,
    output_format: OutputFormat,
    query: Option<&str>,
    accepted_message: &str,
) -> CliResult<()>
where
    ArmOperation<T>: Operation,
{
    let accepted = AcceptedOperation::from_operation(operation);
    match output_format {
        OutputFormat::Auto | OutputFormat::Table => {
            println!("{}", accepted_message);
            println!("Operation: {}", accepted.operation_id);
            match &accepted.resume_with {
                Some(cmd) => println!("To wait for completion, run: {}", cmd),
                None => println!(
                    "Azure is provisioning the resource; check its provisioningState to follow progress"
                ),
            }
        }
        OutputFormat::Json => print_output(&accepted, crate::output::OutputFormat::Json, query)?,
        OutputFormat::Yaml => print_output(&accepted, crate::output::OutputFormat::Yaml, query)?,
    }
    Ok(())
}

/// Run a wait with a spinner driven by progress events
///
/// `run` receives the poll context and the progress callback and is expected
/// to call one of the core workflows or `wait_for_completion`.
pub async fn wait_with_progress<T, F, Fut>(
    async_ops: &AsyncOperationArgs,
    message: String,
    run: F,
) -> CliResult<T>
where
    F: FnOnce(PollContext, Option<ProgressCallback>) -> Fut,
    Fut: Future<Output = armctl_core::Result<T>>,
{
    wait_with_context(async_ops.poll_context(), message, run).await
}

pub async fn wait_with_context<T, F, Fut>(ctx: PollContext, message: String, run: F) -> CliResult<T>
where
    F: FnOnce(PollContext, Option<ProgressCallback>) -> Fut,
    Fut: Future<Output = armctl_core::Result<T>>,
{
    let pb = spinner(&message);
    let result = run(ctx, Some(progress_callback(pb.clone()))).await;

    // A synchronous completion emits no events
    if !pb.is_finished() {
        pb.finish_and_clear();
    }

    result.map_err(Into::into)
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]")
    {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(message.to_string());
    pb
}

/// Map progress events onto the spinner
fn progress_callback(pb: ProgressBar) -> ProgressCallback {
    Box::new(move |event: ProgressEvent| match &event {
        ProgressEvent::Started { operation } => {
            pb.set_message(format!("Operation {} started", operation));
        }
        ProgressEvent::Polling {
            operation,
            status,
            iteration,
            ..
        } => {
            pb.set_message(format!(
                "Operation {}: {} (poll {})",
                operation,
                format_operation_status(status),
                iteration
            ));
        }
        ProgressEvent::Completed { operation, elapsed } => {
            pb.finish_with_message(format!(
                "Operation {}: {} in {:.1}s",
                operation,
                format_operation_status("Succeeded"),
                elapsed.as_secs_f64()
            ));
        }
        ProgressEvent::Failed { operation, error } => {
            pb.finish_with_message(format!(
                "Operation {}: {}",
                operation,
                format_operation_status("Failed")
            ));
            debug!(operation = %operation, "Operation failed: {}", error);
        }
    })
}

/// Format an ARM operation status for display with status icons
fn format_operation_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "succeeded" => format!("\u{2713} {}", status),
        "failed" => format!("\u{2717} {}", status),
        "canceled" | "cancelled" => format!("\u{2298} {}", status),
        "inprogress" | "running" | "accepted" | "creating" | "updating" | "deleting" => {
            format!("\u{21bb} {}", status)
        }
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_operation_status() {
        assert_eq!(format_operation_status("Succeeded"), "\u{2713} Succeeded");
        assert_eq!(format_operation_status("Failed"), "\u{2717} Failed");
        assert_eq!(format_operation_status("Canceled"), "\u{2298} Canceled");
        assert_eq!(format_operation_status("InProgress"), "\u{21bb} InProgress");
        assert_eq!(format_operation_status("Updating"), "\u{21bb} Updating");
        assert_eq!(format_operation_status("Migrating"), "Migrating");
    }

    #[test]
    fn test_progress_callback_finishes_spinner() {
        let pb = ProgressBar::hidden();
        let callback = progress_callback(pb.clone());

        callback(ProgressEvent::Started {
            operation: "op-1".to_string(),
        });
        assert!(!pb.is_finished());

        callback(ProgressEvent::Completed {
            operation: "op-1".to_string(),
            elapsed: Duration::from_secs(3),
        });
        assert!(pb.is_finished());
        assert!(pb.message().contains("Succeeded"));
    }

    #[tokio::test]
    async fn test_poll_context_from_args() {
        let args = AsyncOperationArgs {
            no_wait: false,
            wait_timeout: 60,
            wait_interval: 2,
        };
        let ctx = args.poll_context();
        assert_eq!(ctx.timeout(), Duration::from_secs(60));
        assert_eq!(ctx.interval(), Duration::from_secs(2));
        assert!(!ctx.cancellation_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_with_context_maps_errors() {
        let ctx = PollContext::new(Duration::from_secs(1));
        let result: CliResult<()> = wait_with_context(ctx, "waiting".to_string(), |_, _| async {
            Err(armctl_core::CoreError::OperationFailed {
                operation: "op-1".to_string(),
                reason: "boom".to_string(),
            })
        })
        .await;
        assert!(matches!(
            result,
            Err(crate::error::ArmCtlError::OperationFailed { .. })
        ));
    }

    #[test]
    fn test_accepted_operation_serializes_camel_case() {
        let accepted = AcceptedOperation {
            status: "Accepted",
            operation_id: "op-1".to_string(),
            resource_url: "https://management.azure.com/x".to_string(),
            polling_url: Some("https://management.azure.com/op-1".to_string()),
            resume_with: None,
        };
        let value = serde_json::to_value(&accepted).unwrap();
        assert_eq!(value["operationId"], "op-1");
        assert_eq!(value["pollingUrl"], "https://management.azure.com/op-1");
        assert!(value.get("resumeWith").is_none());
    }

    #[test]
    fn test_resume_command_for_put_names_resource() {
        let cmd = resume_command(
            "https://management.azure.com/operations/op-1",
            false,
            LroMethod::Put,
            "https://management.azure.com/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/a?api-version=2023-05-01",
        );
        assert_eq!(
            cmd,
            "armctl operation wait --resource 'https://management.azure.com/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/a?api-version=2023-05-01' 'https://management.azure.com/operations/op-1'"
        );
    }

    #[test]
    fn test_resume_command_for_delete_and_location() {
        assert_eq!(
            resume_command("https://x/op-2", false, LroMethod::Delete, "https://x/r"),
            "armctl operation wait 'https://x/op-2'"
        );
        assert_eq!(
            resume_command("https://x/loc", true, LroMethod::Post, "https://x/r"),
            "armctl operation wait --location 'https://x/loc'"
        );
    }
}
