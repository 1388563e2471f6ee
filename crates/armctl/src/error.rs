//! Error types for armctl
//!
//! Library errors are mapped into [`ArmCtlError`] so each one can carry
//! tips. Poll errors keep the fact that the remote outcome is unknown.

use armctl_core::{ConfigError, CoreError, ErrorKind};
use colored::Colorize;
use thiserror::Error;

/// A follow-up the user can take, optionally with a command to run
#[derive(Debug, Clone, PartialEq)]
pub struct Tip {
    pub text: String,
    pub command: Option<String>,
}

impl Tip {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            command: None,
        }
    }

    fn run(text: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            command: Some(command.into()),
        }
    }
}

/// Render an error for stderr
///
/// ```text
/// error: Timed out after 900s waiting for operation 'op-1'
///   note: completion could not be confirmed; the remote outcome is unknown
///
///   tip: resume waiting
///       armctl operation wait <url>
/// ```
fn render(headline: &str, notes: &[String], tips: &[Tip]) -> String {
    let mut out = format!("{}{} {}\n", "error".red().bold(), ":".bold(), headline);
    for note in notes {
        out.push_str(&format!("  {}{} {}\n", "note".cyan().bold(), ":".bold(), note));
    }
    for tip in tips {
        out.push_str(&format!("\n  {}{} {}\n", "tip".yellow().bold(), ":".bold(), tip.text));
        if let Some(command) = &tip.command {
            out.push_str(&format!("      {}\n", command));
        }
    }
    out
}

#[derive(Error, Debug)]
pub enum ArmCtlError {
    #[error("config: {0}")]
    Config(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profile configured and AZURE_SUBSCRIPTION_ID is not set")]
    NoProfileConfigured,

    #[error("Could not authenticate to Azure: {message}")]
    AuthenticationFailed { message: String },

    /// Request rejected before anything changed remotely
    #[error("{message}")]
    ApiError { status: Option<u16>, message: String },

    /// The service reported the operation failed or was cancelled
    #[error("{message}")]
    OperationFailed { message: String },

    /// Waiting stopped without a terminal status
    #[error("{message}")]
    OutcomeUnknown { message: String, timed_out: bool },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Cannot reach the ARM endpoint: {message}")]
    ConnectionError { message: String },

    #[error("Cannot write output: {message}")]
    OutputError { message: String },
}

pub type Result<T> = std::result::Result<T, ArmCtlError>;

impl ArmCtlError {
    /// Context printed under the headline
    pub fn notes(&self) -> Vec<String> {
        match self {
            ArmCtlError::OutcomeUnknown { .. } => vec![
                "completion could not be confirmed; the remote outcome is unknown".to_string(),
            ],
            ArmCtlError::OperationFailed { .. } => vec![
                "the request was accepted, but Azure reports the operation did not succeed"
                    .to_string(),
            ],
            ArmCtlError::ApiError {
                status: Some(status),
                ..
            } => vec![format!(
                "ARM rejected the request with HTTP {status}; nothing was changed"
            )],
            _ => vec![],
        }
    }

    pub fn tips(&self) -> Vec<Tip> {
        match self {
            ArmCtlError::ProfileNotFound { name } => vec![
                Tip::run("list the configured profiles", "armctl profile list"),
                Tip::run(
                    format!("or create '{}'", name),
                    format!("armctl profile set {} --subscription-id <id>", name),
                ),
            ],
            ArmCtlError::NoProfileConfigured => vec![
                Tip::run(
                    "create a profile",
                    "armctl profile set dev --subscription-id <id>",
                ),
                Tip::text("or export AZURE_SUBSCRIPTION_ID"),
            ],
            ArmCtlError::AuthenticationFailed { .. } => vec![
                Tip::run("sign in with the Azure CLI", "az login"),
                Tip::text("token profiles need AZURE_ACCESS_TOKEN set and unexpired"),
            ],
            ArmCtlError::ApiError {
                status: Some(404), ..
            } => vec![
                Tip::text("check the resource name and resource group"),
                Tip::run("check which subscription is in use", "armctl profile show <profile>"),
            ],
            ArmCtlError::ApiError {
                status: Some(409), ..
            } => vec![Tip::text(
                "another operation may be running on this resource; retry once it finishes",
            )],
            ArmCtlError::OutcomeUnknown { timed_out: true, .. } => vec![
                Tip::text("the operation may still be running; raise --wait-timeout next time"),
                Tip::run("resume waiting", "armctl operation wait <url>"),
            ],
            ArmCtlError::OutcomeUnknown { .. } => vec![Tip::text(
                "the operation may still be running; check the resource state before retrying",
            )],
            ArmCtlError::ConnectionError { .. } => vec![Tip::run(
                "check network access to the profile endpoint",
                "armctl profile show <profile>",
            )],
            ArmCtlError::InvalidInput { .. } => {
                vec![Tip::run("check the command syntax", "armctl <command> --help")]
            }
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr
    pub fn print_diagnostic(&self) {
        eprint!("{}", render(&self.to_string(), &self.notes(), &self.tips()));
    }
}

impl From<serde_json::Error> for ArmCtlError {
    fn from(err: serde_json::Error) -> Self {
        ArmCtlError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for ArmCtlError {
    fn from(err: std::io::Error) -> Self {
        ArmCtlError::OutputError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<anyhow::Error> for ArmCtlError {
    fn from(err: anyhow::Error) -> Self {
        ArmCtlError::Config(format!("{:#}", err))
    }
}

impl From<ConfigError> for ArmCtlError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => ArmCtlError::ProfileNotFound { name },
            ConfigError::NoProfiles { .. } => ArmCtlError::NoProfileConfigured,
            ConfigError::MissingToken(message) => ArmCtlError::AuthenticationFailed { message },
            invalid @ ConfigError::InvalidProfile { .. } => ArmCtlError::InvalidInput {
                message: invalid.to_string(),
            },
            other => ArmCtlError::Config(other.to_string()),
        }
    }
}

impl From<CoreError> for ArmCtlError {
    fn from(err: CoreError) -> Self {
        match err.kind() {
            ErrorKind::Poll => ArmCtlError::OutcomeUnknown {
                timed_out: err.is_timeout(),
                message: err.to_string(),
            },
            ErrorKind::Terminal => ArmCtlError::OperationFailed {
                message: err.to_string(),
            },
            ErrorKind::Submission if err.is_unauthorized() => ArmCtlError::AuthenticationFailed {
                message: err.to_string(),
            },
            ErrorKind::Submission => match err {
                CoreError::Http(e) if e.is_connect() || e.is_timeout() => {
                    ArmCtlError::ConnectionError {
                        message: e.to_string(),
                    }
                }
                other => ArmCtlError::ApiError {
                    status: other.status(),
                    message: other.to_string(),
                },
            },
            ErrorKind::Local => match err {
                CoreError::Validation(message) => ArmCtlError::InvalidInput { message },
                CoreError::Profile(config_err) => ArmCtlError::from(config_err),
                other => ArmCtlError::Config(other.to_string()),
            },
        }
    }
}
