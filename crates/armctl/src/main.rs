use armctl_core::Config;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use tracing::{Instrument, debug, error, info, info_span};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands, OperationCommands, PublicIpCommands, StorageCommands, VnetCommands};
use connection::ConnectionManager;
use error::Result as CliResult;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match connect(&cli) {
        Ok(conn_mgr) => run(&cli, &conn_mgr).await,
        Err(e) => Err(e),
    };

    if let Err(e) = outcome {
        e.print_diagnostic();
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise each `-v` raises both crates one level
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("armctl={level},armctl_core={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();
}

/// Load the config (explicit file or platform default) behind a connection manager
fn connect(cli: &Cli) -> CliResult<ConnectionManager> {
    let path = cli.config_file.as_ref().map(PathBuf::from);
    let config = match &path {
        Some(path) => {
            debug!(path = %path.display(), "Loading config");
            Config::load_from_path(path)?
        }
        None => Config::load()?,
    };
    debug!(profiles = config.profiles.len(), "Config loaded");
    Ok(ConnectionManager::with_config_path(config, path))
}

async fn run(cli: &Cli, conn_mgr: &ConnectionManager) -> CliResult<()> {
    let span = info_span!("command", cmd = %describe(&cli.command));
    let started = std::time::Instant::now();

    let result = dispatch(cli, conn_mgr).instrument(span.clone()).await;

    span.in_scope(|| match &result {
        Ok(()) => info!(elapsed = ?started.elapsed(), "Command finished"),
        Err(e) => error!(elapsed = ?started.elapsed(), "Command failed: {}", e),
    });
    result
}

async fn dispatch(cli: &Cli, conn_mgr: &ConnectionManager) -> CliResult<()> {
    let profile = cli.profile.as_deref();
    let query = cli.query.as_deref();
    let format = cli.output;

    match &cli.command {
        Commands::Version => print_version(format),
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "armctl", &mut std::io::stdout());
            Ok(())
        }
        Commands::Profile(cmd) => {
            commands::profile::handle_profile_command(cmd, conn_mgr, format).await
        }
        Commands::Api {
            method,
            path,
            data,
            api_version,
        } => {
            let params = commands::api::ApiCommandParams {
                profile_name: profile,
                method: *method,
                path,
                data: data.as_deref(),
                api_version: api_version.as_deref(),
                query,
                output_format: format,
            };
            commands::api::handle_api_command(conn_mgr, params).await
        }
        Commands::Resource(cmd) => {
            commands::resource::handle_resource_command(cmd, conn_mgr, profile, format, query).await
        }
        Commands::Storage(cmd) => {
            commands::storage::handle_storage_command(cmd, conn_mgr, profile, format, query).await
        }
        Commands::Vnet(cmd) => {
            commands::network::handle_vnet_command(cmd, conn_mgr, profile, format, query).await
        }
        Commands::PublicIp(cmd) => {
            commands::network::handle_public_ip_command(cmd, conn_mgr, profile, format, query)
                .await
        }
        Commands::Operation(cmd) => {
            commands::operation::handle_operation_command(cmd, conn_mgr, profile, format, query)
                .await
        }
    }
}

fn print_version(format: cli::OutputFormat) -> CliResult<()> {
    match format {
        cli::OutputFormat::Json | cli::OutputFormat::Yaml => {
            let version = serde_json::json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            });
            output::print_output(
                version,
                output::OutputFormat::resolve(format, output::OutputFormat::Json),
                None,
            )?;
        }
        cli::OutputFormat::Auto | cli::OutputFormat::Table => {
            println!("armctl {}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}

/// One-line command summary for logs
///
/// Names the target only: request bodies, tags and tokens never appear.
fn describe(command: &Commands) -> String {
    use cli::{ProfileCommands as P, ResourceCommands as R};

    match command {
        Commands::Version => "version".to_string(),
        Commands::Completions { shell } => format!("completions {shell}"),
        Commands::Profile(cmd) => match cmd {
            P::List => "profile list".to_string(),
            P::Path => "profile path".to_string(),
            P::Show { name } => format!("profile show {name}"),
            P::Set { name, .. } => format!("profile set {name}"),
            P::Remove { name, .. } => format!("profile remove {name}"),
            P::Default { name } => format!("profile default {name}"),
        },
        Commands::Api { method, path, .. } => format!("api {method} {path}"),
        Commands::Resource(cmd) => match cmd {
            R::Get { id, .. } => format!("resource get {id}"),
            R::Create { id, .. } => format!("resource create {id}"),
            R::Delete { id, .. } => format!("resource delete {id}"),
        },
        Commands::Storage(cmd) => match cmd {
            StorageCommands::List { .. } => "storage list".to_string(),
            StorageCommands::Show { name, .. } => format!("storage show {name}"),
            StorageCommands::Create { name, .. } => format!("storage create {name}"),
            StorageCommands::Delete { name, .. } => format!("storage delete {name}"),
        },
        Commands::Vnet(cmd) => match cmd {
            VnetCommands::Show { name, .. } => format!("vnet show {name}"),
            VnetCommands::Create { name, .. } => format!("vnet create {name}"),
            VnetCommands::Delete { name, .. } => format!("vnet delete {name}"),
        },
        Commands::PublicIp(cmd) => match cmd {
            PublicIpCommands::Show { name, .. } => format!("public-ip show {name}"),
            PublicIpCommands::Create { name, .. } => format!("public-ip create {name}"),
            PublicIpCommands::Delete { name, .. } => format!("public-ip delete {name}"),
        },
        Commands::Operation(OperationCommands::Wait { url, .. }) => {
            // Status URLs can carry SAS-like query parameters
            let base = url.split('?').next().unwrap_or(url);
            format!("operation wait {base}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_hides_token() {
        let cli = Cli::try_parse_from([
            "armctl",
            "profile",
            "set",
            "ci",
            "--subscription-id",
            "sub",
            "--auth",
            "token",
            "--access-token",
            "super-secret",
        ])
        .unwrap();

        assert_eq!(describe(&cli.command), "profile set ci");
    }

    #[test]
    fn test_describe_hides_request_body() {
        let cli = Cli::try_parse_from([
            "armctl",
            "resource",
            "create",
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/ip1",
            "--api-version",
            "2024-05-01",
            "--data",
            r#"{"secret": "value"}"#,
        ])
        .unwrap();

        let described = describe(&cli.command);
        assert!(described.starts_with("resource create /subscriptions/s/"));
        assert!(!described.contains("secret"));
    }

    #[test]
    fn test_describe_strips_query_from_operation_url() {
        let cli = Cli::try_parse_from([
            "armctl",
            "operation",
            "wait",
            "https://management.azure.com/providers/Microsoft.Network/locations/westeurope/operations/op-1?api-version=2024-05-01&t=abc",
        ])
        .unwrap();

        assert_eq!(
            describe(&cli.command),
            "operation wait https://management.azure.com/providers/Microsoft.Network/locations/westeurope/operations/op-1"
        );
    }

    #[test]
    fn test_describe_api_call() {
        let cli = Cli::try_parse_from(["armctl", "api", "get", "/subscriptions"]).unwrap();
        assert_eq!(describe(&cli.command), "api GET /subscriptions");
    }
}
