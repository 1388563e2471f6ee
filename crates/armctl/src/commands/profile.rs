//! Profile management command implementations

use crate::cli::{OutputFormat, ProfileCommands};
use crate::connection::ConnectionManager;
use crate::error::ArmCtlError;
use crate::output;
use armctl_core::{AuthKind, Profile};
use colored::Colorize;
use std::io::{self, Write};
use tracing::{debug, trace};

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
) -> Result<(), ArmCtlError> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format),
        Path => handle_path(conn_mgr, output_format),
        Show { name } => handle_show(conn_mgr, name, output_format),
        Set {
            name,
            subscription_id,
            tenant_id,
            location,
            resource_group,
            base_url,
            auth,
            access_token,
        } => {
            let profile = Profile {
                subscription_id: subscription_id.clone(),
                tenant_id: tenant_id.clone(),
                location: location.clone(),
                resource_group: resource_group.clone(),
                base_url: base_url.clone(),
                auth: *auth,
                access_token: access_token.clone(),
            };
            handle_set(conn_mgr, name, profile)
        }
        Remove { name, yes } => handle_remove(conn_mgr, name, *yes),
        Default { name } => handle_default(conn_mgr, name),
    }
}

/// Profile as shown to users; the token itself is never printed
fn profile_summary(name: &str, profile: &Profile, is_default: bool) -> serde_json::Value {
    let mut obj = serde_json::json!({
        "name": name,
        "subscription_id": profile.subscription_id,
        "auth": profile.auth.to_string(),
        "base_url": profile.base_url,
        "is_default": is_default,
    });
    if let Some(tenant) = &profile.tenant_id {
        obj["tenant_id"] = serde_json::json!(tenant);
    }
    if let Some(location) = &profile.location {
        obj["location"] = serde_json::json!(location);
    }
    if let Some(rg) = &profile.resource_group {
        obj["resource_group"] = serde_json::json!(rg);
    }
    if profile.auth == AuthKind::Token {
        obj["token_configured"] = serde_json::json!(profile.has_token());
    }
    obj
}

fn structured_format(output_format: OutputFormat) -> Option<output::OutputFormat> {
    match output_format {
        OutputFormat::Json => Some(output::OutputFormat::Json),
        OutputFormat::Yaml => Some(output::OutputFormat::Yaml),
        OutputFormat::Auto | OutputFormat::Table => None,
    }
}

fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> Result<(), ArmCtlError> {
    debug!("Listing all configured profiles");
    let profiles = conn_mgr.config.list_profiles();
    trace!("Found {} profiles", profiles.len());
    let default = conn_mgr.config.default_profile.as_deref();

    if let Some(fmt) = structured_format(output_format) {
        let config_path = conn_mgr
            .config_file()
            .ok()
            .map(|p| p.to_string_lossy().to_string());
        let profile_list: Vec<serde_json::Value> = profiles
            .iter()
            .map(|(name, profile)| {
                profile_summary(name, profile, default == Some(name.as_str()))
            })
            .collect();

        let output_data = serde_json::json!({
            "config_path": config_path,
            "profiles": profile_list,
            "count": profiles.len()
        });
        output::print_output(&output_data, fmt, None)?;
        return Ok(());
    }

    if let Ok(path) = conn_mgr.config_file() {
        println!("Configuration file: {}", path.display());
        println!();
    }

    if profiles.is_empty() {
        println!("No profiles configured.");
        println!("Use 'armctl profile set' to create a profile.");
        return Ok(());
    }

    for (name, profile) in profiles {
        let marker = if default == Some(name.as_str()) {
            "*".green().bold().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{} {:<16} {}  {}  {}",
            marker,
            name,
            profile.subscription_id,
            profile.auth,
            profile.location.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn handle_path(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> Result<(), ArmCtlError> {
    let config_path = conn_mgr.config_file()?;

    match structured_format(output_format) {
        Some(fmt) => {
            let output_data = serde_json::json!({
                "config_path": config_path.to_string_lossy()
            });
            output::print_output(&output_data, fmt, None)?;
        }
        None => println!("{}", config_path.display()),
    }
    Ok(())
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> Result<(), ArmCtlError> {
    let profile = conn_mgr.config.get_profile(name)?;
    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name);

    if let Some(fmt) = structured_format(output_format) {
        output::print_output(profile_summary(name, profile, is_default), fmt, None)?;
        return Ok(());
    }

    println!("Profile: {}{}", name, if is_default { " (default)" } else { "" });
    println!("Subscription: {}", profile.subscription_id);
    if let Some(tenant) = &profile.tenant_id {
        println!("Tenant: {}", tenant);
    }
    println!("Endpoint: {}", profile.base_url);
    println!("Auth: {}", profile.auth);
    if profile.auth == AuthKind::Token {
        println!(
            "Token: {}",
            if profile.has_token() {
                "configured"
            } else {
                "missing"
            }
        );
    }
    if let Some(location) = &profile.location {
        println!("Location: {}", location);
    }
    if let Some(rg) = &profile.resource_group {
        println!("Resource group: {}", rg);
    }
    Ok(())
}

fn handle_set(conn_mgr: &ConnectionManager, name: &str, profile: Profile) -> Result<(), ArmCtlError> {
    debug!("Setting profile: {}", name);

    // `${VAR}` values are only known at load time
    if !profile.subscription_id.starts_with("${") && !profile.base_url.starts_with("${") {
        profile.validate(name)?;
    }
    if profile.auth == AuthKind::Token
        && profile.access_token.as_deref().is_some_and(|t| !t.starts_with("${"))
    {
        eprintln!(
            "{} the access token will be stored in plain text; \
             consider --access-token '${{AZURE_ACCESS_TOKEN}}' instead",
            "warning:".yellow().bold()
        );
    }

    let mut config = conn_mgr.config.clone();
    let verb = if config.profiles.contains_key(name) {
        "updated"
    } else {
        "created"
    };
    config.set_profile(name.to_string(), profile);
    let became_default = config.default_profile.is_none();
    if became_default {
        config.default_profile = Some(name.to_string());
    }
    conn_mgr.save_config(&config)?;

    println!("Profile '{}' {}.", name, verb);
    if became_default {
        println!("'{}' is now the default profile.", name);
    }
    Ok(())
}

/// Ask a yes/no question on stdin; anything but y/yes is no
fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn handle_remove(conn_mgr: &ConnectionManager, name: &str, yes: bool) -> Result<(), ArmCtlError> {
    debug!("Removing profile: {}", name);
    conn_mgr.config.get_profile(name)?;

    let was_default = conn_mgr.config.default_profile.as_deref() == Some(name);
    let prompt = if was_default {
        format!("Remove '{}' (the default profile)?", name)
    } else {
        format!("Remove profile '{}'?", name)
    };
    if !yes && !confirm(&prompt)? {
        println!("Nothing removed.");
        return Ok(());
    }

    let mut config = conn_mgr.config.clone();
    config.remove_profile(name);
    conn_mgr.save_config(&config)?;

    println!("Profile '{}' removed.", name);
    if was_default {
        println!("No default profile is set; choose one with 'armctl profile default <name>'.");
    }
    Ok(())
}

fn handle_default(conn_mgr: &ConnectionManager, name: &str) -> Result<(), ArmCtlError> {
    debug!("Setting default profile: {}", name);
    conn_mgr.config.get_profile(name)?;

    let mut config = conn_mgr.config.clone();
    config.default_profile = Some(name.to_string());
    conn_mgr.save_config(&config)?;

    println!("Default profile set to '{}'.", name);
    Ok(())
}
