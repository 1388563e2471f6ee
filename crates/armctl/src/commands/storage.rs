//! Storage account commands

use crate::cli::{OutputFormat, StorageCommands};
use crate::commands::async_utils::{print_submission, wait_with_progress};
use crate::commands::{print_delete_submission, print_deleted};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::{self, print_output};
use armctl_core::models::{StorageAccount, api_versions};
use armctl_core::params::CreateStorageAccountParams;
use armctl_core::{ProvisionedResource, workflows};
use serde_json::{Value, json};
use tracing::debug;

pub async fn handle_storage_command(
    cmd: &StorageCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile_name)?;

    match cmd {
        StorageCommands::List { resource_group } => {
            let path = match resource_group {
                Some(rg) => client.subscription_path(&format!(
                    "/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts",
                    rg
                )),
                None => client.subscription_path("/providers/Microsoft.Storage/storageAccounts"),
            };
            let accounts: Vec<StorageAccount> = client.list(&path, api_versions::STORAGE).await?;
            debug!("Found {} storage accounts", accounts.len());

            match output_format {
                OutputFormat::Auto | OutputFormat::Table => {
                    let rows: Vec<Value> = accounts.iter().map(summary_row).collect();
                    print_output(rows, output::OutputFormat::Table, query)?;
                }
                OutputFormat::Json | OutputFormat::Yaml => {
                    let format =
                        output::OutputFormat::resolve(output_format, output::OutputFormat::Json);
                    print_output(accounts, format, query)?;
                }
            }
        }
        StorageCommands::Show {
            name,
            resource_group,
        } => {
            let rg = conn_mgr.resource_group(profile_name, resource_group.as_deref())?;
            let id = workflows::storage_account_id(&client, &rg, name);
            let account: StorageAccount = client.get(&id.to_string(), api_versions::STORAGE).await?;
            let format = output::OutputFormat::resolve(output_format, output::OutputFormat::Json);
            print_output(account, format, query)?;
        }
        StorageCommands::Create {
            name,
            resource_group,
            location,
            sku,
            kind,
            access_tier,
            tags,
            async_ops,
        } => {
            let rg = conn_mgr.resource_group(profile_name, resource_group.as_deref())?;
            let location = conn_mgr.location(profile_name, location.as_deref())?;

            let mut params = CreateStorageAccountParams::new(name.as_str(), location);
            if let Some(sku) = sku {
                params = params.with_sku(sku.as_str());
            }
            if let Some(kind) = kind {
                params = params.with_kind(kind.as_str());
            }
            if let Some(tier) = access_tier {
                params = params.with_access_tier(tier.as_str());
            }
            for (key, value) in tags {
                params = params.with_tag(key.as_str(), value.as_str());
            }

            if async_ops.no_wait {
                params.validate()?;
                let id = workflows::storage_account_id(&client, &rg, name);
                let submission = client
                    .begin_create_or_update::<_, StorageAccount>(
                        &id.to_string(),
                        api_versions::STORAGE,
                        &params.into_request(),
                    )
                    .await?;
                return print_submission(
                    submission,
                    output_format,
                    query,
                    &format!("Request to create storage account '{}' accepted.", name),
                );
            }

            let account = wait_with_progress(
                async_ops,
                format!("Creating storage account {}", name),
                |ctx, progress| async move {
                    workflows::create_storage_account_and_wait(&client, &rg, params, &ctx, progress)
                        .await
                },
            )
            .await?;

            match output_format {
                OutputFormat::Auto | OutputFormat::Table => {
                    print_output(summary_row(&account), output::OutputFormat::Table, query)?;
                }
                OutputFormat::Json | OutputFormat::Yaml => {
                    let format =
                        output::OutputFormat::resolve(output_format, output::OutputFormat::Json);
                    print_output(account, format, query)?;
                }
            }
        }
        StorageCommands::Delete {
            name,
            resource_group,
            async_ops,
        } => {
            let rg = conn_mgr.resource_group(profile_name, resource_group.as_deref())?;
            let id = workflows::storage_account_id(&client, &rg, name);

            if async_ops.no_wait {
                let submission = client
                    .begin_delete(&id.to_string(), api_versions::STORAGE)
                    .await?;
                return print_delete_submission(submission, &id, output_format, query);
            }

            let path = id.to_string();
            wait_with_progress(
                async_ops,
                format!("Deleting storage account {}", name),
                |ctx, progress| async move {
                    workflows::delete_resource_and_wait(
                        &client,
                        &path,
                        api_versions::STORAGE,
                        &ctx,
                        progress,
                    )
                    .await
                },
            )
            .await?;
            print_deleted(&id, output_format, query)?;
        }
    }

    Ok(())
}

/// One table row per account
fn summary_row(account: &StorageAccount) -> Value {
    let properties = account.properties.as_ref();
    json!({
        "name": account.name,
        "location": account.location,
        "kind": account.kind,
        "sku": account.sku.as_ref().map(|s| s.name.as_str()),
        "accessTier": properties.and_then(|p| p.access_tier.as_deref()),
        "provisioningState": account.provisioning_state(),
        "blobEndpoint": properties
            .and_then(|p| p.primary_endpoints.as_ref())
            .and_then(|e| e.blob.as_deref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_row() {
        let account: StorageAccount = serde_json::from_value(json!({
            "name": "armctldemo01",
            "location": "westeurope",
            "kind": "StorageV2",
            "sku": {"name": "Standard_LRS", "tier": "Standard"},
            "properties": {
                "provisioningState": "Succeeded",
                "accessTier": "Hot",
                "primaryEndpoints": {"blob": "https://armctldemo01.blob.core.windows.net/"}
            }
        }))
        .unwrap();

        let row = summary_row(&account);
        assert_eq!(row["name"], "armctldemo01");
        assert_eq!(row["sku"], "Standard_LRS");
        assert_eq!(row["provisioningState"], "Succeeded");
        assert_eq!(
            row["blobEndpoint"],
            "https://armctldemo01.blob.core.windows.net/"
        );
    }

    #[test]
    fn test_summary_row_without_properties() {
        let account = StorageAccount {
            location: "eastus".to_string(),
            ..StorageAccount::default()
        };
        let row = summary_row(&account);
        assert_eq!(row["location"], "eastus");
        assert!(row["provisioningState"].is_null());
    }
}
