//! `Microsoft.Storage/storageAccounts`

use super::ProvisionedResource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<StorageAccountProperties>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    /// e.g. `Standard_LRS`, `Premium_ZRS`
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_https_traffic_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_tls_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_blob_public_access: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_of_primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_endpoints: Option<Endpoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<String>,
}

impl ProvisionedResource for StorageAccount {
    fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_service_response() {
        let json = r#"{
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct1",
            "name": "acct1",
            "type": "Microsoft.Storage/storageAccounts",
            "location": "westeurope",
            "kind": "StorageV2",
            "sku": {"name": "Standard_LRS", "tier": "Standard"},
            "tags": {"env": "dev"},
            "properties": {
                "provisioningState": "Succeeded",
                "supportsHttpsTrafficOnly": true,
                "minimumTlsVersion": "TLS1_2",
                "primaryEndpoints": {"blob": "https://acct1.blob.core.windows.net/"},
                "encryption": {"keySource": "Microsoft.Storage"}
            }
        }"#;
        let account: StorageAccount = serde_json::from_str(json).unwrap();
        assert_eq!(account.name.as_deref(), Some("acct1"));
        assert_eq!(account.sku.as_ref().unwrap().name, "Standard_LRS");
        assert_eq!(account.tags.get("env").map(String::as_str), Some("dev"));
        assert!(account.is_provisioned());
        let endpoints = account.properties.unwrap().primary_endpoints.unwrap();
        assert_eq!(
            endpoints.blob.as_deref(),
            Some("https://acct1.blob.core.windows.net/")
        );
    }

    #[test]
    fn test_serialize_skips_unset_fields() {
        let account = StorageAccount {
            location: "eastus".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value, serde_json::json!({"location": "eastus"}));
    }

    #[test]
    fn test_pending_state_is_not_provisioned() {
        let account: StorageAccount = serde_json::from_str(
            r#"{"location": "eastus", "properties": {"provisioningState": "ResolvingDNS"}}"#,
        )
        .unwrap();
        assert_eq!(account.provisioning_state(), Some("ResolvingDNS"));
        assert!(!account.is_provisioned());
    }
}
