//! Convenience parameter structs for the create workflows
//!
//! Each struct carries the handful of fields a typical create needs, fills
//! in the usual defaults, and turns into the typed request body with
//! `into_request()`. For anything more exotic, build the model directly.

use crate::error::{CoreError, Result};
use crate::models::{
    AddressSpace, PublicIpAddress, PublicIpAddressProperties, Sku, StorageAccount,
    StorageAccountProperties, Subnet, VirtualNetwork, VirtualNetworkProperties,
};
use std::collections::HashMap;

/// Check a storage account name: 3-24 characters, lowercase letters and digits
pub fn validate_storage_account_name(name: &str) -> Result<()> {
    if !(3..=24).contains(&name.len()) {
        return Err(CoreError::Validation(format!(
            "storage account name '{name}' must be 3-24 characters long"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(CoreError::Validation(format!(
            "storage account name '{name}' may only contain lowercase letters and digits"
        )));
    }
    Ok(())
}

fn validate_prefix(prefix: &str) -> Result<()> {
    let valid = prefix
        .split_once('/')
        .is_some_and(|(addr, len)| !addr.is_empty() && len.parse::<u8>().is_ok_and(|l| l <= 128));
    if valid {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "'{prefix}' is not a CIDR prefix (expected e.g. 10.0.0.0/16)"
        )))
    }
}

/// Parameters for creating a storage account
///
/// # Example
///
/// ```rust
/// use armctl_core::params::CreateStorageAccountParams;
///
/// let request = CreateStorageAccountParams::new("armctldemo01", "westeurope")
///     .with_sku("Standard_GRS")
///     .with_tag("env", "dev")
///     .into_request();
///
/// assert_eq!(request.sku.unwrap().name, "Standard_GRS");
/// ```
#[derive(Debug, Clone)]
pub struct CreateStorageAccountParams {
    /// Globally unique account name (required)
    pub name: String,
    /// Azure region (required)
    pub location: String,
    /// Replication SKU (default: "Standard_LRS")
    pub sku: Option<String>,
    /// Account kind (default: "StorageV2")
    pub kind: Option<String>,
    /// "Hot" or "Cool"
    pub access_tier: Option<String>,
    /// Reject plain HTTP (default: true)
    pub https_only: Option<bool>,
    /// Minimum TLS version (default: "TLS1_2")
    pub minimum_tls_version: Option<String>,
    pub tags: HashMap<String, String>,
}

impl CreateStorageAccountParams {
    #[must_use]
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            sku: None,
            kind: None,
            access_tier: None,
            https_only: None,
            minimum_tls_version: None,
            tags: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn with_access_tier(mut self, tier: impl Into<String>) -> Self {
        self.access_tier = Some(tier.into());
        self
    }

    #[must_use]
    pub fn with_https_only(mut self, https_only: bool) -> Self {
        self.https_only = Some(https_only);
        self
    }

    #[must_use]
    pub fn with_minimum_tls_version(mut self, version: impl Into<String>) -> Self {
        self.minimum_tls_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_storage_account_name(&self.name)
    }

    /// Request body for `PUT .../storageAccounts/{name}`
    #[must_use]
    pub fn into_request(self) -> StorageAccount {
        StorageAccount {
            location: self.location,
            kind: Some(self.kind.unwrap_or_else(|| "StorageV2".to_string())),
            sku: Some(Sku {
                name: self.sku.unwrap_or_else(|| "Standard_LRS".to_string()),
                tier: None,
            }),
            tags: self.tags,
            properties: Some(StorageAccountProperties {
                access_tier: self.access_tier,
                supports_https_traffic_only: Some(self.https_only.unwrap_or(true)),
                minimum_tls_version: Some(
                    self.minimum_tls_version
                        .unwrap_or_else(|| "TLS1_2".to_string()),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Parameters for creating a virtual network
#[derive(Debug, Clone)]
pub struct CreateVirtualNetworkParams {
    pub location: String,
    /// At least one CIDR prefix
    pub address_prefixes: Vec<String>,
    /// `(name, prefix)` pairs
    pub subnets: Vec<(String, String)>,
    pub tags: HashMap<String, String>,
}

impl CreateVirtualNetworkParams {
    #[must_use]
    pub fn new(location: impl Into<String>, address_prefix: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            address_prefixes: vec![address_prefix.into()],
            subnets: Vec::new(),
            tags: HashMap::new(),
        }
    }

    /// Add another address prefix
    #[must_use]
    pub fn with_address_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.address_prefixes.push(prefix.into());
        self
    }

    #[must_use]
    pub fn with_subnet(mut self, name: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.subnets.push((name.into(), prefix.into()));
        self
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.address_prefixes.is_empty() {
            return Err(CoreError::Validation(
                "a virtual network needs at least one address prefix".to_string(),
            ));
        }
        for prefix in &self.address_prefixes {
            validate_prefix(prefix)?;
        }
        for (name, prefix) in &self.subnets {
            if name.is_empty() {
                return Err(CoreError::Validation("subnet name is empty".to_string()));
            }
            validate_prefix(prefix)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn into_request(self) -> VirtualNetwork {
        VirtualNetwork {
            location: Some(self.location),
            tags: self.tags,
            properties: VirtualNetworkProperties {
                provisioning_state: None,
                address_space: AddressSpace {
                    address_prefixes: self.address_prefixes,
                },
                subnets: self
                    .subnets
                    .into_iter()
                    .map(|(name, prefix)| Subnet::new(name, prefix))
                    .collect(),
            },
            ..Default::default()
        }
    }
}

/// Parameters for creating a public IP address
#[derive(Debug, Clone)]
pub struct CreatePublicIpParams {
    pub location: String,
    /// "Basic" or "Standard" (default: "Standard")
    pub sku: Option<String>,
    /// "Static" or "Dynamic" (default: "Static")
    pub allocation_method: Option<String>,
    /// "IPv4" or "IPv6" (default: "IPv4")
    pub version: Option<String>,
    pub idle_timeout_in_minutes: Option<u32>,
    pub tags: HashMap<String, String>,
}

impl CreatePublicIpParams {
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            sku: None,
            allocation_method: None,
            version: None,
            idle_timeout_in_minutes: None,
            tags: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    #[must_use]
    pub fn with_allocation_method(mut self, method: impl Into<String>) -> Self {
        self.allocation_method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, minutes: u32) -> Self {
        self.idle_timeout_in_minutes = Some(minutes);
        self
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Standard SKU addresses must be statically allocated
    pub fn validate(&self) -> Result<()> {
        let standard = self
            .sku
            .as_deref()
            .is_none_or(|s| s.eq_ignore_ascii_case("standard"));
        let dynamic = self
            .allocation_method
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("dynamic"));
        if standard && dynamic {
            return Err(CoreError::Validation(
                "Standard SKU public IPs require Static allocation".to_string(),
            ));
        }
        if let Some(minutes) = self.idle_timeout_in_minutes
            && !(4..=30).contains(&minutes)
        {
            return Err(CoreError::Validation(format!(
                "idle timeout must be 4-30 minutes, got {minutes}"
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn into_request(self) -> PublicIpAddress {
        PublicIpAddress {
            location: Some(self.location),
            sku: Some(Sku {
                name: self.sku.unwrap_or_else(|| "Standard".to_string()),
                tier: None,
            }),
            tags: self.tags,
            properties: PublicIpAddressProperties {
                allocation_method: Some(
                    self.allocation_method
                        .unwrap_or_else(|| "Static".to_string()),
                ),
                address_version: Some(self.version.unwrap_or_else(|| "IPv4".to_string())),
                idle_timeout_in_minutes: self.idle_timeout_in_minutes,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_storage_account_defaults() {
        let request = CreateStorageAccountParams::new("acct01", "eastus").into_request();
        assert_eq!(request.location, "eastus");
        assert_eq!(request.kind.as_deref(), Some("StorageV2"));
        assert_eq!(request.sku.as_ref().unwrap().name, "Standard_LRS");
        let props = request.properties.unwrap();
        assert_eq!(props.supports_https_traffic_only, Some(true));
        assert_eq!(props.minimum_tls_version.as_deref(), Some("TLS1_2"));
    }

    #[test]
    fn test_storage_account_request_body() {
        let request = CreateStorageAccountParams::new("acct01", "eastus")
            .with_sku("Premium_LRS")
            .with_kind("BlockBlobStorage")
            .with_https_only(false)
            .into_request();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "location": "eastus",
                "kind": "BlockBlobStorage",
                "sku": {"name": "Premium_LRS"},
                "properties": {
                    "supportsHttpsTrafficOnly": false,
                    "minimumTlsVersion": "TLS1_2"
                }
            })
        );
    }

    #[test]
    fn test_storage_account_name_rules() {
        assert!(validate_storage_account_name("abc").is_ok());
        assert!(validate_storage_account_name("armctl2024demo").is_ok());
        assert!(validate_storage_account_name("ab").is_err());
        assert!(validate_storage_account_name(&"a".repeat(25)).is_err());
        assert!(validate_storage_account_name("Upper").is_err());
        assert!(validate_storage_account_name("with-dash").is_err());
    }

    #[test]
    fn test_vnet_request() {
        let params = CreateVirtualNetworkParams::new("westus", "10.0.0.0/16")
            .with_subnet("default", "10.0.0.0/24")
            .with_subnet("app", "10.0.1.0/24");
        params.validate().unwrap();

        let vnet = params.into_request();
        assert_eq!(vnet.location.as_deref(), Some("westus"));
        assert_eq!(vnet.properties.address_space.address_prefixes, vec!["10.0.0.0/16"]);
        assert_eq!(vnet.properties.subnets.len(), 2);
        assert_eq!(
            vnet.properties.subnets[1].properties.address_prefix.as_deref(),
            Some("10.0.1.0/24")
        );
    }

    #[test]
    fn test_vnet_rejects_bad_prefix() {
        let params = CreateVirtualNetworkParams::new("westus", "10.0.0.0");
        assert!(params.validate().is_err());

        let params = CreateVirtualNetworkParams::new("westus", "10.0.0.0/16")
            .with_subnet("default", "10.0.0.0/abc");
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_public_ip_defaults() {
        let ip = CreatePublicIpParams::new("northeurope").into_request();
        assert_eq!(ip.sku.unwrap().name, "Standard");
        assert_eq!(ip.properties.allocation_method.as_deref(), Some("Static"));
        assert_eq!(ip.properties.address_version.as_deref(), Some("IPv4"));
    }

    #[test]
    fn test_public_ip_validation() {
        assert!(CreatePublicIpParams::new("x").validate().is_ok());
        assert!(
            CreatePublicIpParams::new("x")
                .with_allocation_method("Dynamic")
                .validate()
                .is_err()
        );
        assert!(
            CreatePublicIpParams::new("x")
                .with_sku("Basic")
                .with_allocation_method("Dynamic")
                .validate()
                .is_ok()
        );
        assert!(
            CreatePublicIpParams::new("x")
                .with_idle_timeout(60)
                .validate()
                .is_err()
        );
    }
}
