//! `Microsoft.Network` virtual networks, subnets and public IP addresses

use super::ProvisionedResource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub properties: VirtualNetworkProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub address_space: AddressSpace,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub properties: SubnetProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

impl Subnet {
    pub fn new(name: impl Into<String>, address_prefix: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            properties: SubnetProperties {
                address_prefix: Some(address_prefix.into()),
                provisioning_state: None,
            },
        }
    }
}

impl ProvisionedResource for VirtualNetwork {
    fn provisioning_state(&self) -> Option<&str> {
        self.properties.provisioning_state.as_deref()
    }
}

impl ProvisionedResource for Subnet {
    fn provisioning_state(&self) -> Option<&str> {
        self.properties.provisioning_state.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<super::Sku>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub properties: PublicIpAddressProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddressProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    /// `Static` or `Dynamic`
    #[serde(
        default,
        rename = "publicIPAllocationMethod",
        skip_serializing_if = "Option::is_none"
    )]
    pub allocation_method: Option<String>,
    /// `IPv4` or `IPv6`
    #[serde(
        default,
        rename = "publicIPAddressVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub address_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_in_minutes: Option<u32>,
}

impl ProvisionedResource for PublicIpAddress {
    fn provisioning_state(&self) -> Option<&str> {
        self.properties.provisioning_state.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vnet_with_subnets() {
        let json = json!({
            "name": "vnet1",
            "location": "eastus",
            "properties": {
                "provisioningState": "Succeeded",
                "addressSpace": {"addressPrefixes": ["10.0.0.0/16"]},
                "subnets": [
                    {"name": "default", "properties": {"addressPrefix": "10.0.0.0/24", "provisioningState": "Succeeded"}}
                ]
            }
        });
        let vnet: VirtualNetwork = serde_json::from_value(json).unwrap();
        assert!(vnet.is_provisioned());
        assert_eq!(vnet.properties.address_space.address_prefixes, vec!["10.0.0.0/16"]);
        assert_eq!(vnet.properties.subnets[0].name, "default");
        assert!(vnet.properties.subnets[0].is_provisioned());
    }

    #[test]
    fn test_subnet_request_shape() {
        let value = serde_json::to_value(Subnet::new("app", "10.1.0.0/24")).unwrap();
        assert_eq!(
            value,
            json!({"name": "app", "properties": {"addressPrefix": "10.1.0.0/24"}})
        );
    }

    #[test]
    fn test_public_ip_field_names() {
        let json = json!({
            "name": "pip1",
            "properties": {
                "provisioningState": "Updating",
                "publicIPAllocationMethod": "Static",
                "publicIPAddressVersion": "IPv4",
                "ipAddress": "20.1.2.3"
            }
        });
        let ip: PublicIpAddress = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(ip.properties.allocation_method.as_deref(), Some("Static"));
        assert_eq!(ip.properties.address_version.as_deref(), Some("IPv4"));
        assert_eq!(ip.provisioning_state(), Some("Updating"));
        assert!(!ip.is_provisioned());

        let back = serde_json::to_value(&ip).unwrap();
        assert_eq!(back["properties"]["publicIPAllocationMethod"], "Static");
    }
}
