//! Any ARM resource, with provider-specific properties left as JSON

use super::ProvisionedResource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

impl ProvisionedResource for GenericResource {
    fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .get("provisioningState")
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generic_keeps_properties() {
        let resource: GenericResource = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg",
            "name": "rg",
            "type": "Microsoft.Resources/resourceGroups",
            "location": "westus2",
            "properties": {"provisioningState": "Succeeded"}
        }))
        .unwrap();
        assert_eq!(
            resource.resource_type.as_deref(),
            Some("Microsoft.Resources/resourceGroups")
        );
        assert!(resource.is_provisioned());
    }

    #[test]
    fn test_generic_without_properties() {
        let resource: GenericResource = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert!(resource.properties.is_null());
        assert_eq!(resource.provisioning_state(), None);
        assert_eq!(serde_json::to_value(&resource).unwrap(), json!({"name": "x"}));
    }
}
