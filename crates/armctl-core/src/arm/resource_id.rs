//! ARM resource identifiers
//!
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{child-type}/{child-name}...]`

use crate::error::{CoreError, Result};
use std::fmt;
use std::str::FromStr;

/// A parsed ARM resource id
///
/// Resource groups are only an addressing parameter here; an id without a
/// provider refers to the group itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    subscription: String,
    resource_group: Option<String>,
    provider: Option<String>,
    /// `(type, name)` pairs, outermost first
    segments: Vec<(String, String)>,
}

impl ResourceId {
    /// A top-level resource inside a resource group
    pub fn new(
        subscription: impl Into<String>,
        resource_group: impl Into<String>,
        provider: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription: subscription.into(),
            resource_group: Some(resource_group.into()),
            provider: Some(provider.into()),
            segments: vec![(resource_type.into(), name.into())],
        }
    }

    /// The resource group itself
    pub fn resource_group(subscription: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self {
            subscription: subscription.into(),
            resource_group: Some(resource_group.into()),
            provider: None,
            segments: Vec::new(),
        }
    }

    /// A child resource, e.g. a subnet of a virtual network
    #[must_use]
    pub fn child(mut self, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        self.segments.push((resource_type.into(), name.into()));
        self
    }

    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    pub fn resource_group_name(&self) -> Option<&str> {
        self.resource_group.as_deref()
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Name of the innermost resource (or the group)
    pub fn name(&self) -> &str {
        self.segments
            .last()
            .map(|(_, name)| name.as_str())
            .or(self.resource_group.as_deref())
            .unwrap_or(&self.subscription)
    }

    /// Full type, e.g. `Microsoft.Network/virtualNetworks/subnets`
    pub fn resource_type(&self) -> Option<String> {
        let provider = self.provider.as_deref()?;
        let types: Vec<&str> = self.segments.iter().map(|(t, _)| t.as_str()).collect();
        Some(format!("{provider}/{}", types.join("/")))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription)?;
        if let Some(rg) = &self.resource_group {
            write!(f, "/resourceGroups/{rg}")?;
        }
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{provider}")?;
            for (resource_type, name) in &self.segments {
                write!(f, "/{resource_type}/{name}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for ResourceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |why: &str| CoreError::Validation(format!("invalid resource id '{s}': {why}"));
        let parts: Vec<&str> = s.split('/').filter(|p| !p.is_empty()).collect();

        let mut iter = parts.into_iter();
        match (iter.next(), iter.next()) {
            (Some(key), Some(sub)) if key.eq_ignore_ascii_case("subscriptions") => {
                let mut id = ResourceId {
                    subscription: sub.to_string(),
                    resource_group: None,
                    provider: None,
                    segments: Vec::new(),
                };

                let mut rest: Vec<&str> = iter.collect();
                if rest.len() >= 2 && rest[0].eq_ignore_ascii_case("resourceGroups") {
                    id.resource_group = Some(rest[1].to_string());
                    rest.drain(..2);
                }

                if rest.is_empty() {
                    return Ok(id);
                }
                if rest.len() < 2 || !rest[0].eq_ignore_ascii_case("providers") {
                    return Err(invalid("expected 'providers/{namespace}'"));
                }
                id.provider = Some(rest[1].to_string());

                let pairs = &rest[2..];
                if pairs.is_empty() || pairs.len() % 2 != 0 {
                    return Err(invalid("expected '{type}/{name}' pairs after the provider"));
                }
                id.segments = pairs
                    .chunks(2)
                    .map(|c| (c[0].to_string(), c[1].to_string()))
                    .collect();
                Ok(id)
            }
            _ => Err(invalid("must start with /subscriptions/{id}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VNET: &str = "/subscriptions/sub-1/resourceGroups/rg-net/providers/Microsoft.Network/virtualNetworks/vnet1";

    #[test]
    fn test_display_top_level() {
        let id = ResourceId::new(
            "sub-1",
            "rg-net",
            "Microsoft.Network",
            "virtualNetworks",
            "vnet1",
        );
        assert_eq!(id.to_string(), VNET);
        assert_eq!(id.name(), "vnet1");
        assert_eq!(
            id.resource_type().as_deref(),
            Some("Microsoft.Network/virtualNetworks")
        );
    }

    #[test]
    fn test_child_resource() {
        let id = ResourceId::new("s", "rg", "Microsoft.Network", "virtualNetworks", "vnet1")
            .child("subnets", "default");
        assert_eq!(
            id.to_string(),
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/default"
        );
        assert_eq!(id.name(), "default");
        assert_eq!(
            id.resource_type().as_deref(),
            Some("Microsoft.Network/virtualNetworks/subnets")
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        let id: ResourceId = VNET.parse().unwrap();
        assert_eq!(id.subscription(), "sub-1");
        assert_eq!(id.resource_group_name(), Some("rg-net"));
        assert_eq!(id.provider(), Some("Microsoft.Network"));
        assert_eq!(id.to_string(), VNET);
    }

    #[test]
    fn test_parse_case_insensitive_keys() {
        let id: ResourceId =
            "/SUBSCRIPTIONS/s/resourcegroups/rg/PROVIDERS/Microsoft.Storage/storageAccounts/acct"
                .parse()
                .unwrap();
        assert_eq!(id.resource_group_name(), Some("rg"));
        assert_eq!(id.name(), "acct");
    }

    #[test]
    fn test_parse_resource_group() {
        let id: ResourceId = "/subscriptions/s/resourceGroups/rg".parse().unwrap();
        assert_eq!(id, ResourceId::resource_group("s", "rg"));
        assert_eq!(id.name(), "rg");
        assert!(id.resource_type().is_none());
    }

    #[test]
    fn test_parse_subscription_level_provider() {
        let id: ResourceId = "/subscriptions/s/providers/Microsoft.Features/features/f1"
            .parse()
            .unwrap();
        assert!(id.resource_group_name().is_none());
        assert_eq!(id.name(), "f1");
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<ResourceId>().is_err());
        assert!("/resourceGroups/rg".parse::<ResourceId>().is_err());
        assert!(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks"
                .parse::<ResourceId>()
                .is_err()
        );
        assert!(
            "/subscriptions/s/resourceGroups/rg/other/thing"
                .parse::<ResourceId>()
                .is_err()
        );
    }
}
