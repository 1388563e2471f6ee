//! Typed ARM resource representations
//!
//! Only the fields armctl reads or sets are modelled; everything else the
//! service returns is ignored on deserialize and omitted on serialize.

mod generic;
mod network;
mod storage;

pub use generic::GenericResource;
pub use network::{
    AddressSpace, PublicIpAddress, PublicIpAddressProperties, Subnet, SubnetProperties,
    VirtualNetwork, VirtualNetworkProperties,
};
pub use storage::{Endpoints, Sku, StorageAccount, StorageAccountProperties};

/// API versions used for each resource provider
pub mod api_versions {
    /// `Microsoft.Storage`
    pub const STORAGE: &str = "2023-05-01";
    /// `Microsoft.Network`
    pub const NETWORK: &str = "2024-05-01";
    /// `Microsoft.Resources` (resource groups, generic resources)
    pub const RESOURCES: &str = "2021-04-01";
}

/// Resources that report `properties.provisioningState`
pub trait ProvisionedResource {
    fn provisioning_state(&self) -> Option<&str>;

    /// True once the last create/update has finished successfully
    fn is_provisioned(&self) -> bool {
        self.provisioning_state()
            .is_some_and(|s| s.eq_ignore_ascii_case("succeeded"))
    }
}
