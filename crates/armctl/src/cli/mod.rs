//! CLI structure and command definitions
//!
//! Two layers share one set of global flags:
//! 1. Raw API access (`api` commands)
//! 2. Resource commands that submit an operation and wait for it
//!    (`resource`, `storage`, `vnet`, `public-ip`, `operation`)

use armctl_core::AuthKind;
use clap::{Parser, Subcommand};

use crate::commands::async_utils::AsyncOperationArgs;

/// Azure Resource Manager CLI with long-running operation tracking
#[derive(Parser, Debug)]
#[command(name = "armctl")]
#[command(version, about = "Azure Resource Manager CLI with long-running operation tracking")]
#[command(long_about = "
Azure Resource Manager CLI with long-running operation tracking

Mutating commands wait for the operation to finish by default:
    armctl storage create mystorage01 -g rg-demo -l westeurope
    armctl vnet delete vnet-demo -g rg-demo

Or hand back the operation handle and resume later:
    armctl storage create mystorage01 -g rg-demo --no-wait
    armctl operation wait <url>

EXAMPLES:
    # Set up a profile that uses the Azure CLI login
    armctl profile set dev --subscription-id 00000000-0000-0000-0000-000000000000

    # Get JSON output for scripting
    armctl storage list -g rg-demo -o json

    # Filter output with JMESPath
    armctl storage list -q '[?location==`westeurope`].name'

    # Direct API access
    armctl api get /subscriptions/{id}/resourcegroups --api-version 2021-04-01

For more help on a specific command, run:
    armctl <command> --help
")]
pub struct Cli {
    /// Named profile (subscription, endpoint, auth) to run against
    #[arg(long, short, global = true, env = "ARMCTL_PROFILE")]
    pub profile: Option<String>,

    /// Read profiles from this file instead of the platform default
    #[arg(long, global = true, env = "ARMCTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// JMESPath expression applied to the response before printing
    #[arg(long, short = 'q', global = true)]
    pub query: Option<String>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Table for listings and single resources, JSON otherwise
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Tables, with resource `properties` flattened into columns
    Table,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Raw API access - direct REST endpoint calls
    #[command(name = "api")]
    #[command(after_help = "EXAMPLES:
    # List resource groups
    armctl api get /subscriptions/{id}/resourcegroups --api-version 2021-04-01

    # Create a resource group
    armctl api put /subscriptions/{id}/resourcegroups/rg-demo \\
        --api-version 2021-04-01 --data '{\"location\":\"westeurope\"}'

    # Request body from file
    armctl api put /subscriptions/{id}/resourcegroups/rg-demo \\
        --api-version 2021-04-01 --data @rg.json
")]
    Api {
        /// HTTP method
        #[arg(value_enum, ignore_case = true)]
        method: HttpMethod,

        /// Path below the ARM endpoint, or a full URL
        path: String,

        /// Request body (JSON string or @file)
        #[arg(long)]
        data: Option<String>,

        /// api-version query parameter (omit when the URL already has one)
        #[arg(long)]
        api_version: Option<String>,
    },

    /// Profile management
    #[command(subcommand, visible_alias = "prof", visible_alias = "pr")]
    #[command(after_help = "EXAMPLES:
    # Profile using the Azure CLI login
    armctl profile set dev --subscription-id SUB --location westeurope

    # Profile using a token from the environment
    armctl profile set ci --subscription-id SUB --auth token \\
        --access-token '${AZURE_ACCESS_TOKEN}'

    # List all profiles
    armctl profile list

    # Set the default profile
    armctl profile default dev
")]
    Profile(ProfileCommands),

    /// Generic resource operations by ARM resource id
    #[command(subcommand, visible_alias = "res")]
    Resource(ResourceCommands),

    /// Storage account operations
    #[command(subcommand, visible_alias = "sa")]
    Storage(StorageCommands),

    /// Virtual network operations
    #[command(subcommand)]
    Vnet(VnetCommands),

    /// Public IP address operations
    #[command(subcommand, visible_alias = "pip")]
    PublicIp(PublicIpCommands),

    /// Long-running operation handles
    #[command(subcommand, visible_alias = "op")]
    Operation(OperationCommands),

    /// Version information
    #[command(visible_alias = "ver", visible_alias = "v")]
    Version,

    /// Generate shell completions
    #[command(visible_alias = "comp")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// HTTP methods for raw API access
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_method(self) -> armctl_core::Method {
        use armctl_core::Method;
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// ARM mutations expect a JSON body even when it is empty
    pub fn sends_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_method().as_str())
    }
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List profiles in the config file
    #[command(visible_alias = "ls", visible_alias = "l")]
    List,

    /// Print where the config file lives
    Path,

    /// Show one profile; tokens are never printed
    #[command(visible_alias = "sh", visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },

    /// Create a profile or overwrite an existing one
    #[command(visible_alias = "add", visible_alias = "create")]
    Set {
        /// Profile name
        name: String,

        /// Subscription every request is scoped to
        #[arg(long)]
        subscription_id: String,

        /// Entra tenant (passed to the Azure CLI)
        #[arg(long)]
        tenant_id: Option<String>,

        /// Default location for new resources
        #[arg(long, short = 'l')]
        location: Option<String>,

        /// Default resource group
        #[arg(long, short = 'g')]
        resource_group: Option<String>,

        /// ARM endpoint
        #[arg(long, default_value = armctl_core::config::DEFAULT_ARM_ENDPOINT)]
        base_url: String,

        /// How bearer tokens are obtained
        #[arg(long, value_enum, default_value = "azure-cli")]
        auth: AuthKind,

        /// Access token for token auth (literal or `${VAR}` reference)
        #[arg(long, required_if_eq("auth", "token"))]
        access_token: Option<String>,
    },

    /// Delete a profile from the config file
    #[command(visible_alias = "rm", visible_alias = "delete")]
    Remove {
        /// Profile name to remove
        name: String,

        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Set the default profile
    #[command(visible_alias = "def")]
    Default {
        /// Profile name to use by default
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ResourceCommands {
    /// Get a resource by id
    Get {
        /// Full ARM resource id
        id: String,

        /// api-version of the resource provider
        #[arg(long)]
        api_version: String,
    },

    /// Create or replace a resource from a JSON definition
    #[command(after_help = "EXAMPLES:
    armctl resource create \\
        /subscriptions/SUB/resourceGroups/rg-demo/providers/Microsoft.Network/virtualNetworks/vnet1 \\
        --api-version 2024-05-01 --data @vnet.json
")]
    Create {
        /// Full ARM resource id
        id: String,

        /// api-version of the resource provider
        #[arg(long)]
        api_version: String,

        /// Resource definition (JSON string or @file)
        #[arg(long)]
        data: String,

        #[command(flatten)]
        async_ops: AsyncOperationArgs,
    },

    /// Delete a resource
    Delete {
        /// Full ARM resource id
        id: String,

        /// api-version of the resource provider
        #[arg(long)]
        api_version: String,

        #[command(flatten)]
        async_ops: AsyncOperationArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum StorageCommands {
    /// List storage accounts (in one resource group, or the whole subscription)
    #[command(visible_alias = "ls")]
    List {
        /// Resource group (defaults to the subscription)
        #[arg(long, short = 'g')]
        resource_group: Option<String>,
    },

    /// Show a storage account
    #[command(visible_alias = "get")]
    Show {
        /// Account name
        name: String,

        /// Resource group (defaults to the profile's)
        #[arg(long, short = 'g')]
        resource_group: Option<String>,
    },

    /// Create a storage account
    #[command(after_help = "EXAMPLES:
    armctl storage create mystorage01 -g rg-demo -l westeurope
    armctl storage create mystorage01 --sku Standard_GRS --access-tier Cool --tag env=dev
")]
    Create {
        /// Account name (3-24 lowercase letters and digits)
        name: String,

        /// Resource group (defaults to the profile's)
        #[arg(long, short = 'g')]
        resource_group: Option<String>,

        /// Location (defaults to the profile's)
        #[arg(long, short = 'l')]
        location: Option<String>,

        /// SKU name
        #[arg(long)]
        sku: Option<String>,

        /// Account kind
        #[arg(long)]
        kind: Option<String>,

        /// Access tier (Hot or Cool)
        #[arg(long)]
        access_tier: Option<String>,

        /// Tags as key=value
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,

        #[command(flatten)]
        async_ops: AsyncOperationArgs,
    },

    /// Delete a storage account
    Delete {
        /// Account name
        name: String,

        /// Resource group (defaults to the profile's)
        #[arg(long, short = 'g')]
        resource_group: Option<String>,

        #[command(flatten)]
        async_ops: AsyncOperationArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum VnetCommands {
    /// Show a virtual network
    #[command(visible_alias = "get")]
    Show {
        /// Network name
        name: String,

        /// Resource group (defaults to the profile's)
        #[arg(long, short = 'g')]
        resource_group: Option<String>,
    },

    /// Create a virtual network
    #[command(after_help = "EXAMPLES:
    armctl vnet create vnet-demo -g rg-demo --address-prefix 10.0.0.0/16 \\
        --subnet default=10.0.0.0/24
")]
    Create {
        /// Network name
        name: String,

        /// Resource group (defaults to the profile's)
        #[arg(long, short = 'g')]
        resource_group: Option<String>,

        /// Location (defaults to the profile's)
        #[arg(long, short = 'l')]
        location: Option<String>,

        /// Address space prefix in CIDR form (repeatable)
        #[arg(long = "address-prefix", default_value = "10.0.0.0/16")]
        address_prefixes: Vec<String>,

        /// Subnet as name=prefix (repeatable)
        #[arg(long = "subnet", value_parser = parse_tag)]
        subnets: Vec<(String, String)>,

        /// Tags as key=value
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,

        #[command(flatten)]
        async_ops: AsyncOperationArgs,
    },

    /// Delete a virtual network
    Delete {
        /// Network name
        name: String,

        /// Resource group (defaults to the profile's)
        #[arg(long, short = 'g')]
        resource_group: Option<String>,

        #[command(flatten)]
        async_ops: AsyncOperationArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum PublicIpCommands {
    /// Show a public IP address
    #[command(visible_alias = "get")]
    Show {
        /// Address name
        name: String,

        /// Resource group (defaults to the profile's)
        #[arg(long, short = 'g')]
        resource_group: Option<String>,
    },

    /// Create a public IP address
    Create {
        /// Address name
        name: String,

        /// Resource group (defaults to the profile's)
        #[arg(long, short = 'g')]
        resource_group: Option<String>,

        /// Location (defaults to the profile's)
        #[arg(long, short = 'l')]
        location: Option<String>,

        /// SKU (Basic or Standard)
        #[arg(long)]
        sku: Option<String>,

        /// Allocation method (Static or Dynamic)
        #[arg(long)]
        allocation_method: Option<String>,

        /// IP version (IPv4 or IPv6)
        #[arg(long)]
        version: Option<String>,

        /// Idle timeout in minutes (4-30)
        #[arg(long)]
        idle_timeout: Option<u32>,

        /// Tags as key=value
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,

        #[command(flatten)]
        async_ops: AsyncOperationArgs,
    },

    /// Delete a public IP address
    Delete {
        /// Address name
        name: String,

        /// Resource group (defaults to the profile's)
        #[arg(long, short = 'g')]
        resource_group: Option<String>,

        #[command(flatten)]
        async_ops: AsyncOperationArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum OperationCommands {
    /// Wait for an operation handle printed by `--no-wait`
    #[command(after_help = "EXAMPLES:
    # Azure-AsyncOperation status URL
    armctl operation wait 'https://management.azure.com/subscriptions/SUB/providers/Microsoft.Storage/locations/westeurope/asyncoperations/ID?api-version=2023-05-01'

    # Location URL
    armctl operation wait --location 'https://management.azure.com/...'

    # Resumed create: print the resource once it is provisioned
    armctl operation wait --resource 'https://management.azure.com/subscriptions/SUB/resourceGroups/RG/providers/Microsoft.Storage/storageAccounts/NAME?api-version=2023-05-01' 'https://management.azure.com/...'
")]
    Wait {
        /// Operation URL
        url: String,

        /// Treat the URL as a Location header (poll until it stops returning 202)
        #[arg(long)]
        location: bool,

        /// Resource URL to read back when the operation succeeds (PUT/PATCH)
        #[arg(long)]
        resource: Option<String>,

        /// Maximum time to wait in seconds
        #[arg(long, default_value = "900")]
        wait_timeout: u64,

        /// Polling interval in seconds
        #[arg(long, default_value = "5")]
        wait_interval: u64,
    },
}

/// Parse a `key=value` pair
fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}
