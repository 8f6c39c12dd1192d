// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Plugin failures and their CNI error codes.

use firewall::FirewallError;
use interface_manager::error::LinkError;
use interface_manager::netns::NetnsError;
use net::interface::{IllegalInterfaceName, InterfaceName, LinkKind};
use std::path::PathBuf;
use tracectl::TraceConfigError;

/// CNI error code: the requested `cniVersion` is not supported.
pub const CODE_INCOMPATIBLE_VERSION: u32 = 1;
/// CNI error code: an environment variable is missing or malformed.
pub const CODE_INVALID_ENVIRONMENT: u32 = 4;
/// CNI error code: the network configuration could not be decoded.
pub const CODE_DECODE: u32 = 6;
/// CNI error code: the network configuration is invalid.
pub const CODE_INVALID_CONFIG: u32 = 7;
/// Plugin specific: a link already holds a name the plugin needs.
pub const CODE_NAMING_CONFLICT: u32 = 100;
/// Plugin specific: the kernel could not be queried.
pub const CODE_QUERY: u32 = 101;
/// Plugin specific: a network namespace could not be opened, entered, or left.
pub const CODE_NAMESPACE: u32 = 102;
/// Plugin specific: the kernel rejected a change.
pub const CODE_MUTATION: u32 = 103;
/// Plugin specific: the forwarding rules could not be installed.
pub const CODE_POLICY: u32 = 104;
/// Plugin specific: CHECK found the attachment broken.
pub const CODE_CHECK_FAILED: u32 = 105;

/// Malformed or missing input.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The network descriptor could not be read from stdin.
    #[error("failed to read network configuration: {0}")]
    Stdin(#[source] std::io::Error),
    /// The network descriptor is not valid JSON or has missing / mistyped fields.
    #[error("failed to decode network configuration: {0}")]
    Decode(#[source] serde_json::Error),
    /// An argument the operation needs was not supplied in `CNI_ARGS`.
    #[error("missing required argument {0}")]
    MissingArg(&'static str),
    /// A `CNI_ARGS` segment is not of the form `key=value` with a non-empty key.
    #[error("malformed argument '{0}': expected key=value")]
    MalformedArg(String),
    /// An address argument is not in CIDR notation.
    #[error("invalid {key} '{value}': {reason}")]
    InvalidAddress {
        /// The argument key.
        key: &'static str,
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// A name (given or derived from the network name) is not a legal interface name.
    #[error(transparent)]
    IllegalName(#[from] IllegalInterfaceName),
    /// The uplink device named by `dev` does not exist.
    #[error("uplink interface {0} not found")]
    UplinkMissing(InterfaceName),
    /// The `logLevel` option does not parse.
    #[error(transparent)]
    Tracing(#[from] TraceConfigError),
}

impl ConfigError {
    /// The CNI error code of this failure.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::Stdin(_) | ConfigError::Decode(_) => CODE_DECODE,
            _ => CODE_INVALID_CONFIG,
        }
    }
}

/// Everything which may cause a CNI command to fail.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Malformed or missing input.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The requested `cniVersion` is not one this plugin speaks.
    #[error("unsupported CNI version {0}")]
    IncompatibleVersion(String),
    /// A required `CNI_*` environment variable is not set.
    #[error("required environment variable {0} is not set")]
    MissingEnv(&'static str),
    /// The command line or the `CNI_*` environment could not be parsed.
    #[error("invalid CNI environment: {0}")]
    Environment(#[source] clap::Error),
    /// `CNI_COMMAND` names no known command.
    #[error("unknown CNI command '{0}'")]
    UnknownCommand(String),
    /// A link with an overlay name exists but is of the wrong kind.
    #[error("{name} already exists but is not a {expected} (found {found})")]
    NamingConflict {
        /// The contested name.
        name: InterfaceName,
        /// The kind of link the overlay needs under that name.
        expected: LinkKind,
        /// The kind of link found.
        found: LinkKind,
    },
    /// The container already has an interface under the requested name.
    ///
    /// The existing interface and its peer are left alone.
    #[error("{name} already exists in {}", sandbox.display())]
    InterfaceExists {
        /// The requested interface name.
        name: InterfaceName,
        /// The container network namespace.
        sandbox: PathBuf,
    },
    /// A netlink connection could not be opened.
    #[error("failed to open netlink connection: {0}")]
    Connect(#[source] std::io::Error),
    /// A lookup failed for a reason other than the link not existing.
    #[error("error while querying {what}: {source}")]
    Query {
        /// What was being looked up.
        what: String,
        /// The failure.
        source: LinkError,
    },
    /// A network namespace could not be opened, entered, or left.
    #[error(transparent)]
    Namespace(#[from] NetnsError),
    /// The kernel rejected a change.
    #[error("failed to {what}: {source}")]
    Mutation {
        /// The change which failed.
        what: String,
        /// The failure.
        source: LinkError,
    },
    /// A link this plugin just created or reconfigured disappeared.
    #[error("{0} vanished during provisioning")]
    Vanished(String),
    /// The forwarding rules could not be installed.
    #[error("failed to install forwarding rules: {0}")]
    Policy(#[from] FirewallError),
    /// CHECK found the attachment broken.
    #[error("check failed: {0}")]
    CheckFailed(String),
    /// The async runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl PluginError {
    /// Wrap a failed lookup of `what`.
    pub fn query(what: impl std::fmt::Display) -> impl FnOnce(LinkError) -> PluginError {
        move |source| PluginError::Query {
            what: what.to_string(),
            source,
        }
    }

    /// Wrap a failed change described by `what`.
    pub fn mutation(what: impl std::fmt::Display) -> impl FnOnce(LinkError) -> PluginError {
        move |source| PluginError::Mutation {
            what: what.to_string(),
            source,
        }
    }

    /// The CNI error code of this failure.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            PluginError::Config(err) => err.code(),
            PluginError::IncompatibleVersion(_) => CODE_INCOMPATIBLE_VERSION,
            PluginError::MissingEnv(_)
            | PluginError::Environment(_)
            | PluginError::UnknownCommand(_) => CODE_INVALID_ENVIRONMENT,
            PluginError::NamingConflict { .. } | PluginError::InterfaceExists { .. } => {
                CODE_NAMING_CONFLICT
            }
            PluginError::Connect(_) | PluginError::Query { .. } => CODE_QUERY,
            PluginError::Namespace(_) => CODE_NAMESPACE,
            PluginError::Mutation { .. } | PluginError::Vanished(_) | PluginError::Runtime(_) => {
                CODE_MUTATION
            }
            PluginError::Policy(_) => CODE_POLICY,
            PluginError::CheckFailed(_) => CODE_CHECK_FAILED,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use interface_manager::error::LinkError;

    #[test]
    fn decode_failures_are_distinguished_from_bad_values() {
        let decode = serde_json::from_str::<u32>("{").unwrap_err();
        assert_eq!(PluginError::from(ConfigError::Decode(decode)).code(), 6);
        assert_eq!(
            PluginError::from(ConfigError::MissingArg("IP")).code(),
            CODE_INVALID_CONFIG
        );
    }

    #[test]
    fn naming_conflicts_name_the_link() {
        let err = PluginError::NamingConflict {
            name: "br-ov1".try_into().unwrap(),
            expected: LinkKind::Bridge,
            found: LinkKind::Other,
        };
        assert_eq!(err.code(), CODE_NAMING_CONFLICT);
        assert_eq!(
            err.to_string(),
            "br-ov1 already exists but is not a bridge (found other link)"
        );
    }

    #[test]
    fn occupied_container_names_are_conflicts() {
        let err = PluginError::InterfaceExists {
            name: "eth0".try_into().unwrap(),
            sandbox: PathBuf::from("/run/netns/c1"),
        };
        assert_eq!(err.code(), CODE_NAMING_CONFLICT);
        assert_eq!(err.to_string(), "eth0 already exists in /run/netns/c1");
    }

    #[test]
    fn link_failures_keep_their_context() {
        let err = PluginError::mutation("bring up br-ov1")(LinkError::NotFound);
        assert_eq!(err.code(), CODE_MUTATION);
        assert_eq!(err.to_string(), "failed to bring up br-ov1: no such link");
        let err = PluginError::query("vxlan-ov1")(LinkError::Malformed("link has no name"));
        assert_eq!(err.code(), CODE_QUERY);
    }
}
