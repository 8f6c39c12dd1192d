// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The network descriptor read from stdin.

use crate::error::{ConfigError, PluginError};
use crate::result::SUPPORTED_VERSIONS;
use ipnet::IpNet;
use net::interface::InterfaceName;
use net::vxlan::Vni;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// The CNI version assumed when the descriptor does not name one.
pub const DEFAULT_CNI_VERSION: &str = "1.0.0";

/// Prefix of the overlay bridge name.
pub const BRIDGE_PREFIX: &str = "br";
/// Prefix of the overlay vxlan device name.
pub const TUNNEL_PREFIX: &str = "vxlan";

fn default_cni_version() -> String {
    DEFAULT_CNI_VERSION.to_string()
}

/// The configuration of one overlay network.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDescriptor {
    /// The CNI version the runtime speaks.
    #[serde(default = "default_cni_version")]
    pub cni_version: String,
    /// The plugin type (the name of this binary).
    #[serde(rename = "type", default)]
    pub plugin_type: Option<String>,
    /// The overlay name; link names are derived from it.
    pub name: String,
    /// The uplink device carrying the encapsulated traffic.
    pub dev: InterfaceName,
    /// The vxlan network identifier.
    pub vni: Vni,
    /// The multicast group (or unicast remote) of the tunnel.
    #[serde(alias = "vxlanGroup")]
    pub group: IpAddr,
    /// The UDP destination port of the tunnel; the kernel default applies when absent.
    #[serde(default)]
    pub dst_port: Option<u16>,
    /// The overlay subnet.
    pub cidr: IpNet,
    /// Log every request at info level.
    #[serde(default)]
    pub debug: bool,
    /// Tracing configuration (`tag=level,...`).
    #[serde(default)]
    pub log_level: Option<String>,
}

impl NetworkDescriptor {
    /// Decode and validate a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Decode`] if `raw` is not a valid descriptor, and
    /// [`ConfigError::IllegalName`] if the overlay name does not yield legal link names.
    pub fn parse(raw: &[u8]) -> Result<Self, ConfigError> {
        let descriptor: NetworkDescriptor =
            serde_json::from_slice(raw).map_err(ConfigError::Decode)?;
        descriptor.bridge_name()?;
        descriptor.tunnel_name()?;
        Ok(descriptor)
    }

    /// The name of the overlay bridge (`br-<name>`).
    ///
    /// # Errors
    ///
    /// Returns an error if the derived name is not a legal interface name.
    pub fn bridge_name(&self) -> Result<InterfaceName, ConfigError> {
        Ok(InterfaceName::derived(BRIDGE_PREFIX, &self.name)?)
    }

    /// The name of the overlay vxlan device (`vxlan-<name>`).
    ///
    /// # Errors
    ///
    /// Returns an error if the derived name is not a legal interface name.
    pub fn tunnel_name(&self) -> Result<InterfaceName, ConfigError> {
        Ok(InterfaceName::derived(TUNNEL_PREFIX, &self.name)?)
    }

    /// Reject versions this plugin does not speak.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::IncompatibleVersion`] if `cniVersion` is not supported.
    pub fn check_version(&self) -> Result<(), PluginError> {
        if SUPPORTED_VERSIONS.contains(&self.cni_version.as_str()) {
            Ok(())
        } else {
            Err(PluginError::IncompatibleVersion(self.cni_version.clone()))
        }
    }
}

#[cfg(test)]
mod test {
    use super::NetworkDescriptor;
    use crate::error::{ConfigError, PluginError};
    use net::interface::IllegalInterfaceName;
    use std::net::{IpAddr, Ipv4Addr};

    const OV1: &str = r#"{
        "cniVersion": "0.4.0",
        "name": "ov1",
        "type": "vxlan",
        "dev": "eth0",
        "vni": 42,
        "group": "239.1.1.1",
        "dstPort": 4789,
        "cidr": "10.1.0.0/24"
    }"#;

    #[test]
    fn descriptor_parses() {
        let descriptor = NetworkDescriptor::parse(OV1.as_bytes()).unwrap();
        assert_eq!(descriptor.cni_version, "0.4.0");
        assert_eq!(descriptor.plugin_type.as_deref(), Some("vxlan"));
        assert_eq!(descriptor.dev.as_ref(), "eth0");
        assert_eq!(descriptor.vni.as_u32(), 42);
        assert_eq!(descriptor.group, IpAddr::V4(Ipv4Addr::new(239, 1, 1, 1)));
        assert_eq!(descriptor.dst_port, Some(4789));
        assert_eq!(descriptor.cidr.to_string(), "10.1.0.0/24");
        assert!(!descriptor.debug);
        assert_eq!(descriptor.bridge_name().unwrap().as_ref(), "br-ov1");
        assert_eq!(descriptor.tunnel_name().unwrap().as_ref(), "vxlan-ov1");
        descriptor.check_version().unwrap();
    }

    #[test]
    fn optional_fields_default() {
        let raw = r#"{"name":"ov2","dev":"eth1","vni":7,"vxlanGroup":"10.0.0.2","cidr":"fd00::/64"}"#;
        let descriptor = NetworkDescriptor::parse(raw.as_bytes()).unwrap();
        assert_eq!(descriptor.cni_version, "1.0.0");
        assert_eq!(descriptor.dst_port, None);
        assert_eq!(descriptor.log_level, None);
        assert_eq!(descriptor.group, "10.0.0.2".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn malformed_values_are_decode_errors() {
        for raw in [
            OV1.replace("239.1.1.1", "239.1.1"),
            OV1.replace("\"vni\": 42", "\"vni\": 16777216"),
            OV1.replace("10.1.0.0/24", "10.1.0.0"),
            OV1.replace("\"dev\": \"eth0\",", ""),
        ] {
            assert!(matches!(
                NetworkDescriptor::parse(raw.as_bytes()),
                Err(ConfigError::Decode(_))
            ));
        }
    }

    #[test]
    fn vni_zero_is_accepted() {
        let raw = OV1.replace("\"vni\": 42", "\"vni\": 0");
        let descriptor = NetworkDescriptor::parse(raw.as_bytes()).unwrap();
        assert_eq!(descriptor.vni.as_u32(), 0);
    }

    #[test]
    fn long_names_are_rejected() {
        let raw = OV1.replace("\"ov1\"", "\"overlay-num-1\"");
        assert!(matches!(
            NetworkDescriptor::parse(raw.as_bytes()),
            Err(ConfigError::IllegalName(IllegalInterfaceName::TooLong(_)))
        ));
    }

    #[test]
    fn unknown_versions_are_incompatible() {
        let raw = OV1.replace("0.4.0", "0.2.0");
        let descriptor = NetworkDescriptor::parse(raw.as_bytes()).unwrap();
        assert!(matches!(
            descriptor.check_version(),
            Err(PluginError::IncompatibleVersion(v)) if v == "0.2.0"
        ));
    }
}
