// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::config::NetworkDescriptor;
use crate::error::{ConfigError, PluginError};
use crate::provision::expect_kind;
use interface_manager::Manager;
use interface_manager::error::LinkError;
use interface_manager::interface::{InterfacePropertiesSpec, InterfaceSpec, VtepPropertiesSpec};
use net::interface::{Interface, InterfaceName, LinkKind};
use tracing::{debug, info};

/// Look up the uplink device named by the descriptor.
///
/// # Errors
///
/// Returns [`ConfigError::UplinkMissing`] if it does not exist, or the error of the failed lookup.
pub async fn resolve_uplink(
    links: &Manager<Interface>,
    descriptor: &NetworkDescriptor,
) -> Result<Interface, PluginError> {
    let uplink = links
        .get_by_name(&descriptor.dev)
        .await
        .map_err(PluginError::query(&descriptor.dev))?
        .ok_or_else(|| ConfigError::UplinkMissing(descriptor.dev.clone()))?;
    debug!("uplink {} has index {}", uplink.name, uplink.index);
    Ok(uplink)
}

/// The plan for the overlay vxlan device `name`, bound to `uplink`.
#[must_use]
pub fn tunnel_spec(
    name: &InterfaceName,
    descriptor: &NetworkDescriptor,
    uplink: &Interface,
) -> InterfaceSpec {
    InterfaceSpec {
        name: name.clone(),
        mtu: None,
        properties: InterfacePropertiesSpec::Vtep(VtepPropertiesSpec {
            vni: descriptor.vni,
            link: uplink.index,
            group: descriptor.group,
            port: descriptor.dst_port,
        }),
    }
}

/// Make sure the overlay vxlan device `name` exists, creating it if need be.
///
/// A newly created device is bound to `uplink`, attached to `bridge`, and brought up.
/// An existing vxlan device is returned untouched.
///
/// # Errors
///
/// Returns [`PluginError::NamingConflict`] if a link which is not a vxlan device holds `name`, or
/// the error of the failed lookup or change.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(name = %name, uplink = %uplink.name, bridge = %bridge.name)
)]
pub async fn ensure_tunnel(
    links: &Manager<Interface>,
    name: &InterfaceName,
    descriptor: &NetworkDescriptor,
    uplink: &Interface,
    bridge: &Interface,
) -> Result<Interface, PluginError> {
    if let Some(link) = links
        .get_by_name(name)
        .await
        .map_err(PluginError::query(name))?
    {
        debug!("found existing {} {name}", link.kind());
        return expect_kind(link, LinkKind::Vxlan);
    }

    match links.create(&tunnel_spec(name, descriptor, uplink)).await {
        Ok(()) => {}
        Err(LinkError::AlreadyExists) => {
            debug!("{name} was created concurrently");
            let link = links
                .get_by_name(name)
                .await
                .map_err(PluginError::query(name))?
                .ok_or_else(|| PluginError::Vanished(name.to_string()))?;
            return expect_kind(link, LinkKind::Vxlan);
        }
        Err(err) => return Err(PluginError::mutation(format!("create vxlan {name}"))(err)),
    }

    let tunnel = links
        .get_by_name(name)
        .await
        .map_err(PluginError::query(name))?
        .ok_or_else(|| PluginError::Vanished(name.to_string()))?;
    links
        .set_controller(tunnel.index, bridge.index)
        .await
        .map_err(PluginError::mutation(format!(
            "attach {name} to {}",
            bridge.name
        )))?;
    links
        .set_up(tunnel.index)
        .await
        .map_err(PluginError::mutation(format!("bring up {name}")))?;
    info!(
        "vxlan {name} (vni {}, group {}) is up on {} and attached to {}",
        descriptor.vni, descriptor.group, descriptor.dev, bridge.name
    );
    Ok(tunnel)
}

#[cfg(test)]
mod test {
    use super::tunnel_spec;
    use crate::config::NetworkDescriptor;
    use crate::provision::bridge_spec;
    use net::interface::{
        AdminState, Interface, InterfaceIndex, InterfaceProperties, VtepProperties,
    };
    use net::vxlan::Vni;

    const OV1: &str = r#"{
        "name": "ov1",
        "dev": "eth0",
        "vni": 42,
        "group": "239.1.1.1",
        "dstPort": 4789,
        "cidr": "10.1.0.0/24"
    }"#;

    fn uplink() -> Interface {
        Interface {
            index: InterfaceIndex::try_new(2).unwrap(),
            name: "eth0".try_into().unwrap(),
            mac: None,
            mtu: Some(1500),
            admin_state: AdminState::Up,
            controller: None,
            properties: InterfaceProperties::Other,
        }
    }

    #[test]
    fn plans_match_what_the_kernel_reports() {
        let descriptor = NetworkDescriptor::parse(OV1.as_bytes()).unwrap();
        let name = descriptor.tunnel_name().unwrap();
        let spec = tunnel_spec(&name, &descriptor, &uplink());
        assert_eq!(spec.mtu, None);

        let mut observed = VtepProperties {
            vni: Some(descriptor.vni),
            group: Some(descriptor.group),
            port: Some(4789),
            link: Some(uplink().index),
        };
        assert!(spec.properties == InterfaceProperties::Vtep(observed.clone()));
        assert!(spec.properties != InterfaceProperties::Bridge);
        observed.vni = Some(Vni::new_checked(43).unwrap());
        assert!(spec.properties != InterfaceProperties::Vtep(observed));

        let bridge = bridge_spec(&descriptor.bridge_name().unwrap());
        assert_eq!(bridge.mtu, Some(1500));
        assert!(bridge.properties == InterfaceProperties::Bridge);
        assert!(bridge.properties != InterfaceProperties::Other);
    }
}
