// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::error::PluginError;
use crate::provision::{OVERLAY_MTU, expect_kind, install_forwarding_policy};
use firewall::RuleTable;
use interface_manager::Manager;
use interface_manager::error::LinkError;
use interface_manager::interface::{BridgePropertiesSpec, InterfacePropertiesSpec, InterfaceSpec};
use ipnet::IpNet;
use net::interface::{Interface, InterfaceName, LinkKind};
use tracing::{debug, info};

/// The plan for the overlay bridge `name`.
#[must_use]
pub fn bridge_spec(name: &InterfaceName) -> InterfaceSpec {
    InterfaceSpec {
        name: name.clone(),
        mtu: Some(OVERLAY_MTU),
        properties: InterfacePropertiesSpec::Bridge(BridgePropertiesSpec::default()),
    }
}

/// Make sure the overlay bridge `name` exists, creating it if need be.
///
/// A newly created bridge is brought up and the forwarding rules for `cidr` are installed.
/// An existing bridge is returned untouched.
///
/// # Errors
///
/// Returns [`PluginError::NamingConflict`] if a link which is not a bridge holds `name`, or the
/// error of the failed lookup, creation, or rule installation.
#[tracing::instrument(level = "debug", skip(links, rules))]
pub async fn ensure_bridge<R: RuleTable>(
    links: &Manager<Interface>,
    name: &InterfaceName,
    rules: &R,
    cidr: IpNet,
) -> Result<Interface, PluginError> {
    if let Some(link) = links
        .get_by_name(name)
        .await
        .map_err(PluginError::query(name))?
    {
        debug!("found existing {} {name}", link.kind());
        return expect_kind(link, LinkKind::Bridge);
    }

    match links.create(&bridge_spec(name)).await {
        Ok(()) => {}
        Err(LinkError::AlreadyExists) => {
            debug!("{name} was created concurrently");
            let link = links
                .get_by_name(name)
                .await
                .map_err(PluginError::query(name))?
                .ok_or_else(|| PluginError::Vanished(name.to_string()))?;
            return expect_kind(link, LinkKind::Bridge);
        }
        Err(err) => return Err(PluginError::mutation(format!("create bridge {name}"))(err)),
    }

    let bridge = links
        .get_by_name(name)
        .await
        .map_err(PluginError::query(name))?
        .ok_or_else(|| PluginError::Vanished(name.to_string()))?;
    links
        .set_up(bridge.index)
        .await
        .map_err(PluginError::mutation(format!("bring up {name}")))?;
    info!("bridge {name} is up (index {})", bridge.index);
    install_forwarding_policy(rules, cidr).await?;
    Ok(bridge)
}
