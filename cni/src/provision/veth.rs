// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::error::{ConfigError, PluginError};
use crate::provision::OVERLAY_MTU;
use crate::result::AttachmentResult;
use interface_manager::address::InterfaceAddress;
use interface_manager::error::LinkError;
use interface_manager::interface::{InterfacePropertiesSpec, InterfaceSpec, VethPropertiesSpec};
use interface_manager::netns::Netns;
use interface_manager::{Manager, manager_of};
use ipnet::IpNet;
use net::interface::{IllegalInterfaceName, Interface, InterfaceName, Mac};
use std::path::Path;
use tracing::{debug, info};

/// A fresh name for the host end of a veth pair (`veth` and 8 random hex digits).
///
/// # Errors
///
/// Returns an error if the generated name is rejected.
pub fn host_veth_name() -> Result<InterfaceName, IllegalInterfaceName> {
    InterfaceName::try_from(format!("veth{:08x}", rand::random::<u32>()))
}

/// Connect the container namespace at `netns_path` to `bridge` with a veth pair.
///
/// The container end is named `if_name`, carries `address`, and is brought up inside the
/// container namespace.
/// The host end is brought up and attached to `bridge` after the thread is back in the host
/// namespace.
///
/// # Errors
///
/// Returns [`PluginError::Namespace`] if the container namespace can not be opened, entered, or
/// left, [`PluginError::InterfaceExists`] if the container already has a link named `if_name`, or
/// the error of the failed lookup or change.
#[tracing::instrument(level = "debug", skip(links, bridge), fields(bridge = %bridge.name))]
pub async fn attach_container(
    links: &Manager<Interface>,
    netns_path: &Path,
    if_name: &InterfaceName,
    address: IpNet,
    bridge: &Interface,
) -> Result<AttachmentResult, PluginError> {
    let host_ns = Netns::current()?;
    let container_ns = Netns::open(netns_path)?;

    let scope = container_ns.enter()?;
    let (host_name, mac) = configure_container_end(&host_ns, netns_path, if_name, address).await?;
    scope.exit()?;

    let host_end = links
        .get_by_name(&host_name)
        .await
        .map_err(PluginError::query(&host_name))?
        .ok_or_else(|| PluginError::Vanished(host_name.to_string()))?;
    links
        .set_up(host_end.index)
        .await
        .map_err(PluginError::mutation(format!("bring up {host_name}")))?;
    links
        .set_controller(host_end.index, bridge.index)
        .await
        .map_err(PluginError::mutation(format!(
            "attach {host_name} to {}",
            bridge.name
        )))?;
    info!(
        "{if_name} in {} is connected to {} through {host_name}",
        netns_path.display(),
        bridge.name
    );

    Ok(AttachmentResult {
        interface: if_name.clone(),
        sandbox: netns_path.to_path_buf(),
        mac: mac.unwrap_or_default(),
        address,
    })
}

/// The part of the attachment performed inside the container namespace.
///
/// Must be called with the thread inside the container namespace.
/// Returns the name of the host end, now in `host_ns`.
async fn configure_container_end(
    host_ns: &Netns,
    netns_path: &Path,
    if_name: &InterfaceName,
    address: IpNet,
) -> Result<(InterfaceName, Option<Mac>), PluginError> {
    let links: Manager<Interface> = Manager::connect().map_err(PluginError::Connect)?;
    let occupied = || PluginError::InterfaceExists {
        name: if_name.clone(),
        sandbox: netns_path.to_path_buf(),
    };

    if let Some(link) = links
        .get_by_name(if_name)
        .await
        .map_err(PluginError::query(if_name))?
    {
        debug!("{if_name} is already taken by {} {}", link.kind(), link.index);
        return Err(occupied());
    }
    let host_name = match create_pair(&links, if_name).await {
        Ok(host_name) => host_name,
        Err(err) => {
            let raced = matches!(
                err,
                PluginError::Mutation {
                    source: LinkError::AlreadyExists,
                    ..
                }
            ) && links
                .get_by_name(if_name)
                .await
                .map_err(PluginError::query(if_name))?
                .is_some();
            return Err(if raced { occupied() } else { err });
        }
    };
    move_to(&links, &host_name, host_ns).await?;

    let container_end = links
        .get_by_name(if_name)
        .await
        .map_err(PluginError::query(if_name))?
        .ok_or_else(|| PluginError::Vanished(if_name.to_string()))?;
    manager_of::<InterfaceAddress>(&links)
        .add(container_end.index, address)
        .await
        .map_err(PluginError::mutation(format!("assign {address} to {if_name}")))?;
    links
        .set_up(container_end.index)
        .await
        .map_err(PluginError::mutation(format!("bring up {if_name}")))?;
    Ok((host_name, container_end.mac))
}

/// Create the pair in the current namespace, with a fresh name for the host end.
async fn create_pair(
    links: &Manager<Interface>,
    if_name: &InterfaceName,
) -> Result<InterfaceName, PluginError> {
    let host_name = host_veth_name().map_err(ConfigError::from)?;
    let spec = InterfaceSpec {
        name: if_name.clone(),
        mtu: Some(OVERLAY_MTU),
        properties: InterfacePropertiesSpec::Veth(VethPropertiesSpec {
            peer: host_name.clone(),
        }),
    };
    links
        .create(&spec)
        .await
        .map_err(PluginError::mutation(format!("create veth {if_name}")))?;
    Ok(host_name)
}

/// Push the link `name` out of the current namespace into `netns`.
async fn move_to(
    links: &Manager<Interface>,
    name: &InterfaceName,
    netns: &Netns,
) -> Result<(), PluginError> {
    let link = links
        .get_by_name(name)
        .await
        .map_err(PluginError::query(name))?
        .ok_or_else(|| PluginError::Vanished(name.to_string()))?;
    links
        .move_to_netns(link.index, netns)
        .await
        .map_err(PluginError::mutation(format!(
            "move {name} to {}",
            netns.path().display()
        )))
}
