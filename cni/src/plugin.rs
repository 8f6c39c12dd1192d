// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The ADD, DEL, and CHECK operations.

use crate::args::PluginArgs;
use crate::config::NetworkDescriptor;
use crate::error::PluginError;
use crate::provision::{
    attach_container, bridge_spec, ensure_bridge, ensure_tunnel, resolve_uplink, tunnel_spec,
};
use crate::result::AttachmentResult;
use firewall::RuleTable;
use firewall::iptables::Iptables;
use interface_manager::address::InterfaceAddress;
use interface_manager::error::LinkError;
use interface_manager::netns::Netns;
use interface_manager::{Manager, manager_of};
use net::interface::{Interface, InterfaceName, InterfaceProperties, LinkKind};
use std::path::Path;
use tracing::{debug, info, warn};

/// Behavior switches of the plugin.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PluginOptions {
    /// Log every request and its outcome at info level.
    pub debug: bool,
}

impl From<&NetworkDescriptor> for PluginOptions {
    fn from(descriptor: &NetworkDescriptor) -> Self {
        PluginOptions {
            debug: descriptor.debug,
        }
    }
}

/// The vxlan overlay plugin, bound to the host network namespace.
#[derive(Debug)]
pub struct Plugin<R: RuleTable> {
    links: Manager<Interface>,
    rules: R,
    options: PluginOptions,
}

impl Plugin<Iptables> {
    /// Open a netlink connection in the calling thread's namespace and use the system's
    /// iptables.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Connect`] if the netlink socket can not be opened.
    pub fn connect(options: PluginOptions) -> Result<Self, PluginError> {
        let links = Manager::connect().map_err(PluginError::Connect)?;
        Ok(Plugin::new(links, Iptables, options))
    }
}

impl<R: RuleTable> Plugin<R> {
    /// Assemble a plugin from its parts.
    #[must_use]
    pub fn new(links: Manager<Interface>, rules: R, options: PluginOptions) -> Self {
        Plugin {
            links,
            rules,
            options,
        }
    }

    /// The rule table the plugin installs forwarding rules into.
    #[must_use]
    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Attach the container namespace at `netns` to the overlay.
    ///
    /// The uplink is resolved first.
    /// The bridge, then the vxlan device, then the veth pair are provisioned; the first failure
    /// aborts the operation and nothing is rolled back.
    ///
    /// # Errors
    ///
    /// Returns the error of the first step which failed.
    pub async fn add(
        &self,
        descriptor: &NetworkDescriptor,
        netns: &Path,
        if_name: &InterfaceName,
        args: &PluginArgs,
    ) -> Result<AttachmentResult, PluginError> {
        let address = args.ip()?;
        let bridge_name = descriptor.bridge_name()?;
        let tunnel_name = descriptor.tunnel_name()?;
        if self.options.debug {
            info!(
                "ADD {if_name} in {} to overlay {} ({address})",
                netns.display(),
                descriptor.name
            );
        }
        let uplink = resolve_uplink(&self.links, descriptor).await?;
        let bridge =
            ensure_bridge(&self.links, &bridge_name, &self.rules, descriptor.cidr).await?;
        ensure_tunnel(&self.links, &tunnel_name, descriptor, &uplink, &bridge).await?;
        let attachment = attach_container(&self.links, netns, if_name, address, &bridge).await?;
        if self.options.debug {
            info!(
                "ADD done: {} ({}) in {}",
                attachment.interface,
                attachment.mac,
                attachment.sandbox.display()
            );
        }
        Ok(attachment)
    }

    /// Detach the container: delete `if_name` in `netns` (which takes the host end with it).
    ///
    /// The bridge, the vxlan device, and the forwarding rules are shared with the other
    /// containers of the overlay and stay in place.
    /// A namespace or interface which no longer exists counts as detached.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace exists but can not be entered, or if the interface
    /// exists but can not be deleted.
    pub async fn del(
        &self,
        descriptor: &NetworkDescriptor,
        netns: Option<&Path>,
        if_name: &InterfaceName,
    ) -> Result<(), PluginError> {
        if self.options.debug {
            info!("DEL {if_name} from overlay {}", descriptor.name);
        }
        let Some(netns) = netns else {
            debug!("no network namespace: nothing to delete");
            return Ok(());
        };
        let container_ns = match Netns::open(netns) {
            Ok(container_ns) => container_ns,
            Err(err) if err.is_missing() => {
                debug!("{} is gone: nothing to delete", netns.display());
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let scope = container_ns.enter()?;
        let links: Manager<Interface> = Manager::connect().map_err(PluginError::Connect)?;
        match links
            .get_by_name(if_name)
            .await
            .map_err(PluginError::query(if_name))?
        {
            Some(link) => match links.remove(link.index).await {
                Ok(()) => info!("deleted {if_name} from {}", netns.display()),
                Err(LinkError::NotFound) => {
                    debug!("{if_name} was deleted concurrently");
                }
                Err(err) => {
                    return Err(PluginError::mutation(format!("delete {if_name}"))(err));
                }
            },
            None => debug!("{if_name} not found in {}", netns.display()),
        }
        scope.exit()?;
        Ok(())
    }

    /// Verify that the attachment made by [`Plugin::add`] is still in place.
    ///
    /// Nothing is changed.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::CheckFailed`] describing the first broken property, or the error of
    /// a failed lookup.
    pub async fn check(
        &self,
        descriptor: &NetworkDescriptor,
        netns: &Path,
        if_name: &InterfaceName,
        args: &PluginArgs,
    ) -> Result<(), PluginError> {
        let address = args.ip()?;
        let bridge_name = descriptor.bridge_name()?;
        let tunnel_name = descriptor.tunnel_name()?;

        let bridge = self.lookup(&bridge_name).await?;
        if bridge_spec(&bridge_name).properties != bridge.properties {
            return Err(failed(format!("{bridge_name} is a {}", bridge.kind())));
        }
        if !bridge.is_up() {
            return Err(failed(format!("{bridge_name} is down")));
        }

        let uplink = self.lookup(&descriptor.dev).await?;
        let tunnel = self.lookup(&tunnel_name).await?;
        if tunnel.kind() != LinkKind::Vxlan {
            return Err(failed(format!("{tunnel_name} is a {}", tunnel.kind())));
        }
        if tunnel_spec(&tunnel_name, descriptor, &uplink).properties != tunnel.properties {
            return Err(failed(format!(
                "{tunnel_name} does not carry vni {} to {} over {}",
                descriptor.vni, descriptor.group, descriptor.dev
            )));
        }
        if tunnel.controller != Some(bridge.index) {
            return Err(failed(format!("{tunnel_name} is not attached to {bridge_name}")));
        }

        let container_ns = Netns::open(netns)?;
        let scope = container_ns.enter()?;
        let container_links: Manager<Interface> =
            Manager::connect().map_err(PluginError::Connect)?;
        let container_end = container_links
            .get_by_name(if_name)
            .await
            .map_err(PluginError::query(if_name))?
            .ok_or_else(|| failed(format!("{if_name} not found in {}", netns.display())))?;
        let InterfaceProperties::Veth(veth) = &container_end.properties else {
            return Err(failed(format!("{if_name} is a {}", container_end.kind())));
        };
        if !container_end.is_up() {
            return Err(failed(format!("{if_name} is down")));
        }
        let addresses = manager_of::<InterfaceAddress>(&container_links)
            .list(container_end.index)
            .await
            .map_err(PluginError::query(format!("addresses of {if_name}")))?;
        if !addresses.contains(&address) {
            return Err(failed(format!("{if_name} does not hold {address}")));
        }
        let peer = match (veth.peer, veth.peer_netnsid) {
            (Some(peer), Some(_)) => peer,
            _ => {
                return Err(failed(format!(
                    "{if_name} has no peer outside {}",
                    netns.display()
                )));
            }
        };
        scope.exit()?;

        // the peer index is only meaningful in the peer's namespace: make sure it points back
        let host_end = self
            .links
            .get_by_index(peer)
            .await
            .map_err(PluginError::query(format!("peer of {if_name}")))?
            .ok_or_else(|| failed(format!("peer of {if_name} not found")))?;
        match &host_end.properties {
            InterfaceProperties::Veth(host_veth)
                if host_veth.peer == Some(container_end.index)
                    && host_veth.peer_netnsid.is_some() => {}
            _ => {
                return Err(failed(format!(
                    "{} is not the peer of {if_name}",
                    host_end.name
                )));
            }
        }
        if host_end.controller != Some(bridge.index) {
            return Err(failed(format!(
                "{} is not attached to {bridge_name}",
                host_end.name
            )));
        }
        if self.options.debug {
            info!("CHECK passed for {if_name} in {}", netns.display());
        }
        Ok(())
    }

    async fn lookup(&self, name: &InterfaceName) -> Result<Interface, PluginError> {
        self.links
            .get_by_name(name)
            .await
            .map_err(PluginError::query(name))?
            .ok_or_else(|| {
                warn!("{name} not found");
                failed(format!("{name} not found"))
            })
    }
}

fn failed(reason: String) -> PluginError {
    PluginError::CheckFailed(reason)
}
