// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Create, observe, and wire up linux network interfaces.

mod bridge;
mod message;
mod properties;
mod veth;
mod vtep;

#[allow(unused_imports)] // re-export
pub use bridge::*;
#[allow(unused_imports)] // re-export
pub use message::*;
#[allow(unused_imports)] // re-export
pub use properties::*;
#[allow(unused_imports)] // re-export
pub use veth::*;
#[allow(unused_imports)] // re-export
pub use vtep::*;

use crate::Manager;
use crate::error::LinkError;
use crate::netns::Netns;
use derive_builder::Builder;
use futures::{TryStream, TryStreamExt};
use net::interface::{Interface, InterfaceIndex, InterfaceName};
use rtnetlink::packet_route::link::{InfoData, LinkMessage};
use rtnetlink::{LinkBridge, LinkUnspec, LinkVeth, LinkVxlan};
use serde::{Deserialize, Serialize};
use std::os::fd::AsRawFd;
use tracing::{debug, info};

/// The specified / intended state for a network interface.
///
/// This type represents a "plan" in that it consists of goals to be realized, not observed external
/// state.
#[derive(Builder, Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct InterfaceSpec {
    /// The intended name of the network interface.
    pub name: InterfaceName,
    /// The MTU to request.  If set to `None`, the kernel picks the default for the link kind.
    #[builder(default)]
    pub mtu: Option<u32>,
    /// Interface-specific properties.
    pub properties: InterfacePropertiesSpec,
}

impl InterfaceSpec {
    fn to_message(&self) -> LinkMessage {
        let name = self.name.as_ref();
        match &self.properties {
            InterfacePropertiesSpec::Bridge(_) => self.with_mtu(LinkBridge::new(name)),
            InterfacePropertiesSpec::Vtep(properties) => self.with_mtu(
                LinkVxlan::new(name, properties.vni.as_u32())
                    .set_info_data(InfoData::Vxlan(properties.info_data())),
            ),
            InterfacePropertiesSpec::Veth(properties) => {
                self.with_mtu(LinkVeth::new(name, properties.peer.as_ref()))
            }
        }
    }

    fn with_mtu<T>(&self, builder: rtnetlink::LinkMessageBuilder<T>) -> LinkMessage {
        match self.mtu {
            Some(mtu) => builder.mtu(mtu).build(),
            None => builder.build(),
        }
    }
}

async fn first_link<S>(mut links: S) -> Result<Option<Interface>, LinkError>
where
    S: TryStream<Ok = LinkMessage, Error = rtnetlink::Error> + Unpin,
{
    match links.try_next().await {
        Ok(Some(message)) => Ok(Some(Interface::try_from_link_message(&message)?)),
        Ok(None) => Ok(None),
        Err(err) => match LinkError::from(err) {
            LinkError::NotFound => Ok(None),
            err => Err(err),
        },
    }
}

impl Manager<Interface> {
    /// Look up a link by name.
    ///
    /// Returns `Ok(None)` if no such link exists in this manager's namespace.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] for any failure other than the link not existing.
    pub async fn get_by_name(&self, name: &InterfaceName) -> Result<Option<Interface>, LinkError> {
        first_link(
            self.handle
                .link()
                .get()
                .match_name(name.to_string())
                .execute(),
        )
        .await
    }

    /// Look up a link by index.
    ///
    /// Returns `Ok(None)` if no such link exists in this manager's namespace.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] for any failure other than the link not existing.
    pub async fn get_by_index(
        &self,
        index: InterfaceIndex,
    ) -> Result<Option<Interface>, LinkError> {
        first_link(
            self.handle
                .link()
                .get()
                .match_index(index.to_u32())
                .execute(),
        )
        .await
    }

    /// Create the link described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::AlreadyExists`] if a link by that name (or, for veth pairs, by the peer
    /// name) already exists, or another [`LinkError`] if the kernel rejects the request.
    #[tracing::instrument(level = "debug", skip(self), fields(name = %spec.name))]
    pub async fn create(&self, spec: &InterfaceSpec) -> Result<(), LinkError> {
        self.handle.link().add(spec.to_message()).execute().await?;
        info!("created {} {}", spec.properties.kind(), spec.name);
        Ok(())
    }

    /// Delete a link.
    ///
    /// Deleting either end of a veth pair deletes both.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NotFound`] if the link does not exist.
    pub async fn remove(&self, index: InterfaceIndex) -> Result<(), LinkError> {
        self.handle.link().del(index.to_u32()).execute().await?;
        info!("removed link {index}");
        Ok(())
    }

    /// Set a link administratively up.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] if the kernel rejects the request.
    pub async fn set_up(&self, index: InterfaceIndex) -> Result<(), LinkError> {
        self.handle
            .link()
            .set(LinkUnspec::new_with_index(index.to_u32()).up().build())
            .execute()
            .await?;
        debug!("set link {index} up");
        Ok(())
    }

    /// Attach a link to a controller (i.e. make it a port of a bridge).
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] if the kernel rejects the request.
    pub async fn set_controller(
        &self,
        index: InterfaceIndex,
        controller: InterfaceIndex,
    ) -> Result<(), LinkError> {
        self.handle
            .link()
            .set_port(
                LinkUnspec::new_with_index(index.to_u32())
                    .controller(controller.to_u32())
                    .build(),
            )
            .execute()
            .await?;
        debug!("attached link {index} to controller {controller}");
        Ok(())
    }

    /// Move a link into another network namespace.
    ///
    /// The link gets a new index in the target namespace and disappears from this one.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] if the kernel rejects the request.
    pub async fn move_to_netns(
        &self,
        index: InterfaceIndex,
        netns: &Netns,
    ) -> Result<(), LinkError> {
        self.handle
            .link()
            .set(
                LinkUnspec::new_with_index(index.to_u32())
                    .setns_by_fd(netns.as_raw_fd())
                    .build(),
            )
            .execute()
            .await?;
        debug!(
            "moved link {index} to network namespace {}",
            netns.path().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BridgePropertiesSpec, InterfacePropertiesSpec, InterfaceSpecBuilder, VethPropertiesSpec,
    };
    use rtnetlink::packet_route::link::{InfoKind, LinkAttribute, LinkInfo};

    fn kind_of(attributes: &[LinkAttribute]) -> Option<InfoKind> {
        attributes.iter().find_map(|attribute| match attribute {
            LinkAttribute::LinkInfo(infos) => infos.iter().find_map(|info| match info {
                LinkInfo::Kind(kind) => Some(kind.clone()),
                _ => None,
            }),
            _ => None,
        })
    }

    #[test]
    fn bridge_message_carries_no_queue_length() {
        let spec = InterfaceSpecBuilder::default()
            .name("br-ov1".try_into().unwrap())
            .mtu(Some(1500))
            .properties(InterfacePropertiesSpec::Bridge(BridgePropertiesSpec::default()))
            .build()
            .unwrap();
        let message = spec.to_message();
        assert_eq!(kind_of(&message.attributes), Some(InfoKind::Bridge));
        assert!(message.attributes.contains(&LinkAttribute::Mtu(1500)));
        assert!(
            !message
                .attributes
                .iter()
                .any(|attribute| matches!(attribute, LinkAttribute::TxQueueLen(_)))
        );
    }

    #[test]
    fn veth_message_names_both_ends() {
        let spec = InterfaceSpecBuilder::default()
            .name("eth0".try_into().unwrap())
            .properties(InterfacePropertiesSpec::Veth(VethPropertiesSpec {
                peer: "veth0a1b2c3d".try_into().unwrap(),
            }))
            .build()
            .unwrap();
        let message = spec.to_message();
        assert_eq!(kind_of(&message.attributes), Some(InfoKind::Veth));
        assert!(
            message
                .attributes
                .contains(&LinkAttribute::IfName("eth0".to_string()))
        );
        assert!(
            !message
                .attributes
                .iter()
                .any(|attribute| matches!(attribute, LinkAttribute::Mtu(_)))
        );
    }
}
