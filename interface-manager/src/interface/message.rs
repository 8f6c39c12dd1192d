// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::error::LinkError;
use net::interface::{
    AdminState, Interface, InterfaceIndex, InterfaceName, InterfaceProperties, Mac,
    VethProperties, VtepProperties,
};
use net::vxlan::Vni;
use rtnetlink::packet_route::link::{
    InfoData, InfoKind, InfoVxlan, LinkAttribute, LinkFlags, LinkInfo, LinkMessage,
};
use std::net::IpAddr;
use tracing::trace;

/// Decode an observed link from the kernel's description of it.
pub trait TryFromLinkMessage: Sized {
    /// Decode `message`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Malformed`] if the message lacks an index or a name, and
    /// [`LinkError::IllegalName`] if the reported name is not a legal interface name.
    fn try_from_link_message(message: &LinkMessage) -> Result<Self, LinkError>;
}

impl TryFromLinkMessage for Interface {
    fn try_from_link_message(message: &LinkMessage) -> Result<Self, LinkError> {
        let index = InterfaceIndex::try_new(message.header.index)
            .map_err(|_| LinkError::Malformed("link index is zero"))?;
        let admin_state = if message.header.flags.contains(LinkFlags::Up) {
            AdminState::Up
        } else {
            AdminState::Down
        };
        let mut name = None;
        let mut mac = None;
        let mut mtu = None;
        let mut controller = None;
        let mut link = None;
        let mut link_netnsid = None;
        let mut kind = None;
        let mut vtep = VtepProperties::default();
        for attribute in &message.attributes {
            match attribute {
                LinkAttribute::IfName(raw) => name = Some(InterfaceName::try_from(raw.as_str())?),
                LinkAttribute::Address(raw) => mac = Mac::from_bytes(raw),
                LinkAttribute::Mtu(raw) => mtu = Some(*raw),
                LinkAttribute::Controller(raw) => controller = InterfaceIndex::try_new(*raw).ok(),
                LinkAttribute::Link(raw) => link = InterfaceIndex::try_new(*raw).ok(),
                LinkAttribute::LinkNetNsId(raw) => link_netnsid = Some(*raw),
                LinkAttribute::LinkInfo(infos) => {
                    for info in infos {
                        match info {
                            LinkInfo::Kind(info_kind) => kind = Some(info_kind.clone()),
                            LinkInfo::Data(InfoData::Vxlan(data)) => read_vxlan(data, &mut vtep),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
        let name = name.ok_or(LinkError::Malformed("link has no name"))?;
        let properties = match kind {
            Some(InfoKind::Bridge) => InterfaceProperties::Bridge,
            Some(InfoKind::Vxlan) => InterfaceProperties::Vtep(vtep),
            Some(InfoKind::Veth) => InterfaceProperties::Veth(VethProperties {
                peer: link,
                peer_netnsid: link_netnsid,
            }),
            other => {
                trace!("{name} has link kind {other:?}");
                InterfaceProperties::Other
            }
        };
        Ok(Interface {
            index,
            name,
            mac,
            mtu,
            admin_state,
            controller,
            properties,
        })
    }
}

fn read_vxlan(data: &[InfoVxlan], vtep: &mut VtepProperties) {
    for item in data {
        match item {
            InfoVxlan::Id(raw) => vtep.vni = Vni::new_checked(*raw).ok(),
            InfoVxlan::Link(raw) => vtep.link = InterfaceIndex::try_new(*raw).ok(),
            InfoVxlan::Group(group) => vtep.group = Some(IpAddr::V4(*group)),
            InfoVxlan::Group6(group) => vtep.group = Some(IpAddr::V6(*group)),
            InfoVxlan::Port(port) => vtep.port = Some(*port),
            _ => {}
        }
    }
}

#[cfg(test)]
mod test {
    use super::TryFromLinkMessage;
    use crate::error::LinkError;
    use net::interface::{AdminState, Interface, InterfaceProperties, LinkKind, Mac};
    use net::vxlan::Vni;
    use rtnetlink::packet_route::link::{
        InfoData, InfoKind, InfoVxlan, LinkAttribute, LinkFlags, LinkInfo, LinkMessage,
    };
    use std::net::{IpAddr, Ipv4Addr};

    fn message(index: u32, name: &str, info: Vec<LinkInfo>) -> LinkMessage {
        let mut message = LinkMessage::default();
        message.header.index = index;
        message
            .attributes
            .push(LinkAttribute::IfName(name.to_string()));
        if !info.is_empty() {
            message.attributes.push(LinkAttribute::LinkInfo(info));
        }
        message
    }

    #[test]
    fn bridge_is_classified() {
        let mut msg = message(7, "br-ov1", vec![LinkInfo::Kind(InfoKind::Bridge)]);
        msg.header.flags = LinkFlags::Up;
        msg.attributes.push(LinkAttribute::Mtu(1500));
        msg.attributes
            .push(LinkAttribute::Address(vec![0x02, 0, 0, 0, 0, 0x01]));
        let interface = Interface::try_from_link_message(&msg).unwrap();
        assert_eq!(interface.index.to_u32(), 7);
        assert_eq!(interface.name.as_ref(), "br-ov1");
        assert_eq!(interface.kind(), LinkKind::Bridge);
        assert_eq!(interface.admin_state, AdminState::Up);
        assert_eq!(interface.mtu, Some(1500));
        assert_eq!(interface.mac, Some(Mac([0x02, 0, 0, 0, 0, 0x01])));
    }

    #[test]
    fn vxlan_data_is_decoded() {
        let mut msg = message(
            9,
            "vxlan-ov1",
            vec![
                LinkInfo::Kind(InfoKind::Vxlan),
                LinkInfo::Data(InfoData::Vxlan(vec![
                    InfoVxlan::Id(42),
                    InfoVxlan::Link(2),
                    InfoVxlan::Group(Ipv4Addr::new(239, 1, 1, 1)),
                    InfoVxlan::Port(4789),
                ])),
            ],
        );
        msg.attributes.push(LinkAttribute::Controller(7));
        let interface = Interface::try_from_link_message(&msg).unwrap();
        assert_eq!(interface.admin_state, AdminState::Down);
        assert_eq!(interface.controller.map(|c| c.to_u32()), Some(7));
        match interface.properties {
            InterfaceProperties::Vtep(vtep) => {
                assert_eq!(vtep.vni, Some(Vni::new_checked(42).unwrap()));
                assert_eq!(vtep.link.map(|l| l.to_u32()), Some(2));
                assert_eq!(vtep.group, Some(IpAddr::V4(Ipv4Addr::new(239, 1, 1, 1))));
                assert_eq!(vtep.port, Some(4789));
            }
            other => unreachable!("{other:?}"),
        }
    }

    #[test]
    fn veth_peer_is_recorded() {
        let mut msg = message(11, "eth0", vec![LinkInfo::Kind(InfoKind::Veth)]);
        msg.attributes.push(LinkAttribute::Link(12));
        let interface = Interface::try_from_link_message(&msg).unwrap();
        match interface.properties {
            InterfaceProperties::Veth(veth) => {
                assert_eq!(veth.peer.map(|p| p.to_u32()), Some(12));
                assert_eq!(veth.peer_netnsid, None);
            }
            other => unreachable!("{other:?}"),
        }

        msg.attributes.push(LinkAttribute::LinkNetNsId(3));
        let interface = Interface::try_from_link_message(&msg).unwrap();
        match interface.properties {
            InterfaceProperties::Veth(veth) => assert_eq!(veth.peer_netnsid, Some(3)),
            other => unreachable!("{other:?}"),
        }
    }

    #[test]
    fn unknown_kinds_are_other() {
        let msg = message(1, "lo", vec![]);
        let interface = Interface::try_from_link_message(&msg).unwrap();
        assert_eq!(interface.kind(), LinkKind::Other);
    }

    #[test]
    fn nameless_and_indexless_links_are_malformed() {
        let mut msg = LinkMessage::default();
        msg.header.index = 3;
        assert!(matches!(
            Interface::try_from_link_message(&msg),
            Err(LinkError::Malformed(_))
        ));
        let msg = message(0, "eth0", vec![]);
        assert!(matches!(
            Interface::try_from_link_message(&msg),
            Err(LinkError::Malformed(_))
        ));
    }
}
