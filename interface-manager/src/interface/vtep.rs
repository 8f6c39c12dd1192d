// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use derive_builder::Builder;
use net::interface::{InterfaceIndex, VtepProperties};
use net::vxlan::Vni;
use rtnetlink::packet_route::link::InfoVxlan;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// The "planned" properties of a VTEP / vxlan device.
#[derive(Builder, Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct VtepPropertiesSpec {
    /// The vni to be used for this device.
    pub vni: Vni,
    /// The underlay (uplink) device carrying the encapsulated traffic.
    pub link: InterfaceIndex,
    /// The multicast group (or unicast remote) to flood to.
    pub group: IpAddr,
    /// The UDP destination port.
    /// `None` leaves the choice to the kernel.
    #[builder(default)]
    pub port: Option<u16>,
}

impl VtepPropertiesSpec {
    /// The `IFLA_VXLAN_*` attributes describing this spec.
    pub(crate) fn info_data(&self) -> Vec<InfoVxlan> {
        let mut data = vec![
            InfoVxlan::Id(self.vni.as_u32()),
            InfoVxlan::Link(self.link.to_u32()),
        ];
        data.push(match self.group {
            IpAddr::V4(group) => InfoVxlan::Group(group),
            IpAddr::V6(group) => InfoVxlan::Group6(group),
        });
        if let Some(port) = self.port {
            data.push(InfoVxlan::Port(port));
        }
        data
    }
}

/// A vtep satisfies a spec when every property the spec names was observed with the planned value.
impl PartialEq<VtepProperties> for VtepPropertiesSpec {
    fn eq(&self, other: &VtepProperties) -> bool {
        other.vni == Some(self.vni)
            && other.link == Some(self.link)
            && other.group == Some(self.group)
            && self.port.is_none_or(|port| other.port == Some(port))
    }
}
