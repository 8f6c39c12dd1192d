// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::interface::InterfaceIndex;
use crate::vxlan::Vni;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Vtep (vxlan device) specific properties
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct VtepProperties {
    /// The VNI associated with this vtep.
    /// This value can be `None` in the event of an "external" vtep.
    pub vni: Option<Vni>,
    /// The multicast group (or unicast remote) used for flooding.
    pub group: Option<IpAddr>,
    /// The UDP destination port.
    /// `None` if the netlink message describing the vtep did not report it.
    pub port: Option<u16>,
    /// The index of the underlay (uplink) device the tunnel is bound to.
    pub link: Option<InterfaceIndex>,
}
