// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::interface::{BridgePropertiesSpec, VethPropertiesSpec, VtepPropertiesSpec};
use net::interface::{InterfaceProperties, LinkKind};
use serde::{Deserialize, Serialize};

/// The planned properties of a network interface.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
pub enum InterfacePropertiesSpec {
    /// The planned properties of a bridge.
    Bridge(BridgePropertiesSpec),
    /// The planned properties of a vtep (vxlan device).
    Vtep(VtepPropertiesSpec),
    /// The planned properties of a veth pair.
    Veth(VethPropertiesSpec),
}

impl InterfacePropertiesSpec {
    /// The kind of link these properties describe.
    #[must_use]
    pub fn kind(&self) -> LinkKind {
        match self {
            InterfacePropertiesSpec::Bridge(_) => LinkKind::Bridge,
            InterfacePropertiesSpec::Vtep(_) => LinkKind::Vxlan,
            InterfacePropertiesSpec::Veth(_) => LinkKind::Veth,
        }
    }
}

impl PartialEq<InterfaceProperties> for InterfacePropertiesSpec {
    fn eq(&self, other: &InterfaceProperties) -> bool {
        match (self, other) {
            (InterfacePropertiesSpec::Bridge(spec), observed) => spec == observed,
            (InterfacePropertiesSpec::Vtep(spec), InterfaceProperties::Vtep(observed)) => {
                spec == observed
            }
            // the peer name is only meaningful at creation time
            (InterfacePropertiesSpec::Veth(_), InterfaceProperties::Veth(_)) => true,
            _ => false,
        }
    }
}
