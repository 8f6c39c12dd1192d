// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The provisioning steps of ADD.
//!
//! The bridge and tunnel steps are keyed by link name: a link which already exists under the
//! expected name and of the expected kind is adopted as is.
//! The container interface is never adopted; each attachment creates its own veth pair.

mod bridge;
mod policy;
mod tunnel;
mod veth;

pub use bridge::{bridge_spec, ensure_bridge};
pub use policy::install_forwarding_policy;
pub use tunnel::{ensure_tunnel, resolve_uplink, tunnel_spec};
pub use veth::{attach_container, host_veth_name};

use crate::error::PluginError;
use net::interface::{Interface, LinkKind};

/// MTU of the links the overlay creates.
pub const OVERLAY_MTU: u32 = 1500;

/// Adopt `link` if it is a `expected`, or report the conflict.
fn expect_kind(link: Interface, expected: LinkKind) -> Result<Interface, PluginError> {
    let found = link.kind();
    if found == expected {
        Ok(link)
    } else {
        Err(PluginError::NamingConflict {
            name: link.name,
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod test {
    use super::expect_kind;
    use crate::error::PluginError;
    use net::interface::{AdminState, Interface, InterfaceIndex, InterfaceProperties, LinkKind};

    fn link(properties: InterfaceProperties) -> Interface {
        Interface {
            index: InterfaceIndex::try_new(7).unwrap(),
            name: "br-ov1".try_into().unwrap(),
            mac: None,
            mtu: Some(1500),
            admin_state: AdminState::Up,
            controller: None,
            properties,
        }
    }

    #[test]
    fn matching_kinds_are_adopted() {
        let bridge = expect_kind(link(InterfaceProperties::Bridge), LinkKind::Bridge).unwrap();
        assert_eq!(bridge.index.to_u32(), 7);
    }

    #[test]
    fn other_kinds_conflict() {
        match expect_kind(link(InterfaceProperties::Other), LinkKind::Bridge) {
            Err(PluginError::NamingConflict {
                name,
                expected,
                found,
            }) => {
                assert_eq!(name.as_ref(), "br-ov1");
                assert_eq!(expected, LinkKind::Bridge);
                assert_eq!(found, LinkKind::Other);
            }
            other => unreachable!("{other:?}"),
        }
    }
}
