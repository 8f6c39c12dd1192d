// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use net::interface::InterfaceProperties;
use serde::{Deserialize, Serialize};

/// The "planned" properties for a bridge.
///
/// The overlay bridge is a plain learning bridge, so there is nothing to plan beyond its
/// existence.
/// In particular, no transmit queue length is requested and the kernel default applies.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct BridgePropertiesSpec {}

impl PartialEq<InterfaceProperties> for BridgePropertiesSpec {
    fn eq(&self, other: &InterfaceProperties) -> bool {
        matches!(other, InterfaceProperties::Bridge)
    }
}
