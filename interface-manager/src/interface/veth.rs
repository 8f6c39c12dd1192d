// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use net::interface::InterfaceName;
use serde::{Deserialize, Serialize};

/// The "planned" properties of a veth pair.
///
/// The pair is created from the point of view of one end (the [`InterfaceSpec`] name); this spec
/// names the other end.
///
/// [`InterfaceSpec`]: crate::interface::InterfaceSpec
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct VethPropertiesSpec {
    /// The name of the peer end.
    pub peer: InterfaceName,
}
