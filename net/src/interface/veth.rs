// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::interface::InterfaceIndex;
use serde::{Deserialize, Serialize};

/// Veth specific properties
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct VethProperties {
    /// The index of the other end of the pair.
    ///
    /// Note that this index is relative to the network namespace the peer lives in, which need not
    /// be the namespace this end lives in.
    pub peer: Option<InterfaceIndex>,
    /// The id this end's namespace assigns to the namespace of the peer.
    ///
    /// `None` when both ends live in the same namespace.
    pub peer_netnsid: Option<i32>,
}
