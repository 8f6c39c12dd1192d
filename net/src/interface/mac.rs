// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// An ethernet hardware address.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Mac(pub [u8; 6]);

impl Mac {
    /// Interpret a raw `IFLA_ADDRESS` payload as a [`Mac`].
    ///
    /// Returns `None` if the payload is not exactly six bytes long (as is the case for e.g.
    /// tunnel devices without a link layer address).
    #[must_use]
    pub fn from_bytes(raw: &[u8]) -> Option<Mac> {
        <[u8; 6]>::try_from(raw).ok().map(Mac)
    }
}

impl Display for Mac {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}
