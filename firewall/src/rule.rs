// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use ipnet::IpNet;
use std::fmt::{Display, Formatter};

/// Which address of a forwarded packet a rule matches.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Direction {
    /// Match the source address (`-s`).
    Source,
    /// Match the destination address (`-d`).
    Destination,
}

impl Direction {
    fn flag(self) -> &'static str {
        match self {
            Direction::Source => "-s",
            Direction::Destination => "-d",
        }
    }
}

/// An `ACCEPT` rule in the `FORWARD` chain of the filter table.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ForwardRule {
    /// The address the rule matches on.
    pub direction: Direction,
    /// The subnet the rule accepts.
    pub cidr: IpNet,
}

impl ForwardRule {
    /// The chain the rules live in.
    pub const CHAIN: &'static str = "FORWARD";

    /// The pair of rules accepting all traffic from and to `cidr`.
    #[must_use]
    pub fn accept_subnet(cidr: IpNet) -> [ForwardRule; 2] {
        [
            ForwardRule {
                direction: Direction::Source,
                cidr,
            },
            ForwardRule {
                direction: Direction::Destination,
                cidr,
            },
        ]
    }

    /// The rule specification, as given to iptables after the chain name.
    #[must_use]
    pub fn spec(&self) -> [String; 4] {
        [
            self.direction.flag().to_string(),
            self.cidr.to_string(),
            "-j".to_string(),
            "ACCEPT".to_string(),
        ]
    }
}

impl Display for ForwardRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", Self::CHAIN, self.spec().join(" "))
    }
}

#[cfg(test)]
mod test {
    use super::{Direction, ForwardRule};

    #[test]
    fn subnet_rules_cover_both_directions() {
        let [from, to] = ForwardRule::accept_subnet("10.1.0.0/24".parse().unwrap());
        assert_eq!(from.direction, Direction::Source);
        assert_eq!(to.direction, Direction::Destination);
        assert_eq!(from.to_string(), "FORWARD -s 10.1.0.0/24 -j ACCEPT");
        assert_eq!(to.to_string(), "FORWARD -d 10.1.0.0/24 -j ACCEPT");
    }
}
