// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Host forwarding rules for overlay subnets.

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

mod error;
pub mod iptables;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
mod rule;

pub use error::FirewallError;
pub use rule::{Direction, ForwardRule};

use tracectl::trace_target;

trace_target!("firewall", LevelFilter::INFO, &["firewall"]);

/// A chain of rules which may be appended to.
pub trait RuleTable {
    /// Tell if `rule` is already present.
    fn contains(&self, rule: &ForwardRule) -> impl Future<Output = Result<bool, FirewallError>>;

    /// Append `rule` at the end of the chain, whether or not it is already present.
    fn append(&self, rule: &ForwardRule) -> impl Future<Output = Result<(), FirewallError>>;

    /// Append `rule` unless it is already present.
    ///
    /// Returns `true` if the rule was appended.
    fn append_unique(
        &self,
        rule: &ForwardRule,
    ) -> impl Future<Output = Result<bool, FirewallError>> {
        async move {
            if self.contains(rule).await? {
                return Ok(false);
            }
            self.append(rule).await?;
            Ok(true)
        }
    }
}
