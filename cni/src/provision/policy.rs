// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::error::PluginError;
use firewall::{ForwardRule, RuleTable};
use ipnet::IpNet;
use tracing::{debug, info};

/// Accept forwarded traffic from and to the overlay subnet.
///
/// Rules already present are not appended again.
///
/// # Errors
///
/// Returns [`PluginError::Policy`] if the rule table cannot be read or changed.
pub async fn install_forwarding_policy<R: RuleTable>(
    rules: &R,
    cidr: IpNet,
) -> Result<(), PluginError> {
    for rule in ForwardRule::accept_subnet(cidr) {
        if rules.append_unique(&rule).await? {
            info!("installed forwarding rule {rule}");
        } else {
            debug!("forwarding rule {rule} already present");
        }
    }
    Ok(())
}
