// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Rule table backed by the `iptables` / `ip6tables` tools.

use crate::{FirewallError, ForwardRule, RuleTable};
use ipnet::IpNet;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info};

/// `iptables -C` exits with this code when the rule is absent.
const RULE_ABSENT: i32 = 1;

/// The host's filter table, driven through `iptables` (IPv4 subnets) and `ip6tables` (IPv6
/// subnets).
#[derive(Copy, Clone, Debug, Default)]
pub struct Iptables;

impl Iptables {
    fn tool(rule: &ForwardRule) -> &'static str {
        match rule.cidr {
            IpNet::V4(_) => "iptables",
            IpNet::V6(_) => "ip6tables",
        }
    }

    fn args(operation: &str, rule: &ForwardRule) -> Vec<String> {
        // -w waits for the xtables lock instead of failing when another plugin holds it
        let mut args = vec![
            "-w".to_string(),
            operation.to_string(),
            ForwardRule::CHAIN.to_string(),
        ];
        args.extend(rule.spec());
        args
    }

    async fn run(
        operation: &str,
        rule: &ForwardRule,
    ) -> Result<(Output, Vec<String>), FirewallError> {
        let tool = Self::tool(rule);
        let args = Self::args(operation, rule);
        debug!("running {tool} {}", args.join(" "));
        let output = Command::new(tool)
            .args(&args)
            .output()
            .await
            .map_err(|source| FirewallError::Spawn { tool, source })?;
        Ok((output, args))
    }

    fn failed(rule: &ForwardRule, args: &[String], output: &Output) -> FirewallError {
        FirewallError::Failed {
            tool: Self::tool(rule),
            args: args.join(" "),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

impl RuleTable for Iptables {
    async fn contains(&self, rule: &ForwardRule) -> Result<bool, FirewallError> {
        let (output, args) = Self::run("-C", rule).await?;
        if output.status.success() {
            return Ok(true);
        }
        if output.status.code() == Some(RULE_ABSENT) {
            return Ok(false);
        }
        Err(Self::failed(rule, &args, &output))
    }

    async fn append(&self, rule: &ForwardRule) -> Result<(), FirewallError> {
        let (output, args) = Self::run("-A", rule).await?;
        if !output.status.success() {
            return Err(Self::failed(rule, &args, &output));
        }
        info!("appended rule {rule}");
        Ok(())
    }
}
