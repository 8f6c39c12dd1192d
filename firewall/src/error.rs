// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::process::ExitStatus;

/// Failures to inspect or change the forwarding rules.
#[derive(Debug, thiserror::Error)]
pub enum FirewallError {
    /// The rule tool could not be run at all.
    #[error("failed to run {tool}: {source}")]
    Spawn {
        /// The tool which was invoked.
        tool: &'static str,
        /// The reason it could not be run.
        source: std::io::Error,
    },
    /// The rule tool ran and reported a failure.
    #[error("{tool} {args} failed ({status}): {stderr}")]
    Failed {
        /// The tool which was invoked.
        tool: &'static str,
        /// Its arguments, space separated.
        args: String,
        /// Its exit status.
        status: ExitStatus,
        /// What it printed on stderr.
        stderr: String,
    },
}
