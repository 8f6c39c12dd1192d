// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A CNI plugin attaching containers to a vxlan overlay network.
//!
//! Each overlay is a linux bridge (`br-<name>`) with a vxlan device (`vxlan-<name>`) bound to an
//! uplink as one of its ports.
//! Containers join the overlay through a veth pair whose host end is another port of the bridge.

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

pub mod args;
pub mod cmd;
pub mod config;
pub mod error;
pub mod plugin;
pub mod provision;
pub mod result;

use tracectl::trace_target;

trace_target!("cni", LevelFilter::INFO, &["cni"]);
