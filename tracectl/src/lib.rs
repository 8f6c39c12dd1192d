// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing setup with per-target levels.
//!
//! Every crate declares its tracing target(s) with [`trace_target!`] (or [`custom_target!`]).
//! The declarations are collected at link time, so the subscriber knows all of them before the
//! first event is emitted.
//! Events are written to stderr.

pub mod control;
pub mod targets;

// re-exports
pub use control::TraceConfigError;
pub use control::TracingControl;
pub use control::get_trace_ctl;
pub use tracing_subscriber::filter::LevelFilter;
