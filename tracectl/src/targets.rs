// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Static registry of tracing targets across all linked crates

use crate::LevelFilter;
use linkme::distributed_slice;

/// A tracing target, as declared by [`trace_target!`](crate::trace_target) or
/// [`custom_target!`](crate::custom_target).
pub struct TraceTarget {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: &'static [&'static str],
}

impl TraceTarget {
    #[must_use]
    pub const fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        Self {
            target,
            name,
            level,
            tags,
        }
    }
}

#[distributed_slice]
pub static TRACING_TARGETS: [TraceTarget];

#[macro_export]
macro_rules! trace_target_deps {
    () => {
        use linkme::distributed_slice;
        use $crate::LevelFilter;
        use $crate::targets::{TRACING_TARGETS, TraceTarget};
    };
}

/// Declare the tracing target of the calling module, its name, default level and tags.
///
/// Callers need `linkme` among their dependencies.
#[macro_export]
macro_rules! trace_target {
    // The const scope lets every invocation use the same static name.
    ($name:expr, $level:expr, $tags:expr) => {
        const _: () = {
            use $crate::trace_target_deps;
            trace_target_deps!();

            #[distributed_slice(TRACING_TARGETS)]
            static TRACE_TGT: TraceTarget = TraceTarget::new(module_path!(), $name, $level, $tags);
        };
    };
}

/// Declare a tracing target which is not a module path (for use with `target:` in events).
#[macro_export]
macro_rules! custom_target {
    ($target:expr, $level:expr, $tags:expr) => {
        const _: () = {
            use $crate::trace_target_deps;
            trace_target_deps!();

            #[distributed_slice(TRACING_TARGETS)]
            static TRACE_TGT: TraceTarget = TraceTarget::new($target, $target, $level, $tags);
        };
    };
}
