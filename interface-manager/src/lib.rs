// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Create, observe, and wire together the linux network links of the vxlan overlay.

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

use std::marker::PhantomData;
use std::sync::Arc;

pub mod address;
pub mod error;
pub mod interface;
pub mod netns;

use rtnetlink::Handle;
use tracectl::trace_target;

trace_target!("interface-manager", LevelFilter::INFO, &["netlink"]);

/// `Manager` is the primary entry point to link manipulation.
///
/// It is a newtype wrapper around a netlink handle, with a `PhantomData<R>` used to group the
/// operations by the kind of resource `R` they act upon.
///
/// A netlink socket is bound to the network namespace which was active on the calling thread when
/// the socket was opened.
/// A `Manager` therefore always acts on exactly one network namespace, no matter which namespace
/// the calling thread happens to be in later.
#[derive(Clone, Debug)]
pub struct Manager<R: ?Sized> {
    handle: Arc<Handle>,
    _marker: PhantomData<R>,
}

impl<R> Manager<R> {
    /// Create a new `Manager` from an [`Arc<Handle>`].
    #[must_use]
    pub fn new(handle: Arc<Handle>) -> Self {
        Manager {
            handle,
            _marker: PhantomData,
        }
    }

    /// Open a netlink connection in the network namespace of the calling thread.
    ///
    /// The connection is driven by a task spawned on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if the netlink socket cannot be opened.
    pub fn connect() -> Result<Self, std::io::Error> {
        let (connection, handle, _) = rtnetlink::new_connection()?;
        tokio::spawn(connection);
        Ok(Self::new(Arc::new(handle)))
    }
}

/// Convenience method for reducing syntactic noise when creating ephemeral `Manager` structs.
pub fn manager_of<T>(other: impl Into<Manager<T>>) -> Manager<T> {
    other.into()
}

impl<T, U> From<&Manager<T>> for Manager<U> {
    fn from(handle: &Manager<T>) -> Self {
        Self::new(handle.handle.clone())
    }
}
