// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Network namespace manipulation

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sched::CloneFlags;
use nix::sys::stat::Mode;
use std::marker::PhantomData;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// The network namespace of the calling thread.
const THREAD_NETNS: &str = "/proc/thread-self/ns/net";

/// Errors which may occur while opening, entering, or leaving a network namespace.
#[derive(Debug, thiserror::Error)]
pub enum NetnsError {
    /// The namespace file could not be opened.
    #[error("failed to open network namespace {path}: {source}", path = path.display())]
    Open {
        /// The namespace path.
        path: PathBuf,
        /// The underlying failure.
        source: Errno,
    },
    /// The `setns` call moving the thread into the namespace failed.
    #[error("failed to enter network namespace {path}: {source}", path = path.display())]
    Enter {
        /// The namespace path.
        path: PathBuf,
        /// The underlying failure.
        source: Errno,
    },
    /// The `setns` call moving the thread back to its original namespace failed.
    #[error("failed to restore network namespace {path}: {source}", path = path.display())]
    Restore {
        /// The namespace path.
        path: PathBuf,
        /// The underlying failure.
        source: Errno,
    },
}

impl NetnsError {
    /// `true` if the namespace could not be opened because it does not exist (anymore).
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, NetnsError::Open { source: Errno::ENOENT, .. })
    }
}

/// An open handle on a network namespace.
///
/// Holding the file descriptor keeps the namespace alive, even if it is unmounted from its path.
#[derive(Debug)]
pub struct Netns {
    path: PathBuf,
    fd: OwnedFd,
}

impl Netns {
    /// Open the network namespace bound at `path` (e.g. `/run/netns/foo` or `/proc/1234/ns/net`).
    ///
    /// # Errors
    ///
    /// Returns [`NetnsError::Open`] if the path cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NetnsError> {
        let path = path.as_ref();
        match nix::fcntl::open(path, OFlag::O_RDONLY | OFlag::O_CLOEXEC, Mode::empty()) {
            Ok(fd) => Ok(Self {
                path: path.to_path_buf(),
                fd,
            }),
            Err(source) => Err(NetnsError::Open {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Open the network namespace the calling thread currently lives in.
    ///
    /// # Errors
    ///
    /// Returns [`NetnsError::Open`] if `/proc` is not available.
    pub fn current() -> Result<Self, NetnsError> {
        Self::open(THREAD_NETNS)
    }

    /// The path this namespace was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the calling thread into this namespace until the returned [`NetnsScope`] is exited or
    /// dropped.
    ///
    /// The scope is bound to the calling thread and can not be sent to another one.
    /// Netlink sockets opened while the scope is active act on this namespace for their whole
    /// lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if the current namespace can not be recorded or if `setns` fails.
    /// In either case the calling thread is left in its original namespace.
    #[tracing::instrument(level = "debug", skip(self), fields(netns = %self.path.display()))]
    pub fn enter(&self) -> Result<NetnsScope, NetnsError> {
        let origin = Netns::current()?;
        if let Err(source) = nix::sched::setns(self.fd.as_fd(), CloneFlags::CLONE_NEWNET) {
            error!("setns error: {source}");
            return Err(NetnsError::Enter {
                path: self.path.clone(),
                source,
            });
        }
        debug!("entered network namespace");
        Ok(NetnsScope {
            origin: Some(origin),
            _thread_bound: PhantomData,
        })
    }
}

impl AsFd for Netns {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for Netns {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

/// The calling thread's stay in another network namespace.
///
/// The thread is moved back to the namespace it came from by [`NetnsScope::exit`], or, failing
/// that, when the scope is dropped (including on early return and unwinding).
#[derive(Debug)]
#[must_use = "the thread returns to its original namespace when the scope is dropped"]
pub struct NetnsScope {
    origin: Option<Netns>,
    // namespaces are a property of the thread
    _thread_bound: PhantomData<*const ()>,
}

impl NetnsScope {
    /// Return the calling thread to its original namespace.
    ///
    /// # Errors
    ///
    /// Returns [`NetnsError::Restore`] if `setns` fails.
    pub fn exit(mut self) -> Result<(), NetnsError> {
        match self.origin.take() {
            Some(origin) => restore(&origin),
            None => Ok(()),
        }
    }
}

impl Drop for NetnsScope {
    fn drop(&mut self) {
        if let Some(origin) = self.origin.take()
            && let Err(err) = restore(&origin)
        {
            error!("{err}");
        }
    }
}

fn restore(origin: &Netns) -> Result<(), NetnsError> {
    match nix::sched::setns(origin.fd.as_fd(), CloneFlags::CLONE_NEWNET) {
        Ok(()) => {
            debug!("restored network namespace {}", origin.path.display());
            Ok(())
        }
        Err(source) => Err(NetnsError::Restore {
            path: origin.path.clone(),
            source,
        }),
    }
}

#[cfg(test)]
mod test {
    use super::{Netns, NetnsError};
    use nix::errno::Errno;

    #[test]
    fn missing_namespace_is_classified() {
        let err = Netns::open("/run/netns/definitely-not-a-namespace").unwrap_err();
        assert!(err.is_missing());
        assert!(matches!(
            err,
            NetnsError::Open {
                source: Errno::ENOENT,
                ..
            }
        ));
    }

    #[test]
    fn current_namespace_can_be_opened() {
        let current = Netns::current().unwrap();
        assert!(current.path().ends_with("net"));
    }
}
