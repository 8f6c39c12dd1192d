// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Structured classification of netlink failures.

use net::interface::IllegalInterfaceName;
use nix::errno::Errno;

/// A failed link (or address) operation.
///
/// The kernel answers lookups of missing links and creation of duplicate links with plain errno
/// values.
/// Those two answers are broken out into their own variants so that callers never need to
/// inspect error strings.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The kernel reported `ENODEV`: the link does not exist.
    #[error("no such link")]
    NotFound,
    /// The kernel reported `EEXIST`: the object already exists.
    #[error("already exists")]
    AlreadyExists,
    /// The kernel returned a link message we could not make sense of.
    #[error("malformed link message: {0}")]
    Malformed(&'static str),
    /// The kernel reported a link name we consider illegal.
    #[error(transparent)]
    IllegalName(#[from] IllegalInterfaceName),
    /// Any other netlink failure.
    #[error(transparent)]
    Netlink(rtnetlink::Error),
}

impl LinkError {
    /// The errno reported by the kernel, if any.
    #[must_use]
    pub fn errno(&self) -> Option<Errno> {
        match self {
            LinkError::NotFound => Some(Errno::ENODEV),
            LinkError::AlreadyExists => Some(Errno::EEXIST),
            LinkError::Netlink(rtnetlink::Error::NetlinkError(message)) => {
                message.to_io().raw_os_error().map(Errno::from_raw)
            }
            LinkError::Malformed(_) | LinkError::IllegalName(_) | LinkError::Netlink(_) => None,
        }
    }
}

impl From<rtnetlink::Error> for LinkError {
    fn from(err: rtnetlink::Error) -> Self {
        if let rtnetlink::Error::NetlinkError(message) = &err {
            match message.to_io().raw_os_error().map(Errno::from_raw) {
                Some(Errno::ENODEV) => return LinkError::NotFound,
                Some(Errno::EEXIST) => return LinkError::AlreadyExists,
                _ => {}
            }
        }
        LinkError::Netlink(err)
    }
}

#[cfg(test)]
mod test {
    use super::LinkError;
    use nix::errno::Errno;

    #[test]
    fn non_kernel_failures_are_passed_through() {
        let err = LinkError::from(rtnetlink::Error::NamespaceError("setns".to_string()));
        assert!(matches!(
            err,
            LinkError::Netlink(rtnetlink::Error::NamespaceError(_))
        ));
        assert_eq!(err.errno(), None);
    }

    #[test]
    fn classified_variants_report_their_errno() {
        assert_eq!(LinkError::NotFound.errno(), Some(Errno::ENODEV));
        assert_eq!(LinkError::AlreadyExists.errno(), Some(Errno::EEXIST));
    }
}
