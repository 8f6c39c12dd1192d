// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Fixtures for tests which manipulate network namespaces.
//!
//! These are meant to be used with `fixin::wrap`, e.g.
//!
//! ```ignore
//! #[tokio::test]
//! #[wrap(with_caps([Capability::CAP_NET_ADMIN]))]
//! #[wrap(in_scoped_netns("some_test"))]
//! async fn some_test() { /* runs in /run/netns/some_test */ }
//! ```

use caps::{CapSet, Capability};
use nix::fcntl::OFlag;
use nix::sched::CloneFlags;
use nix::sys::stat::Mode;
use rtnetlink::NetworkNamespace;
use std::panic::{RefUnwindSafe, UnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use tracing::error;

/// The directory `ip netns` (and [`NetworkNamespace::add`]) bind named namespaces into.
pub const NETNS_DIR: &str = "/run/netns";

/// The path of the named network namespace `netns_name`.
#[must_use]
pub fn netns_path(netns_name: impl AsRef<str>) -> PathBuf {
    Path::new(NETNS_DIR).join(netns_name.as_ref())
}

/// Fixture which runs the test on a fresh thread in the network namespace of the given name.
pub fn run_in_netns<F: UnwindSafe + Send + FnOnce() -> T, T>(
    netns_name: impl AsRef<str>,
) -> impl FnOnce(F) -> T
where
    T: Send,
{
    move |f: F| {
        let path = netns_path(netns_name.as_ref());
        std::thread::scope(|scope| {
            std::thread::Builder::new()
                .name(netns_name.as_ref().to_string())
                .spawn_scoped(scope, || {
                    with_caps([Capability::CAP_SYS_ADMIN])(|| move_thread_to_netns(&path))
                        .unwrap_or_else(|e| panic!("{e}"));
                    catch_unwind(f).unwrap()
                })
                .unwrap()
                .join()
                .unwrap()
        })
    }
}

/// Fixture which creates a network namespace with the given name before the test and removes it
/// afterward.
///
/// The test itself keeps running in the namespace it was started in.
pub fn with_netns<F: 'static + Send + RefUnwindSafe + UnwindSafe + FnOnce() -> T, T>(
    netns_name: impl 'static + Send + UnwindSafe + RefUnwindSafe + AsRef<str>,
) -> impl FnOnce(F) -> T
where
    T: Send,
{
    move |f: F| {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()
            .unwrap();
        with_caps([Capability::CAP_SYS_ADMIN])(|| {
            runtime.block_on(async {
                if let Err(err) = NetworkNamespace::add(netns_name.as_ref().to_string()).await {
                    let netns_name = netns_name.as_ref();
                    panic!("failed to create network namespace {netns_name}: {err}");
                }
            });
        });
        let ret = catch_unwind(f);
        with_caps([Capability::CAP_SYS_ADMIN])(|| {
            runtime.block_on(async {
                if let Err(err) = NetworkNamespace::del(netns_name.as_ref().to_string()).await {
                    let netns_name = netns_name.as_ref();
                    panic!("failed to remove network namespace {netns_name}: {err}");
                }
            });
        });
        ret.unwrap()
    }
}

/// Fixture which creates a network namespace of the given name and runs the test in it.
pub fn in_scoped_netns<F: 'static + Send + RefUnwindSafe + UnwindSafe + FnOnce() -> T, T>(
    netns_name: impl 'static + Sync + UnwindSafe + RefUnwindSafe + AsRef<str>,
) -> impl FnOnce(F) -> T
where
    T: Send + UnwindSafe + RefUnwindSafe,
{
    let netns_name = netns_name.as_ref().to_string();
    |f: F| with_netns(netns_name.clone())(|| run_in_netns(netns_name)(f))
}

/// Fixture which runs the supplied function with _additional_ granted capabilities.
pub fn with_caps<F: UnwindSafe + FnOnce() -> T, T>(
    caps: impl IntoIterator<Item = Capability>,
) -> impl FnOnce(F) -> T {
    move |f: F| {
        let current_caps = match caps::read(None, CapSet::Effective) {
            Ok(current_caps) => current_caps,
            Err(err) => {
                error!("caps error: {err}");
                panic!("caps error: {err}");
            }
        };
        let needed_caps: Vec<_> = caps
            .into_iter()
            .filter(|cap| !current_caps.contains(cap))
            .collect();
        for cap in &needed_caps {
            caps::raise(None, CapSet::Effective, *cap)
                .unwrap_or_else(|err| panic!("unable to raise capability to {cap}: {err}"));
        }
        let ret = catch_unwind(f);
        for cap in &needed_caps {
            caps::drop(None, CapSet::Effective, *cap)
                .unwrap_or_else(|err| panic!("unable to drop capability to {cap}: {err}"));
        }
        ret.unwrap()
    }
}

/// Permanently move the calling thread to the (extant) network namespace at `path`.
///
/// The thread is first unshared from the process so that the rest of the test process stays
/// where it is.
/// The calling thread must not hold any netlink sockets, as those stay bound to the old namespace.
fn move_thread_to_netns(path: &Path) -> Result<(), String> {
    nix::sched::unshare(CloneFlags::CLONE_NEWNET).map_err(|e| format!("unshare error: {e}"))?;
    let fd = nix::fcntl::open(path, OFlag::O_RDONLY | OFlag::O_CLOEXEC, Mode::empty())
        .map_err(|e| format!("open error on {}: {e}", path.display()))?;
    nix::sched::setns(&fd, CloneFlags::CLONE_NEWNET)
        .map_err(|e| format!("setns error on {}: {e}", path.display()))
}
