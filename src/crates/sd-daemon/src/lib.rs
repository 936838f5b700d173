//! Socket activation and readiness notification.
//!
//! This crate provides:
//! - [`Daemon`]: the facade services call, translating backend failures into
//!   [`sd_common::Error`]
//! - [`ActivationBackend`]: the primitives the facade forwards to
//! - [`SystemActivation`]: a backend speaking the `LISTEN_*` and
//!   `NOTIFY_SOCKET` protocols directly
//! - `Libsystemd` (feature `libsystemd`): a backend calling into
//!   `libsystemd.so`
//!
//! # Examples
//!
//! ```no_run
//! use sd_daemon::Daemon;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let daemon = Daemon::system();
//! for (fd, name) in daemon.list_listen_fds_with_names(true)? {
//!     println!("inherited {name} as fd {fd}");
//! }
//!
//! if !daemon.notify(false, "READY=1")? {
//!     println!("not running under a service manager");
//! }
//! # Ok(())
//! # }
//! ```

mod backend;
pub use backend::ActivationBackend;

mod listen;
mod notify;

mod native;
pub use native::SystemActivation;

#[cfg(feature = "libsystemd")]
mod ffi;
#[cfg(feature = "libsystemd")]
pub use ffi::Libsystemd;

use nix::unistd::Pid;
use sd_common::{ErrnoExt, Result};
use std::os::fd::RawFd;

/// The first descriptor number passed by the service manager.
pub const LISTEN_FDS_START: RawFd = 3;

/// Stateless facade over an [`ActivationBackend`].
#[derive(Debug, Clone, Default)]
pub struct Daemon<B = SystemActivation> {
    backend: B,
}

impl Daemon<SystemActivation> {
    /// A facade over the native protocol implementation.
    pub fn system() -> Self {
        Self::new(SystemActivation::default())
    }
}

impl<B: ActivationBackend> Daemon<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Descriptors passed by the service manager, in ascending order.
    ///
    /// An empty list is not an error: the process was simply not socket
    /// activated.
    pub fn list_listen_fds(&self, unset_environment: bool) -> Result<Vec<RawFd>> {
        let n = self
            .backend
            .listen_fds(unset_environment)
            .context("failed to get listening fds")?;

        Ok(descriptors(n).collect())
    }

    /// Descriptors passed by the service manager, paired with their
    /// activation names (`FileDescriptorName=`).
    pub fn list_listen_fds_with_names(
        &self,
        unset_environment: bool,
    ) -> Result<Vec<(RawFd, String)>> {
        let names = self
            .backend
            .listen_fds_with_names(unset_environment)
            .context("failed to get listening fds")?;

        Ok(descriptors(names.len()).zip(names).collect())
    }

    pub fn is_booted(&self) -> bool {
        self.backend.booted()
    }

    /// Sends `state` (e.g. `READY=1`) to the service manager.
    ///
    /// Returns `false` when the process has no notification socket.
    pub fn notify(&self, unset_environment: bool, state: &str) -> Result<bool> {
        self.send(None, unset_environment, state, &[])
    }

    /// Like [`notify`](Self::notify), on behalf of `pid`.
    pub fn pid_notify(&self, pid: Pid, unset_environment: bool, state: &str) -> Result<bool> {
        self.send(Some(pid), unset_environment, state, &[])
    }

    /// Like [`pid_notify`](Self::pid_notify), also handing `fds` to the
    /// service manager (e.g. with `FDSTORE=1`).
    pub fn pid_notify_with_fds(
        &self,
        pid: Pid,
        unset_environment: bool,
        state: &str,
        fds: &[RawFd],
    ) -> Result<bool> {
        self.send(Some(pid), unset_environment, state, fds)
    }

    fn send(
        &self,
        pid: Option<Pid>,
        unset_environment: bool,
        state: &str,
        fds: &[RawFd],
    ) -> Result<bool> {
        self.backend
            .notify(pid, unset_environment, state, fds)
            .inspect_err(|errno| tracing::warn!(%errno, "notification failed"))
            .context("failed to notify service manager")
    }
}

fn descriptors(n: usize) -> impl Iterator<Item = RawFd> {
    (0..n).map(|i| LISTEN_FDS_START + i as RawFd)
}
