use nix::errno::Errno;
use nix::unistd::Pid;
use std::os::fd::RawFd;

/// The service-manager primitives the [`Daemon`](crate::Daemon) facade
/// forwards to.
///
/// Implementations report failures as the errno the underlying call
/// produced; the facade attaches the operation description.
pub trait ActivationBackend {
    /// Number of descriptors passed by the service manager, starting at
    /// [`LISTEN_FDS_START`](crate::LISTEN_FDS_START).
    fn listen_fds(&self, unset_environment: bool) -> Result<usize, Errno>;

    /// One activation name per passed descriptor, in descriptor order.
    fn listen_fds_with_names(&self, unset_environment: bool) -> Result<Vec<String>, Errno>;

    /// Whether the system was booted with systemd.
    fn booted(&self) -> bool;

    /// Sends `state` to the service manager.
    ///
    /// Returns `Ok(false)` when no notification socket is configured, so
    /// that "nothing was sent" is distinguishable from a delivered message.
    /// `pid` overrides the sender credentials; `fds` are passed along with
    /// the message.
    fn notify(
        &self,
        pid: Option<Pid>,
        unset_environment: bool,
        state: &str,
        fds: &[RawFd],
    ) -> Result<bool, Errno>;
}
