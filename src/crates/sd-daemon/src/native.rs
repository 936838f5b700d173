use crate::backend::ActivationBackend;
use crate::{listen, notify};
use nix::errno::Errno;
use nix::unistd::{Pid, getpid};
use std::os::fd::RawFd;
use std::path::PathBuf;
use tracing::{debug, trace};

const DEFAULT_RUNTIME_DIR: &str = "/run/systemd/system";

/// Speaks the service-manager protocols directly: reads the activation
/// variables from the process environment and writes notifications to
/// `NOTIFY_SOCKET`.
#[derive(Debug, Clone)]
pub struct SystemActivation {
    runtime_dir: PathBuf,
}

impl Default for SystemActivation {
    fn default() -> Self {
        Self {
            runtime_dir: PathBuf::from(DEFAULT_RUNTIME_DIR),
        }
    }
}

impl SystemActivation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory whose presence means "booted with systemd"
    pub fn with_runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = dir.into();
        self
    }
}

impl ActivationBackend for SystemActivation {
    fn listen_fds(&self, unset_environment: bool) -> Result<usize, Errno> {
        let env = listen::ListenEnv::from_process();

        let result = env.count(getpid()).and_then(|n| {
            listen::set_cloexec(n)?;
            Ok(n)
        });

        if unset_environment {
            listen::unset_environment();
        }

        trace!(?result, "listen fds");
        result
    }

    fn listen_fds_with_names(&self, unset_environment: bool) -> Result<Vec<String>, Errno> {
        let env = listen::ListenEnv::from_process();

        let result = env.count(getpid()).and_then(|n| {
            if n == 0 {
                return Ok(Vec::new());
            }

            listen::set_cloexec(n)?;
            env.names(n)
        });

        if unset_environment {
            listen::unset_environment();
        }

        trace!(?result, "listen fds with names");
        result
    }

    fn booted(&self) -> bool {
        std::fs::symlink_metadata(&self.runtime_dir).is_ok_and(|m| m.is_dir())
    }

    fn notify(
        &self,
        pid: Option<Pid>,
        unset_environment: bool,
        state: &str,
        fds: &[RawFd],
    ) -> Result<bool, Errno> {
        let result = if state.is_empty() {
            Err(Errno::EINVAL)
        } else {
            match std::env::var_os(notify::NOTIFY_SOCKET) {
                None => Ok(false),
                Some(raw) => notify::parse_address(&raw)
                    .and_then(|addr| notify::send(&addr, pid, state, fds))
                    .map(|()| true),
            }
        };

        if unset_environment {
            notify::unset_environment();
        }

        debug!(?pid, n_fds = fds.len(), ?result, "notify");
        result
    }
}
