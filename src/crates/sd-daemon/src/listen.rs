//! The `LISTEN_PID` / `LISTEN_FDS` / `LISTEN_FDNAMES` environment protocol.

use crate::LISTEN_FDS_START;
use nix::errno::Errno;
use nix::unistd::Pid;
use std::os::fd::RawFd;

pub(crate) const LISTEN_PID: &str = "LISTEN_PID";
pub(crate) const LISTEN_FDS: &str = "LISTEN_FDS";
pub(crate) const LISTEN_FDNAMES: &str = "LISTEN_FDNAMES";

const UNKNOWN_NAME: &str = "unknown";

/// A snapshot of the activation variables.
#[derive(Debug, Default, Clone)]
pub(crate) struct ListenEnv {
    pub pid: Option<String>,
    pub fds: Option<String>,
    pub names: Option<String>,
}

impl ListenEnv {
    pub fn from_process() -> Self {
        Self {
            pid: std::env::var(LISTEN_PID).ok(),
            fds: std::env::var(LISTEN_FDS).ok(),
            names: std::env::var(LISTEN_FDNAMES).ok(),
        }
    }

    /// Number of descriptors addressed to `own_pid`.
    ///
    /// Descriptors meant for another process (the variables were inherited
    /// across a fork/exec) count as zero.
    pub fn count(&self, own_pid: Pid) -> Result<usize, Errno> {
        let Some(pid) = self.pid.as_deref() else {
            return Ok(0);
        };

        let pid: i32 = pid.trim().parse().map_err(|_| Errno::EINVAL)?;
        if pid != own_pid.as_raw() {
            return Ok(0);
        }

        let Some(fds) = self.fds.as_deref() else {
            return Ok(0);
        };

        let n: usize = fds.trim().parse().map_err(|_| Errno::EINVAL)?;
        if (LISTEN_FDS_START as usize)
            .checked_add(n)
            .is_none_or(|end| end > RawFd::MAX as usize)
        {
            return Err(Errno::EINVAL);
        }

        Ok(n)
    }

    /// Activation names for `n` descriptors.
    pub fn names(&self, n: usize) -> Result<Vec<String>, Errno> {
        let Some(names) = self.names.as_deref() else {
            return Ok(vec![String::from(UNKNOWN_NAME); n]);
        };

        let names: Vec<String> = names.split(':').map(String::from).collect();
        if names.len() != n {
            return Err(Errno::EINVAL);
        }

        Ok(names)
    }
}

pub(crate) fn unset_environment() {
    // SAFETY: the caller asked for the variables to be consumed; like
    // sd_listen_fds(3) this must run before other threads read the
    // environment.
    unsafe {
        std::env::remove_var(LISTEN_PID);
        std::env::remove_var(LISTEN_FDS);
        std::env::remove_var(LISTEN_FDNAMES);
    }
}

/// Marks the `n` inherited descriptors close-on-exec.
pub(crate) fn set_cloexec(n: usize) -> Result<(), Errno> {
    for fd in LISTEN_FDS_START..LISTEN_FDS_START + n as RawFd {
        // SAFETY: fcntl on an arbitrary descriptor number is memory safe; a
        // descriptor that is not open reports EBADF.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        if flags < 0 {
            return Err(Errno::last());
        }

        if flags & libc::FD_CLOEXEC != 0 {
            continue;
        }

        // SAFETY: as above.
        if unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) } < 0 {
            return Err(Errno::last());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pid: Option<&str>, fds: Option<&str>, names: Option<&str>) -> ListenEnv {
        ListenEnv {
            pid: pid.map(String::from),
            fds: fds.map(String::from),
            names: names.map(String::from),
        }
    }

    const ME: Pid = Pid::from_raw(4242);

    #[test]
    fn no_variables_means_no_descriptors() {
        assert_eq!(ListenEnv::default().count(ME), Ok(0));
    }

    #[test]
    fn descriptors_for_another_process_are_ignored() {
        let e = env(Some("1"), Some("3"), None);
        assert_eq!(e.count(ME), Ok(0));
    }

    #[test]
    fn descriptors_for_this_process_are_counted() {
        let e = env(Some("4242"), Some("2"), None);
        assert_eq!(e.count(ME), Ok(2));
    }

    #[test]
    fn malformed_variables_are_einval() {
        assert_eq!(env(Some("pid"), Some("2"), None).count(ME), Err(Errno::EINVAL));
        assert_eq!(env(Some("4242"), Some("two"), None).count(ME), Err(Errno::EINVAL));
        assert_eq!(env(Some("4242"), Some("-1"), None).count(ME), Err(Errno::EINVAL));
    }

    #[test]
    fn missing_names_default_to_unknown() {
        let e = env(Some("4242"), Some("2"), None);
        assert_eq!(e.names(2).unwrap(), vec!["unknown", "unknown"]);
    }

    #[test]
    fn names_are_split_on_colons() {
        let e = env(Some("4242"), Some("3"), Some("http:https:"));
        assert_eq!(e.names(3).unwrap(), vec!["http", "https", ""]);
    }

    #[test]
    fn name_count_must_match() {
        let e = env(Some("4242"), Some("2"), Some("http"));
        assert_eq!(e.names(2), Err(Errno::EINVAL));
    }
}
