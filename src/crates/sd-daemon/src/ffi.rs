//! Forwarding to `libsystemd.so`.

use crate::backend::ActivationBackend;
use libc::{c_char, c_int, c_uint, pid_t};
use nix::errno::Errno;
use nix::unistd::Pid;
use sd_common::check;
use std::ffi::{CStr, CString};
use std::os::fd::RawFd;

#[link(name = "systemd")]
unsafe extern "C" {
    fn sd_listen_fds(unset_environment: c_int) -> c_int;
    fn sd_listen_fds_with_names(unset_environment: c_int, names: *mut *mut *mut c_char) -> c_int;
    fn sd_booted() -> c_int;
    fn sd_pid_notify_with_fds(
        pid: pid_t,
        unset_environment: c_int,
        state: *const c_char,
        fds: *const c_int,
        n_fds: c_uint,
    ) -> c_int;
}

/// Calls into libsystemd for every activation primitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct Libsystemd;

impl ActivationBackend for Libsystemd {
    fn listen_fds(&self, unset_environment: bool) -> Result<usize, Errno> {
        // SAFETY: no pointer arguments.
        let n = check(unsafe { sd_listen_fds(c_int::from(unset_environment)) })?;
        Ok(n as usize)
    }

    fn listen_fds_with_names(&self, unset_environment: bool) -> Result<Vec<String>, Errno> {
        let mut names: *mut *mut c_char = std::ptr::null_mut();

        // SAFETY: `names` is a valid out pointer; on success libsystemd
        // stores a malloc'ed array of `n` malloc'ed strings in it.
        let n = check(unsafe {
            sd_listen_fds_with_names(c_int::from(unset_environment), &mut names)
        })? as usize;

        if names.is_null() {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            // SAFETY: `i < n` and the array holds `n` entries. Each string is
            // copied before it is freed, and freed exactly once.
            unsafe {
                let name = *names.add(i);
                out.push(CStr::from_ptr(name).to_string_lossy().into_owned());
                libc::free(name.cast());
            }
        }

        // SAFETY: the array itself was malloc'ed by libsystemd and is not
        // referenced after this point.
        unsafe { libc::free(names.cast()) };

        Ok(out)
    }

    fn booted(&self) -> bool {
        // SAFETY: no arguments.
        unsafe { sd_booted() > 0 }
    }

    fn notify(
        &self,
        pid: Option<Pid>,
        unset_environment: bool,
        state: &str,
        fds: &[RawFd],
    ) -> Result<bool, Errno> {
        let state = CString::new(state).map_err(|_| Errno::EINVAL)?;
        let n_fds = c_uint::try_from(fds.len()).map_err(|_| Errno::E2BIG)?;

        // SAFETY: `state` is NUL terminated and `fds` holds `n_fds` entries;
        // both outlive the call.
        let r = check(unsafe {
            sd_pid_notify_with_fds(
                pid.map_or(0, Pid::as_raw),
                c_int::from(unset_environment),
                state.as_ptr(),
                fds.as_ptr(),
                n_fds,
            )
        })?;

        Ok(r > 0)
    }
}
