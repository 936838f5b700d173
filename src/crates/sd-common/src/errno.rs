//! Translation of the C return-code convention.
//!
//! Every libsystemd call returns a signed integer: non-negative on success,
//! `-errno` on failure. [`check`] is the single place where that convention
//! becomes a `Result`.

use libc::c_int;
use nix::errno::Errno;

/// Converts a libsystemd-style return code into a `Result`.
///
/// Non-negative values are passed through unchanged so callers can use them
/// as counts (`sd_journal_next` returns 0 or 1, `sd_listen_fds` returns the
/// number of descriptors).
pub fn check(r: c_int) -> Result<c_int, Errno> {
    if r < 0 {
        Err(Errno::from_raw(r.saturating_neg()))
    } else {
        Ok(r)
    }
}

/// Maps an I/O error to the errno it carries, defaulting to `EIO`.
pub fn from_io(err: &std::io::Error) -> Errno {
    err.raw_os_error().map(Errno::from_raw).unwrap_or(Errno::EIO)
}
