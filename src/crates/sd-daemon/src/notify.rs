//! The `NOTIFY_SOCKET` datagram protocol.

use nix::errno::Errno;
use nix::sys::socket::{
    AddressFamily, ControlMessage, MsgFlags, SockFlag, SockType, UnixAddr, UnixCredentials,
    sendmsg, socket,
};
use nix::unistd::{Pid, getgid, getpid, getuid};
use std::ffi::OsStr;
use std::io::IoSlice;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

pub(crate) const NOTIFY_SOCKET: &str = "NOTIFY_SOCKET";

/// Parses a `NOTIFY_SOCKET` value: a filesystem path or an abstract name
/// introduced by `@`.
pub(crate) fn parse_address(raw: &OsStr) -> Result<UnixAddr, Errno> {
    let bytes = raw.as_bytes();
    if bytes.len() < 2 {
        return Err(Errno::EINVAL);
    }

    match bytes[0] {
        b'/' => UnixAddr::new(Path::new(raw)),
        b'@' => UnixAddr::new_abstract(&bytes[1..]),
        _ => Err(Errno::EAFNOSUPPORT),
    }
}

/// Sends one notification datagram to `addr`.
///
/// Descriptors travel as `SCM_RIGHTS`. A `pid` other than our own is sent as
/// `SCM_CREDENTIALS`, which the kernel only accepts from privileged senders.
pub(crate) fn send(
    addr: &UnixAddr,
    pid: Option<Pid>,
    state: &str,
    fds: &[RawFd],
) -> Result<(), Errno> {
    let sock = socket(
        AddressFamily::Unix,
        SockType::Datagram,
        SockFlag::SOCK_CLOEXEC,
        None,
    )?;

    let iov = [IoSlice::new(state.as_bytes())];

    let credentials;
    let mut cmsgs = Vec::with_capacity(2);

    if !fds.is_empty() {
        cmsgs.push(ControlMessage::ScmRights(fds));
    }

    if let Some(pid) = pid.filter(|pid| *pid != getpid()) {
        credentials = UnixCredentials::from(libc::ucred {
            pid: pid.as_raw(),
            uid: getuid().as_raw(),
            gid: getgid().as_raw(),
        });
        cmsgs.push(ControlMessage::ScmCredentials(&credentials));
    }

    sendmsg(
        sock.as_raw_fd(),
        &iov,
        &cmsgs,
        MsgFlags::MSG_NOSIGNAL,
        Some(addr),
    )?;

    Ok(())
}

pub(crate) fn unset_environment() {
    // SAFETY: only done on explicit request; like sd_notify(3) this must run
    // before other threads read the environment.
    unsafe {
        std::env::remove_var(NOTIFY_SOCKET);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixDatagram;

    #[test]
    fn relative_addresses_are_rejected() {
        assert_eq!(
            parse_address(OsStr::new("run/notify")).unwrap_err(),
            Errno::EAFNOSUPPORT
        );
        assert_eq!(parse_address(OsStr::new("/")).unwrap_err(), Errno::EINVAL);
    }

    #[test]
    fn abstract_addresses_drop_the_marker() {
        let addr = parse_address(OsStr::new("@sd-notify-test")).unwrap();
        assert_eq!(addr.as_abstract(), Some(&b"sd-notify-test"[..]));
    }

    #[test]
    fn state_reaches_the_listener() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notify.sock");
        let listener = UnixDatagram::bind(&path).unwrap();

        let addr = parse_address(path.as_os_str()).unwrap();
        send(&addr, None, "READY=1\nSTATUS=serving", &[]).unwrap();

        let mut buf = [0u8; 64];
        let n = listener.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"READY=1\nSTATUS=serving");
    }

    #[test]
    fn own_pid_does_not_need_credentials() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notify.sock");
        let listener = UnixDatagram::bind(&path).unwrap();

        let addr = parse_address(path.as_os_str()).unwrap();
        send(&addr, Some(getpid()), "WATCHDOG=1", &[]).unwrap();

        let mut buf = [0u8; 16];
        let n = listener.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"WATCHDOG=1");
    }

    #[test]
    fn descriptors_travel_with_the_message() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notify.sock");
        let listener = UnixDatagram::bind(&path).unwrap();
        let file = std::fs::File::create(dir.path().join("store")).unwrap();

        let addr = parse_address(path.as_os_str()).unwrap();
        send(&addr, None, "FDSTORE=1", &[file.as_raw_fd()]).unwrap();

        let mut buf = [0u8; 16];
        let n = listener.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"FDSTORE=1");
    }

    #[test]
    fn missing_listener_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let addr = parse_address(dir.path().join("absent.sock").as_os_str()).unwrap();
        assert!(send(&addr, None, "READY=1", &[]).is_err());
    }
}
