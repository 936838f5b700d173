//! Forwarding to `libsystemd.so`.

use crate::backend::JournalBackend;
use crate::flags::ScopeFlags;
use libc::{c_char, c_int, c_void, iovec, size_t};
use sd_common::{Errno, Id128, check};
use std::ffi::CString;
use std::ptr::{self, NonNull};

#[repr(C)]
struct SdJournal {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct SdId128 {
    bytes: [u8; 16],
}

impl From<SdId128> for Id128 {
    fn from(id: SdId128) -> Self {
        Id128::from_bytes(id.bytes)
    }
}

impl From<Id128> for SdId128 {
    fn from(id: Id128) -> Self {
        SdId128 {
            bytes: *id.as_bytes(),
        }
    }
}

#[link(name = "systemd")]
unsafe extern "C" {
    fn sd_journal_open(ret: *mut *mut SdJournal, flags: c_int) -> c_int;
    fn sd_journal_close(j: *mut SdJournal);

    fn sd_journal_add_match(j: *mut SdJournal, data: *const c_void, size: size_t) -> c_int;
    fn sd_journal_add_conjunction(j: *mut SdJournal) -> c_int;
    fn sd_journal_add_disjunction(j: *mut SdJournal) -> c_int;
    fn sd_journal_flush_matches(j: *mut SdJournal);

    fn sd_journal_seek_head(j: *mut SdJournal) -> c_int;
    fn sd_journal_seek_tail(j: *mut SdJournal) -> c_int;
    fn sd_journal_seek_monotonic_usec(j: *mut SdJournal, boot_id: SdId128, usec: u64) -> c_int;
    fn sd_journal_seek_realtime_usec(j: *mut SdJournal, usec: u64) -> c_int;

    fn sd_journal_next(j: *mut SdJournal) -> c_int;
    fn sd_journal_previous(j: *mut SdJournal) -> c_int;

    fn sd_journal_get_data(
        j: *mut SdJournal,
        field: *const c_char,
        data: *mut *const c_void,
        length: *mut size_t,
    ) -> c_int;
    fn sd_journal_enumerate_data(
        j: *mut SdJournal,
        data: *mut *const c_void,
        length: *mut size_t,
    ) -> c_int;
    fn sd_journal_restart_data(j: *mut SdJournal);

    fn sd_journal_query_unique(j: *mut SdJournal, field: *const c_char) -> c_int;
    fn sd_journal_enumerate_unique(
        j: *mut SdJournal,
        data: *mut *const c_void,
        length: *mut size_t,
    ) -> c_int;
    fn sd_journal_restart_unique(j: *mut SdJournal);

    fn sd_journal_get_usage(j: *mut SdJournal, bytes: *mut u64) -> c_int;
    fn sd_journal_get_realtime_usec(j: *mut SdJournal, ret: *mut u64) -> c_int;
    fn sd_journal_get_monotonic_usec(
        j: *mut SdJournal,
        ret: *mut u64,
        ret_boot_id: *mut SdId128,
    ) -> c_int;

    fn sd_id128_get_boot(ret: *mut SdId128) -> c_int;
    fn sd_journal_sendv(iov: *const iovec, n: c_int) -> c_int;
}

/// An open `sd_journal` context. Not `Send`: libsystemd contexts belong to
/// the thread that opened them.
#[derive(Debug)]
pub struct JournalHandle(NonNull<SdJournal>);

impl JournalHandle {
    fn as_ptr(&self) -> *mut SdJournal {
        self.0.as_ptr()
    }
}

fn field_name(field: &str) -> Result<CString, Errno> {
    CString::new(field).map_err(|_| Errno::EINVAL)
}

/// Copies the `(data, length)` pair libsystemd returned. The buffer is owned
/// by the journal context and only valid until the next call on it.
///
/// # Safety
///
/// `data` must point to `length` readable bytes.
unsafe fn copy_data(data: *const c_void, length: size_t) -> Vec<u8> {
    if data.is_null() {
        return Vec::new();
    }

    // SAFETY: guaranteed by the caller.
    unsafe { std::slice::from_raw_parts(data.cast::<u8>(), length).to_vec() }
}

type EnumerateFn = unsafe extern "C" fn(*mut SdJournal, *mut *const c_void, *mut size_t) -> c_int;

fn enumerate(handle: &mut JournalHandle, f: EnumerateFn) -> Result<Option<Vec<u8>>, Errno> {
    let mut data = ptr::null();
    let mut length = 0;

    // SAFETY: the handle is open and both out pointers are valid.
    let r = check(unsafe { f(handle.as_ptr(), &mut data, &mut length) })?;
    if r == 0 {
        return Ok(None);
    }

    // SAFETY: on success libsystemd stores a buffer of `length` bytes.
    Ok(Some(unsafe { copy_data(data, length) }))
}

/// Calls into libsystemd for every journal primitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct Libsystemd;

impl JournalBackend for Libsystemd {
    type Handle = JournalHandle;

    fn open(&self, flags: ScopeFlags) -> Result<JournalHandle, Errno> {
        let mut j = ptr::null_mut();
        let flags = c_int::try_from(flags.bits()).map_err(|_| Errno::EINVAL)?;

        // SAFETY: `j` is a valid out pointer.
        check(unsafe { sd_journal_open(&mut j, flags) })?;
        NonNull::new(j).map(JournalHandle).ok_or(Errno::ENOMEM)
    }

    fn close(&self, handle: JournalHandle) {
        // SAFETY: the handle is consumed, so the context is closed once.
        unsafe { sd_journal_close(handle.as_ptr()) };
    }

    fn add_match(&self, handle: &mut JournalHandle, data: &[u8]) -> Result<(), Errno> {
        // SAFETY: `data` is valid for `data.len()` bytes; libsystemd copies it.
        check(unsafe { sd_journal_add_match(handle.as_ptr(), data.as_ptr().cast(), data.len()) })?;
        Ok(())
    }

    fn add_conjunction(&self, handle: &mut JournalHandle) -> Result<(), Errno> {
        // SAFETY: the handle is open.
        check(unsafe { sd_journal_add_conjunction(handle.as_ptr()) })?;
        Ok(())
    }

    fn add_disjunction(&self, handle: &mut JournalHandle) -> Result<(), Errno> {
        // SAFETY: the handle is open.
        check(unsafe { sd_journal_add_disjunction(handle.as_ptr()) })?;
        Ok(())
    }

    fn flush_matches(&self, handle: &mut JournalHandle) {
        // SAFETY: the handle is open.
        unsafe { sd_journal_flush_matches(handle.as_ptr()) };
    }

    fn seek_head(&self, handle: &mut JournalHandle) -> Result<(), Errno> {
        // SAFETY: the handle is open.
        check(unsafe { sd_journal_seek_head(handle.as_ptr()) })?;
        Ok(())
    }

    fn seek_tail(&self, handle: &mut JournalHandle) -> Result<(), Errno> {
        // SAFETY: the handle is open.
        check(unsafe { sd_journal_seek_tail(handle.as_ptr()) })?;
        Ok(())
    }

    fn seek_monotonic_usec(
        &self,
        handle: &mut JournalHandle,
        boot_id: Id128,
        usec: u64,
    ) -> Result<(), Errno> {
        // SAFETY: the handle is open; the id is passed by value.
        check(unsafe { sd_journal_seek_monotonic_usec(handle.as_ptr(), boot_id.into(), usec) })?;
        Ok(())
    }

    fn seek_realtime_usec(&self, handle: &mut JournalHandle, usec: u64) -> Result<(), Errno> {
        // SAFETY: the handle is open.
        check(unsafe { sd_journal_seek_realtime_usec(handle.as_ptr(), usec) })?;
        Ok(())
    }

    fn next(&self, handle: &mut JournalHandle) -> Result<usize, Errno> {
        // SAFETY: the handle is open.
        let r = check(unsafe { sd_journal_next(handle.as_ptr()) })?;
        Ok(r as usize)
    }

    fn previous(&self, handle: &mut JournalHandle) -> Result<usize, Errno> {
        // SAFETY: the handle is open.
        let r = check(unsafe { sd_journal_previous(handle.as_ptr()) })?;
        Ok(r as usize)
    }

    fn get_data(&self, handle: &mut JournalHandle, field: &str) -> Result<Vec<u8>, Errno> {
        let field = field_name(field)?;
        let mut data = ptr::null();
        let mut length = 0;

        // SAFETY: `field` is NUL terminated and the out pointers are valid.
        check(unsafe {
            sd_journal_get_data(handle.as_ptr(), field.as_ptr(), &mut data, &mut length)
        })?;

        // SAFETY: on success libsystemd stores a buffer of `length` bytes.
        Ok(unsafe { copy_data(data, length) })
    }

    fn enumerate_data(&self, handle: &mut JournalHandle) -> Result<Option<Vec<u8>>, Errno> {
        enumerate(handle, sd_journal_enumerate_data)
    }

    fn restart_data(&self, handle: &mut JournalHandle) {
        // SAFETY: the handle is open.
        unsafe { sd_journal_restart_data(handle.as_ptr()) };
    }

    fn query_unique(&self, handle: &mut JournalHandle, field: &str) -> Result<(), Errno> {
        let field = field_name(field)?;

        // SAFETY: `field` is NUL terminated; libsystemd copies it.
        check(unsafe { sd_journal_query_unique(handle.as_ptr(), field.as_ptr()) })?;
        Ok(())
    }

    fn enumerate_unique(&self, handle: &mut JournalHandle) -> Result<Option<Vec<u8>>, Errno> {
        enumerate(handle, sd_journal_enumerate_unique)
    }

    fn restart_unique(&self, handle: &mut JournalHandle) {
        // SAFETY: the handle is open.
        unsafe { sd_journal_restart_unique(handle.as_ptr()) };
    }

    fn get_usage(&self, handle: &mut JournalHandle) -> Result<u64, Errno> {
        let mut bytes = 0;

        // SAFETY: the out pointer is valid.
        check(unsafe { sd_journal_get_usage(handle.as_ptr(), &mut bytes) })?;
        Ok(bytes)
    }

    fn get_realtime_usec(&self, handle: &mut JournalHandle) -> Result<u64, Errno> {
        let mut usec = 0;

        // SAFETY: the out pointer is valid.
        check(unsafe { sd_journal_get_realtime_usec(handle.as_ptr(), &mut usec) })?;
        Ok(usec)
    }

    fn get_monotonic_usec(&self, handle: &mut JournalHandle) -> Result<(u64, Id128), Errno> {
        let mut usec = 0;
        let mut boot_id = SdId128::default();

        // SAFETY: both out pointers are valid.
        check(unsafe {
            sd_journal_get_monotonic_usec(handle.as_ptr(), &mut usec, &mut boot_id)
        })?;
        Ok((usec, boot_id.into()))
    }

    fn boot_id(&self) -> Result<Id128, Errno> {
        let mut id = SdId128::default();

        // SAFETY: the out pointer is valid.
        check(unsafe { sd_id128_get_boot(&mut id) })?;
        Ok(id.into())
    }

    fn send(&self, fields: &[&[u8]]) -> Result<(), Errno> {
        let iov: Vec<iovec> = fields
            .iter()
            .map(|field| iovec {
                iov_base: field.as_ptr() as *mut c_void,
                iov_len: field.len(),
            })
            .collect();
        let n = c_int::try_from(iov.len()).map_err(|_| Errno::E2BIG)?;

        // SAFETY: every iovec points into a slice that outlives the call;
        // libsystemd only reads through them.
        check(unsafe { sd_journal_sendv(iov.as_ptr(), n) })?;
        Ok(())
    }
}
