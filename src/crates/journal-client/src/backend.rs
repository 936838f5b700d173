use crate::flags::ScopeFlags;
use sd_common::{Errno, Id128};

/// The log-store operations a [`JournalSession`](crate::JournalSession) is
/// built on.
///
/// The methods mirror the `sd_journal_*` calls one to one. Every fallible
/// call reports the errno the store produced; translating it into
/// [`sd_common::Error`] is the session's job.
///
/// Contract:
/// - `close` is called at most once per handle, and no other method is called
///   with that handle afterwards;
/// - `next`/`previous` return the number of entries moved (0 or 1);
/// - moving the entry cursor resets the data enumeration to the first field
///   of the new entry;
/// - enumeration methods return `Ok(None)` once exhausted;
/// - data and unique values are returned as raw `FIELD=value` records.
pub trait JournalBackend {
    /// An open connection to the store.
    type Handle;

    fn open(&self, flags: ScopeFlags) -> Result<Self::Handle, Errno>;
    fn close(&self, handle: Self::Handle);

    fn add_match(&self, handle: &mut Self::Handle, data: &[u8]) -> Result<(), Errno>;
    fn add_conjunction(&self, handle: &mut Self::Handle) -> Result<(), Errno>;
    fn add_disjunction(&self, handle: &mut Self::Handle) -> Result<(), Errno>;
    fn flush_matches(&self, handle: &mut Self::Handle);

    fn seek_head(&self, handle: &mut Self::Handle) -> Result<(), Errno>;
    fn seek_tail(&self, handle: &mut Self::Handle) -> Result<(), Errno>;
    fn seek_monotonic_usec(
        &self,
        handle: &mut Self::Handle,
        boot_id: Id128,
        usec: u64,
    ) -> Result<(), Errno>;
    fn seek_realtime_usec(&self, handle: &mut Self::Handle, usec: u64) -> Result<(), Errno>;

    fn next(&self, handle: &mut Self::Handle) -> Result<usize, Errno>;
    fn previous(&self, handle: &mut Self::Handle) -> Result<usize, Errno>;

    fn get_data(&self, handle: &mut Self::Handle, field: &str) -> Result<Vec<u8>, Errno>;
    fn enumerate_data(&self, handle: &mut Self::Handle) -> Result<Option<Vec<u8>>, Errno>;
    fn restart_data(&self, handle: &mut Self::Handle);

    fn query_unique(&self, handle: &mut Self::Handle, field: &str) -> Result<(), Errno>;
    fn enumerate_unique(&self, handle: &mut Self::Handle) -> Result<Option<Vec<u8>>, Errno>;
    fn restart_unique(&self, handle: &mut Self::Handle);

    fn get_usage(&self, handle: &mut Self::Handle) -> Result<u64, Errno>;
    fn get_realtime_usec(&self, handle: &mut Self::Handle) -> Result<u64, Errno>;
    fn get_monotonic_usec(&self, handle: &mut Self::Handle) -> Result<(u64, Id128), Errno>;

    /// Boot id of the running system.
    fn boot_id(&self) -> Result<Id128, Errno>;

    /// Writes one entry made of `KEY=VALUE` records.
    fn send(&self, fields: &[&[u8]]) -> Result<(), Errno>;
}
