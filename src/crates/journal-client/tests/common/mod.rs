//! Shared fixtures for the journal-client integration tests.

#![allow(dead_code)]

use journal_client::{
    EntryOrigin, Errno, Id128, JournalBackend, MemoryHandle, MemoryJournal, NewEntry, ScopeFlags,
};
use std::cell::RefCell;
use std::rc::Rc;

pub const BOOT_A: Id128 = Id128::from_u128(0xaaaa_aaaa_aaaa_aaaa_aaaa_aaaa_aaaa_aaaa);
pub const BOOT_B: Id128 = Id128::from_u128(0xbbbb_bbbb_bbbb_bbbb_bbbb_bbbb_bbbb_bbbb);

/// Routes library events to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
        .try_init();
}

/// Test journal entry specification
pub struct TestEntry {
    pub realtime: u64,
    pub fields: Vec<(String, String)>,
}

impl TestEntry {
    pub fn new(realtime: u64) -> Self {
        Self {
            realtime,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// A journal filled with `entries`, all on boot A.
pub fn journal_with(entries: Vec<TestEntry>) -> MemoryJournal {
    let journal = MemoryJournal::new(BOOT_A);
    for entry in entries {
        let mut new = NewEntry::new(entry.realtime).with_origin(EntryOrigin::system());
        for (name, value) in &entry.fields {
            new = new.field(name, value);
        }
        journal.append(new);
    }
    journal
}

/// Six entries from two units at two priorities, one second apart.
pub fn sample_journal() -> MemoryJournal {
    journal_with(vec![
        TestEntry::new(1_000_000)
            .with_field("_SYSTEMD_UNIT", "sshd.service")
            .with_field("PRIORITY", "6")
            .with_field("MESSAGE", "accepted key"),
        TestEntry::new(2_000_000)
            .with_field("_SYSTEMD_UNIT", "cron.service")
            .with_field("PRIORITY", "6")
            .with_field("MESSAGE", "job started"),
        TestEntry::new(3_000_000)
            .with_field("_SYSTEMD_UNIT", "sshd.service")
            .with_field("PRIORITY", "3")
            .with_field("MESSAGE", "connection reset"),
        TestEntry::new(4_000_000)
            .with_field("_SYSTEMD_UNIT", "cron.service")
            .with_field("PRIORITY", "3")
            .with_field("MESSAGE", "job failed"),
        TestEntry::new(5_000_000)
            .with_field("_SYSTEMD_UNIT", "sshd.service")
            .with_field("PRIORITY", "6")
            .with_field("MESSAGE", "session closed"),
        TestEntry::new(6_000_000)
            .with_field("_SYSTEMD_UNIT", "nginx.service")
            .with_field("PRIORITY", "4")
            .with_field("MESSAGE", "slow upstream"),
    ])
}

/// Forwards to a [`MemoryJournal`] and records the name of every backend
/// call.
#[derive(Debug, Clone)]
pub struct Recording {
    pub inner: MemoryJournal,
    calls: Rc<RefCell<Vec<&'static str>>>,
    pub fail_open: Option<Errno>,
}

impl Recording {
    pub fn new(inner: MemoryJournal) -> Self {
        Self {
            inner,
            calls: Rc::default(),
            fail_open: None,
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|c| **c == name).count()
    }

    fn record(&self, name: &'static str) {
        self.calls.borrow_mut().push(name);
    }
}

impl JournalBackend for Recording {
    type Handle = MemoryHandle;

    fn open(&self, flags: ScopeFlags) -> Result<MemoryHandle, Errno> {
        self.record("open");
        match self.fail_open {
            Some(errno) => Err(errno),
            None => self.inner.open(flags),
        }
    }

    fn close(&self, handle: MemoryHandle) {
        self.record("close");
        self.inner.close(handle)
    }

    fn add_match(&self, handle: &mut MemoryHandle, data: &[u8]) -> Result<(), Errno> {
        self.record("add_match");
        self.inner.add_match(handle, data)
    }

    fn add_conjunction(&self, handle: &mut MemoryHandle) -> Result<(), Errno> {
        self.record("add_conjunction");
        self.inner.add_conjunction(handle)
    }

    fn add_disjunction(&self, handle: &mut MemoryHandle) -> Result<(), Errno> {
        self.record("add_disjunction");
        self.inner.add_disjunction(handle)
    }

    fn flush_matches(&self, handle: &mut MemoryHandle) {
        self.record("flush_matches");
        self.inner.flush_matches(handle)
    }

    fn seek_head(&self, handle: &mut MemoryHandle) -> Result<(), Errno> {
        self.record("seek_head");
        self.inner.seek_head(handle)
    }

    fn seek_tail(&self, handle: &mut MemoryHandle) -> Result<(), Errno> {
        self.record("seek_tail");
        self.inner.seek_tail(handle)
    }

    fn seek_monotonic_usec(
        &self,
        handle: &mut MemoryHandle,
        boot_id: Id128,
        usec: u64,
    ) -> Result<(), Errno> {
        self.record("seek_monotonic_usec");
        self.inner.seek_monotonic_usec(handle, boot_id, usec)
    }

    fn seek_realtime_usec(&self, handle: &mut MemoryHandle, usec: u64) -> Result<(), Errno> {
        self.record("seek_realtime_usec");
        self.inner.seek_realtime_usec(handle, usec)
    }

    fn next(&self, handle: &mut MemoryHandle) -> Result<usize, Errno> {
        self.record("next");
        self.inner.next(handle)
    }

    fn previous(&self, handle: &mut MemoryHandle) -> Result<usize, Errno> {
        self.record("previous");
        self.inner.previous(handle)
    }

    fn get_data(&self, handle: &mut MemoryHandle, field: &str) -> Result<Vec<u8>, Errno> {
        self.record("get_data");
        self.inner.get_data(handle, field)
    }

    fn enumerate_data(&self, handle: &mut MemoryHandle) -> Result<Option<Vec<u8>>, Errno> {
        self.record("enumerate_data");
        self.inner.enumerate_data(handle)
    }

    fn restart_data(&self, handle: &mut MemoryHandle) {
        self.record("restart_data");
        self.inner.restart_data(handle)
    }

    fn query_unique(&self, handle: &mut MemoryHandle, field: &str) -> Result<(), Errno> {
        self.record("query_unique");
        self.inner.query_unique(handle, field)
    }

    fn enumerate_unique(&self, handle: &mut MemoryHandle) -> Result<Option<Vec<u8>>, Errno> {
        self.record("enumerate_unique");
        self.inner.enumerate_unique(handle)
    }

    fn restart_unique(&self, handle: &mut MemoryHandle) {
        self.record("restart_unique");
        self.inner.restart_unique(handle)
    }

    fn get_usage(&self, handle: &mut MemoryHandle) -> Result<u64, Errno> {
        self.record("get_usage");
        self.inner.get_usage(handle)
    }

    fn get_realtime_usec(&self, handle: &mut MemoryHandle) -> Result<u64, Errno> {
        self.record("get_realtime_usec");
        self.inner.get_realtime_usec(handle)
    }

    fn get_monotonic_usec(&self, handle: &mut MemoryHandle) -> Result<(u64, Id128), Errno> {
        self.record("get_monotonic_usec");
        self.inner.get_monotonic_usec(handle)
    }

    fn boot_id(&self) -> Result<Id128, Errno> {
        self.record("boot_id");
        self.inner.boot_id()
    }

    fn send(&self, fields: &[&[u8]]) -> Result<(), Errno> {
        self.record("send");
        self.inner.send(fields)
    }
}
