//! A journal kept in process memory.
//!
//! [`MemoryJournal`] implements [`JournalBackend`] with the cursor, match and
//! enumeration behaviour of `sd-journal`, without touching the system. It is
//! a cheap handle onto a shared store: clones see the same entries, and
//! sessions opened on any clone observe entries appended later.

mod cursor;
mod filter;

use crate::backend::JournalBackend;
use crate::flags::ScopeFlags;
use crate::session::Direction;
use cursor::{EntryKey, Location};
use filter::{MatchTree, field_name_is_valid, split_term};
use nix::time::{ClockId, clock_gettime};
use parking_lot::RwLock;
use sd_common::{Errno, HashSet, Id128};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

/// Where an entry was recorded, as far as scope flags are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOrigin {
    /// Generated on this machine, as opposed to received from a remote one.
    pub local: bool,
    /// Stored in volatile storage.
    pub runtime: bool,
    /// Logged by the current user rather than by the system.
    pub user: bool,
}

impl Default for EntryOrigin {
    fn default() -> Self {
        Self::system()
    }
}

impl EntryOrigin {
    pub const fn system() -> Self {
        Self {
            local: true,
            runtime: false,
            user: false,
        }
    }

    pub const fn user() -> Self {
        Self {
            local: true,
            runtime: false,
            user: true,
        }
    }

    pub const fn runtime(self) -> Self {
        Self {
            runtime: true,
            ..self
        }
    }

    pub const fn remote(self) -> Self {
        Self {
            local: false,
            ..self
        }
    }

    fn visible(&self, flags: ScopeFlags) -> bool {
        if flags.contains(ScopeFlags::LOCAL_ONLY) && !self.local {
            return false;
        }

        if flags.contains(ScopeFlags::RUNTIME_ONLY) && !self.runtime {
            return false;
        }

        let scope = flags & (ScopeFlags::SYSTEM | ScopeFlags::CURRENT_USER);
        if scope.is_empty() {
            return true;
        }

        if self.user {
            scope.contains(ScopeFlags::CURRENT_USER)
        } else {
            scope.contains(ScopeFlags::SYSTEM)
        }
    }
}

/// An entry to append with [`MemoryJournal::append`].
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    realtime: u64,
    monotonic: Option<u64>,
    boot_id: Option<Id128>,
    origin: EntryOrigin,
    records: Vec<Vec<u8>>,
}

impl NewEntry {
    pub fn new(realtime_usec: u64) -> Self {
        Self {
            realtime: realtime_usec,
            ..Default::default()
        }
    }

    /// Defaults to the realtime timestamp.
    pub fn with_monotonic(mut self, usec: u64) -> Self {
        self.monotonic = Some(usec);
        self
    }

    /// Defaults to the journal's boot id.
    pub fn with_boot_id(mut self, boot_id: Id128) -> Self {
        self.boot_id = Some(boot_id);
        self
    }

    pub fn with_origin(mut self, origin: EntryOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Appends a `key=value` record.
    pub fn field(mut self, key: &str, value: impl AsRef<[u8]>) -> Self {
        let mut record = Vec::with_capacity(key.len() + 1 + value.as_ref().len());
        record.extend_from_slice(key.as_bytes());
        record.push(b'=');
        record.extend_from_slice(value.as_ref());
        self.records.push(record);
        self
    }

    /// Appends a record verbatim, without checking its shape.
    pub fn raw(mut self, record: impl Into<Vec<u8>>) -> Self {
        self.records.push(record.into());
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StoredEntry {
    pub seqnum: u64,
    pub realtime: u64,
    pub monotonic: u64,
    pub boot_id: Id128,
    pub origin: EntryOrigin,
    pub records: Vec<Vec<u8>>,
}

impl StoredEntry {
    pub(crate) fn key(&self) -> EntryKey {
        EntryKey {
            realtime: self.realtime,
            seqnum: self.seqnum,
        }
    }

    pub(crate) fn has_record(&self, record: &[u8]) -> bool {
        self.records.iter().any(|r| r == record)
    }

    /// First record of `field`.
    fn record(&self, field: &[u8]) -> Option<&[u8]> {
        self.records
            .iter()
            .find(|r| r.len() > field.len() && r.starts_with(field) && r[field.len()] == b'=')
            .map(Vec::as_slice)
    }

    fn size(&self) -> u64 {
        self.records.iter().map(|r| r.len() as u64).sum()
    }
}

#[derive(Debug)]
struct Store {
    boot_id: Id128,
    next_seqnum: u64,
    /// Sorted by [`EntryKey`].
    entries: Vec<StoredEntry>,
    open_handles: usize,
}

impl Store {
    fn entry(&self, key: EntryKey) -> Option<&StoredEntry> {
        self.entries
            .binary_search_by_key(&key, StoredEntry::key)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    fn insert(&mut self, entry: NewEntry) -> u64 {
        let seqnum = self.next_seqnum;
        self.next_seqnum += 1;

        let stored = StoredEntry {
            seqnum,
            realtime: entry.realtime,
            monotonic: entry.monotonic.unwrap_or(entry.realtime),
            boot_id: entry.boot_id.unwrap_or(self.boot_id),
            origin: entry.origin,
            records: entry.records,
        };

        let key = stored.key();
        let idx = self.entries.partition_point(|e| e.key() < key);
        self.entries.insert(idx, stored);
        seqnum
    }
}

/// Distinct values of one field, collected when the query is made.
#[derive(Debug)]
struct UniqueQuery {
    field: Vec<u8>,
    values: Vec<Vec<u8>>,
    next: usize,
}

/// Per-session state of a [`MemoryJournal`].
#[derive(Debug)]
pub struct MemoryHandle {
    flags: ScopeFlags,
    filter: MatchTree,
    location: Location,
    next_record: usize,
    unique: Option<UniqueQuery>,
}

impl MemoryHandle {
    fn accepts(&self, entry: &StoredEntry) -> bool {
        entry.origin.visible(self.flags) && (self.filter.is_empty() || self.filter.matches(entry))
    }
}

#[derive(Debug, Clone)]
pub struct MemoryJournal {
    store: Arc<RwLock<Store>>,
}

impl MemoryJournal {
    /// An empty journal whose entries default to `boot_id`.
    pub fn new(boot_id: Id128) -> Self {
        let store = Store {
            boot_id,
            next_seqnum: 1,
            entries: Vec::new(),
            open_handles: 0,
        };

        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// An empty journal for the running boot.
    pub fn for_current_boot() -> Result<Self, Errno> {
        Ok(Self::new(Id128::current_boot()?))
    }

    /// Adds an entry and returns its sequence number.
    pub fn append(&self, entry: NewEntry) -> u64 {
        let seqnum = self.store.write().insert(entry);
        trace!(seqnum, "appended entry");
        seqnum
    }

    pub fn len(&self) -> usize {
        self.store.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of handles opened and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.store.read().open_handles
    }

    fn current<'a>(store: &'a Store, handle: &MemoryHandle) -> Result<&'a StoredEntry, Errno> {
        handle
            .location
            .entry()
            .and_then(|key| store.entry(key))
            .ok_or(Errno::EADDRNOTAVAIL)
    }

    fn seek(&self, handle: &mut MemoryHandle, location: Location) {
        handle.location = location;
        handle.next_record = 0;
    }

    fn step(&self, handle: &mut MemoryHandle, direction: Direction) -> usize {
        let store = self.store.read();
        let found = handle
            .location
            .step(&store.entries, direction, |e| handle.accepts(e))
            .map(StoredEntry::key);

        match found {
            Some(key) => {
                handle.location = Location::Entry(key);
                handle.next_record = 0;
                1
            }
            None => 0,
        }
    }

    fn unique_values(&self, handle: &MemoryHandle, field: &[u8]) -> Vec<Vec<u8>> {
        let store = self.store.read();
        let mut seen = HashSet::default();
        let mut values = Vec::new();

        let visible = store.entries.iter().filter(|e| e.origin.visible(handle.flags));
        for entry in visible {
            for record in &entry.records {
                let is_field = record.len() > field.len()
                    && record.starts_with(field)
                    && record[field.len()] == b'=';

                if is_field && seen.insert(record.as_slice()) {
                    values.push(record.clone());
                }
            }
        }

        values
    }
}

fn realtime_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

fn monotonic_now() -> Result<u64, Errno> {
    let ts = clock_gettime(ClockId::CLOCK_MONOTONIC)?;
    Ok(ts.tv_sec() as u64 * 1_000_000 + ts.tv_nsec() as u64 / 1_000)
}

impl JournalBackend for MemoryJournal {
    type Handle = MemoryHandle;

    fn open(&self, flags: ScopeFlags) -> Result<MemoryHandle, Errno> {
        self.store.write().open_handles += 1;
        debug!(%flags, "memory journal opened");

        Ok(MemoryHandle {
            flags,
            filter: MatchTree::default(),
            location: Location::Head,
            next_record: 0,
            unique: None,
        })
    }

    fn close(&self, _handle: MemoryHandle) {
        let mut store = self.store.write();
        store.open_handles = store.open_handles.saturating_sub(1);
    }

    fn add_match(&self, handle: &mut MemoryHandle, data: &[u8]) -> Result<(), Errno> {
        handle.filter.add_match(data)
    }

    fn add_conjunction(&self, handle: &mut MemoryHandle) -> Result<(), Errno> {
        handle.filter.add_conjunction();
        Ok(())
    }

    fn add_disjunction(&self, handle: &mut MemoryHandle) -> Result<(), Errno> {
        handle.filter.add_disjunction();
        Ok(())
    }

    fn flush_matches(&self, handle: &mut MemoryHandle) {
        handle.filter.flush();
    }

    fn seek_head(&self, handle: &mut MemoryHandle) -> Result<(), Errno> {
        self.seek(handle, Location::Head);
        Ok(())
    }

    fn seek_tail(&self, handle: &mut MemoryHandle) -> Result<(), Errno> {
        self.seek(handle, Location::Tail);
        Ok(())
    }

    fn seek_monotonic_usec(
        &self,
        handle: &mut MemoryHandle,
        boot_id: Id128,
        usec: u64,
    ) -> Result<(), Errno> {
        self.seek(handle, Location::Monotonic(boot_id, usec));
        Ok(())
    }

    fn seek_realtime_usec(&self, handle: &mut MemoryHandle, usec: u64) -> Result<(), Errno> {
        self.seek(handle, Location::Realtime(usec));
        Ok(())
    }

    fn next(&self, handle: &mut MemoryHandle) -> Result<usize, Errno> {
        Ok(self.step(handle, Direction::Forward))
    }

    fn previous(&self, handle: &mut MemoryHandle) -> Result<usize, Errno> {
        Ok(self.step(handle, Direction::Backward))
    }

    fn get_data(&self, handle: &mut MemoryHandle, field: &str) -> Result<Vec<u8>, Errno> {
        if !field_name_is_valid(field.as_bytes()) {
            return Err(Errno::EINVAL);
        }

        let store = self.store.read();
        let entry = Self::current(&store, handle)?;
        entry
            .record(field.as_bytes())
            .map(<[u8]>::to_vec)
            .ok_or(Errno::ENOENT)
    }

    fn enumerate_data(&self, handle: &mut MemoryHandle) -> Result<Option<Vec<u8>>, Errno> {
        let store = self.store.read();
        let entry = Self::current(&store, handle)?;

        let record = entry.records.get(handle.next_record).cloned();
        if record.is_some() {
            handle.next_record += 1;
        }
        Ok(record)
    }

    fn restart_data(&self, handle: &mut MemoryHandle) {
        handle.next_record = 0;
    }

    fn query_unique(&self, handle: &mut MemoryHandle, field: &str) -> Result<(), Errno> {
        if !field_name_is_valid(field.as_bytes()) {
            return Err(Errno::EINVAL);
        }

        let field = field.as_bytes().to_vec();
        let values = self.unique_values(handle, &field);
        handle.unique = Some(UniqueQuery {
            field,
            values,
            next: 0,
        });
        Ok(())
    }

    fn enumerate_unique(&self, handle: &mut MemoryHandle) -> Result<Option<Vec<u8>>, Errno> {
        let Some(query) = handle.unique.as_mut() else {
            return Err(Errno::EINVAL);
        };

        let value = query.values.get(query.next).cloned();
        if value.is_some() {
            query.next += 1;
        }
        Ok(value)
    }

    fn restart_unique(&self, handle: &mut MemoryHandle) {
        let Some(field) = handle.unique.as_ref().map(|q| q.field.clone()) else {
            return;
        };

        // Pick up entries appended since the query was made.
        let values = self.unique_values(handle, &field);
        handle.unique = Some(UniqueQuery {
            field,
            values,
            next: 0,
        });
    }

    fn get_usage(&self, handle: &mut MemoryHandle) -> Result<u64, Errno> {
        let store = self.store.read();
        Ok(store
            .entries
            .iter()
            .filter(|e| e.origin.visible(handle.flags))
            .map(StoredEntry::size)
            .sum())
    }

    fn get_realtime_usec(&self, handle: &mut MemoryHandle) -> Result<u64, Errno> {
        let store = self.store.read();
        Self::current(&store, handle).map(|e| e.realtime)
    }

    fn get_monotonic_usec(&self, handle: &mut MemoryHandle) -> Result<(u64, Id128), Errno> {
        let store = self.store.read();
        Self::current(&store, handle).map(|e| (e.monotonic, e.boot_id))
    }

    fn boot_id(&self) -> Result<Id128, Errno> {
        Ok(self.store.read().boot_id)
    }

    fn send(&self, fields: &[&[u8]]) -> Result<(), Errno> {
        if fields.is_empty() {
            return Err(Errno::EINVAL);
        }

        let mut entry = NewEntry::new(realtime_now()).with_monotonic(monotonic_now()?);
        for field in fields {
            split_term(field)?;
            entry = entry.raw(*field);
        }

        let seqnum = self.append(entry);
        debug!(seqnum, fields = fields.len(), "entry sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal() -> MemoryJournal {
        MemoryJournal::new(Id128::from_u128(1))
    }

    #[test]
    fn entries_are_kept_in_realtime_order() {
        let journal = journal();
        journal.append(NewEntry::new(300).field("N", "c"));
        journal.append(NewEntry::new(100).field("N", "a"));
        journal.append(NewEntry::new(200).field("N", "b"));

        let store = journal.store.read();
        let order: Vec<u64> = store.entries.iter().map(|e| e.realtime).collect();
        assert_eq!(order, vec![100, 200, 300]);
    }

    #[test]
    fn scope_flags_filter_origins() {
        let remote = EntryOrigin::system().remote();
        let volatile = EntryOrigin::user().runtime();

        assert!(remote.visible(ScopeFlags::empty()));
        assert!(!remote.visible(ScopeFlags::LOCAL_ONLY));
        assert!(remote.visible(ScopeFlags::SYSTEM));

        assert!(volatile.visible(ScopeFlags::RUNTIME_ONLY));
        assert!(!volatile.visible(ScopeFlags::SYSTEM));
        assert!(volatile.visible(ScopeFlags::CURRENT_USER | ScopeFlags::LOCAL_ONLY));
        assert!(!EntryOrigin::system().visible(ScopeFlags::RUNTIME_ONLY));
    }

    #[test]
    fn field_access_needs_a_current_entry() {
        let journal = journal();
        journal.append(NewEntry::new(1).field("MESSAGE", "x"));

        let mut handle = journal.open(ScopeFlags::empty()).unwrap();
        assert_eq!(journal.get_data(&mut handle, "MESSAGE"), Err(Errno::EADDRNOTAVAIL));
        assert_eq!(journal.enumerate_data(&mut handle), Err(Errno::EADDRNOTAVAIL));

        assert_eq!(journal.next(&mut handle), Ok(1));
        assert_eq!(journal.get_data(&mut handle, "MESSAGE"), Ok(b"MESSAGE=x".to_vec()));
        assert_eq!(journal.get_data(&mut handle, "PRIORITY"), Err(Errno::ENOENT));
        assert_eq!(journal.get_data(&mut handle, "message"), Err(Errno::EINVAL));
        journal.close(handle);
    }

    #[test]
    fn field_lookup_does_not_match_prefixes() {
        let journal = journal();
        journal.append(NewEntry::new(1).field("MESSAGE_ID", "id").field("MESSAGE", "m"));

        let mut handle = journal.open(ScopeFlags::empty()).unwrap();
        journal.next(&mut handle).unwrap();
        assert_eq!(journal.get_data(&mut handle, "MESSAGE"), Ok(b"MESSAGE=m".to_vec()));
        journal.close(handle);
    }

    #[test]
    fn unique_values_ignore_matches() {
        let journal = journal();
        journal.append(NewEntry::new(1).field("UNIT", "a").field("PRIORITY", "3"));
        journal.append(NewEntry::new(2).field("UNIT", "b").field("PRIORITY", "6"));
        journal.append(NewEntry::new(3).field("UNIT", "a"));

        let mut handle = journal.open(ScopeFlags::empty()).unwrap();
        journal.add_match(&mut handle, b"PRIORITY=3").unwrap();
        journal.query_unique(&mut handle, "UNIT").unwrap();

        let mut values = Vec::new();
        while let Some(v) = journal.enumerate_unique(&mut handle).unwrap() {
            values.push(v);
        }
        assert_eq!(values, vec![b"UNIT=a".to_vec(), b"UNIT=b".to_vec()]);
        journal.close(handle);
    }

    #[test]
    fn usage_counts_visible_records() {
        let journal = journal();
        journal.append(NewEntry::new(1).field("A", "1"));
        journal.append(
            NewEntry::new(2)
                .field("B", "22")
                .with_origin(EntryOrigin::system().remote()),
        );

        let mut all = journal.open(ScopeFlags::empty()).unwrap();
        let mut local = journal.open(ScopeFlags::LOCAL_ONLY).unwrap();
        assert_eq!(journal.get_usage(&mut all), Ok(7));
        assert_eq!(journal.get_usage(&mut local), Ok(3));
        journal.close(all);
        journal.close(local);
    }

    #[test]
    fn send_validates_records() {
        let journal = journal();
        assert_eq!(journal.send(&[]), Err(Errno::EINVAL));
        assert_eq!(journal.send(&[b"MESSAGE"]), Err(Errno::EINVAL));
        assert_eq!(journal.send(&[b"MESSAGE=ok", b"bad key=x"]), Err(Errno::EINVAL));
        assert!(journal.is_empty());

        journal.send(&[b"MESSAGE=hello", b"PRIORITY=6"]).unwrap();
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn handles_are_counted() {
        let journal = journal();
        let a = journal.open(ScopeFlags::empty()).unwrap();
        let b = journal.clone().open(ScopeFlags::SYSTEM).unwrap();
        assert_eq!(journal.open_handles(), 2);

        journal.close(a);
        journal.close(b);
        assert_eq!(journal.open_handles(), 0);
    }
}
