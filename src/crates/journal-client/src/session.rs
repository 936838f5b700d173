use crate::backend::JournalBackend;
use crate::entry::{Entry, EntrySet, parse_record, record_value};
use crate::flags::ScopeFlags;
use crate::matches::{Combinator, MatchDisplay, MatchToken};
use sd_common::{Errno, ErrnoExt, Error, Id128, Result};
use std::fmt;
use tracing::{debug, trace};

/// Where the entry cursor stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Opened, nothing sought or stepped yet.
    Unseeked,
    /// After a seek or a step that moved.
    Positioned,
    /// The last step reported no more entries in its direction.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Enumeration over the fields of the current entry.
#[derive(Debug, Default, Clone, Copy)]
struct FieldCursor {
    yielded: usize,
    exhausted: bool,
}

impl FieldCursor {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Enumeration over the distinct values of the last queried field.
#[derive(Debug, Default, Clone)]
struct UniqueCursor {
    field: Option<String>,
    yielded: usize,
    exhausted: bool,
}

impl UniqueCursor {
    fn restart(&mut self) {
        self.yielded = 0;
        self.exhausted = false;
    }
}

/// An open connection to a journal, with its cursors.
///
/// The session owns the backend handle and releases it exactly once, either
/// through [`close`](Self::close) or when the session is dropped. Every other
/// operation fails with `EBADF` once the session is closed.
///
/// Three cursors are tracked independently: the entry cursor (moved by seeks
/// and steps), the field enumeration of the current entry (reset whenever the
/// entry cursor moves) and the unique-value enumeration (reset by a new
/// [`query_unique`](Self::query_unique), untouched by entry moves).
pub struct JournalSession<B: JournalBackend> {
    backend: B,
    handle: Option<B::Handle>,
    flags: ScopeFlags,
    matches: Vec<MatchToken>,
    entry: EntryState,
    fields: FieldCursor,
    unique: UniqueCursor,
}

impl<B: JournalBackend> JournalSession<B> {
    pub fn open(backend: B, flags: ScopeFlags) -> Result<Self> {
        let handle = backend.open(flags).context("failed to open journal")?;
        debug!(%flags, "journal opened");

        Ok(Self {
            backend,
            handle: Some(handle),
            flags,
            matches: Vec::new(),
            entry: EntryState::Unseeked,
            fields: FieldCursor::default(),
            unique: UniqueCursor::default(),
        })
    }

    /// Opens with symbolic flag tokens; an unknown token is rejected before
    /// the backend is called.
    pub fn open_with_tokens<I, S>(backend: B, tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let flags = ScopeFlags::from_tokens(tokens)?;
        Self::open(backend, flags)
    }

    /// Releases the backend handle. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.backend.close(handle);
            debug!(flags = %self.flags, "journal closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// The flags the session was opened with.
    pub fn flags(&self) -> ScopeFlags {
        self.flags
    }

    /// The match tokens pushed since open or the last flush.
    pub fn matches(&self) -> &[MatchToken] {
        &self.matches
    }

    pub fn entry_state(&self) -> EntryState {
        self.entry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn open_handle(&mut self) -> Result<(&B, &mut B::Handle)> {
        match self.handle.as_mut() {
            Some(handle) => Ok((&self.backend, handle)),
            None => Err(Error::system("journal session is closed", Errno::EBADF)),
        }
    }

    // --- filter construction ---

    /// Appends a literal `FIELD=value` term.
    pub fn add_match(&mut self, term: &str) -> Result<()> {
        let (backend, handle) = self.open_handle()?;
        backend
            .add_match(handle, term.as_bytes())
            .with_context(|| format!("failed to add match {:?}", term))?;

        self.matches.push(MatchToken::term(term));
        Ok(())
    }

    pub fn add_conjunction(&mut self) -> Result<()> {
        let (backend, handle) = self.open_handle()?;
        backend
            .add_conjunction(handle)
            .context("failed to add conjunction")?;

        self.matches.push(MatchToken::AND);
        Ok(())
    }

    pub fn add_disjunction(&mut self) -> Result<()> {
        let (backend, handle) = self.open_handle()?;
        backend
            .add_disjunction(handle)
            .context("failed to add disjunction")?;

        self.matches.push(MatchToken::OR);
        Ok(())
    }

    /// Pushes a parsed token list in order.
    pub fn apply_matches(&mut self, tokens: &[MatchToken]) -> Result<()> {
        for token in tokens {
            match token {
                MatchToken::Term(term) => self.add_match(term)?,
                MatchToken::Combinator(Combinator::And) => self.add_conjunction()?,
                MatchToken::Combinator(Combinator::Or) => self.add_disjunction()?,
            }
        }
        Ok(())
    }

    /// Drops every match; the session matches all entries again.
    pub fn flush_matches(&mut self) -> Result<()> {
        let (backend, handle) = self.open_handle()?;
        backend.flush_matches(handle);

        self.matches.clear();
        Ok(())
    }

    // --- positioning ---

    pub fn seek_head(&mut self) -> Result<()> {
        self.seek("failed to seek to journal head", |backend, handle| {
            backend.seek_head(handle)
        })
    }

    pub fn seek_tail(&mut self) -> Result<()> {
        self.seek("failed to seek to journal tail", |backend, handle| {
            backend.seek_tail(handle)
        })
    }

    /// Seeks to `usec` on the monotonic clock of boot `boot_id`.
    pub fn seek_monotonic(&mut self, boot_id: &str, usec: u64) -> Result<()> {
        self.open_handle()?;
        let boot_id = Id128::parse(boot_id).context("failed to parse boot id")?;

        self.seek("failed to seek to monotonic timestamp", |backend, handle| {
            backend.seek_monotonic_usec(handle, boot_id, usec)
        })
    }

    /// Seeks to `usec` microseconds since the epoch.
    pub fn seek_realtime(&mut self, usec: u64) -> Result<()> {
        self.seek("failed to seek to realtime timestamp", |backend, handle| {
            backend.seek_realtime_usec(handle, usec)
        })
    }

    fn seek<F>(&mut self, context: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(&B, &mut B::Handle) -> std::result::Result<(), Errno>,
    {
        let (backend, handle) = self.open_handle()?;
        f(backend, handle).context(context)?;
        backend.restart_data(handle);

        self.entry = EntryState::Positioned;
        self.fields.reset();
        Ok(())
    }

    /// Moves to the next entry; returns 0 when there is none.
    pub fn step_next(&mut self) -> Result<usize> {
        self.step(Direction::Forward)
    }

    /// Moves to the previous entry; returns 0 when there is none.
    pub fn step_previous(&mut self) -> Result<usize> {
        self.step(Direction::Backward)
    }

    pub fn step(&mut self, direction: Direction) -> Result<usize> {
        let (backend, handle) = self.open_handle()?;

        let moved = match direction {
            Direction::Forward => backend.next(handle).context("failed to move to next entry"),
            Direction::Backward => backend
                .previous(handle)
                .context("failed to move to previous entry"),
        }?;

        if moved > 0 {
            backend.restart_data(handle);
            self.entry = EntryState::Positioned;
            self.fields.reset();
        } else {
            self.entry = EntryState::Exhausted;
        }

        trace!(?direction, moved, "step");
        Ok(moved)
    }

    /// Iterates over the entries from the current position in `direction`,
    /// stepping once per item. Seek first to choose the starting point.
    pub fn entries(&mut self, direction: Direction) -> Entries<'_, B> {
        Entries {
            session: self,
            direction,
            done: false,
        }
    }

    // --- field access ---

    /// The value of the first `name=value` record of the current entry.
    pub fn get_field(&mut self, name: &str) -> Result<String> {
        let (backend, handle) = self.open_handle()?;
        let data = backend
            .get_data(handle, name)
            .with_context(|| format!("failed to read field {:?}", name))?;

        record_value(&data)
    }

    /// The next `(key, value)` of the current entry, `None` past the last
    /// field.
    pub fn enumerate_next_field(&mut self) -> Result<Option<(String, String)>> {
        if self.fields.exhausted {
            self.open_handle()?;
            return Ok(None);
        }

        let (backend, handle) = self.open_handle()?;
        let data = backend
            .enumerate_data(handle)
            .context("failed to enumerate fields")?;

        match data {
            Some(data) => {
                let field = parse_record(&data)?;
                self.fields.yielded += 1;
                Ok(Some(field))
            }
            None => {
                self.fields.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Starts the field enumeration over without moving the entry cursor.
    pub fn restart_field_enumeration(&mut self) -> Result<()> {
        let (backend, handle) = self.open_handle()?;
        backend.restart_data(handle);

        self.fields.reset();
        Ok(())
    }

    /// Number of fields returned since the enumeration last started over.
    pub fn fields_enumerated(&self) -> usize {
        self.fields.yielded
    }

    /// All fields of the current entry, regardless of any enumeration in
    /// progress.
    pub fn entry_map(&mut self) -> Result<Entry> {
        self.restart_field_enumeration()?;

        let mut entry = Entry::new();
        while let Some((key, value)) = self.enumerate_next_field()? {
            entry.insert(key, value);
        }
        Ok(entry)
    }

    pub fn realtime_usec(&mut self) -> Result<u64> {
        let (backend, handle) = self.open_handle()?;
        backend
            .get_realtime_usec(handle)
            .context("failed to get realtime timestamp")
    }

    pub fn monotonic_usec(&mut self) -> Result<(u64, Id128)> {
        let (backend, handle) = self.open_handle()?;
        backend
            .get_monotonic_usec(handle)
            .context("failed to get monotonic timestamp")
    }

    /// Disk space used by the journal files this session reads, in bytes.
    pub fn usage(&mut self) -> Result<u64> {
        let (backend, handle) = self.open_handle()?;
        backend.get_usage(handle).context("failed to get journal usage")
    }

    // --- bulk reads ---

    /// Snapshots every matching entry, oldest first.
    ///
    /// The walk always starts at the head of the match range, and the cursor
    /// is left at the head again so the call can be repeated. A failure fails
    /// the whole call.
    pub fn read_all(&mut self) -> Result<EntrySet> {
        self.seek_head()?;

        let mut entries = EntrySet::new();
        while self.step_next()? > 0 {
            entries.push(self.entry_map()?);
        }

        self.seek_head()?;

        debug!(entries = entries.len(), matches = %MatchDisplay(&self.matches), "read all");
        Ok(entries)
    }

    // --- unique values ---

    /// Prepares enumeration of the distinct values of `field` across the
    /// journal.
    pub fn query_unique(&mut self, field: &str) -> Result<()> {
        let (backend, handle) = self.open_handle()?;
        backend
            .query_unique(handle, field)
            .with_context(|| format!("failed to query unique values of {:?}", field))?;

        self.unique = UniqueCursor {
            field: Some(field.to_string()),
            ..Default::default()
        };
        debug!(field, "unique query");
        Ok(())
    }

    /// The field of the active unique-value query.
    pub fn unique_field(&self) -> Option<&str> {
        self.unique.field.as_deref()
    }

    /// The next distinct value, `None` past the last one.
    pub fn enumerate_next_unique(&mut self) -> Result<Option<String>> {
        if self.unique.field.is_none() {
            self.open_handle()?;
            return Err(Error::system(
                "no unique-value query is active",
                Errno::EINVAL,
            ));
        }

        if self.unique.exhausted {
            self.open_handle()?;
            return Ok(None);
        }

        let (backend, handle) = self.open_handle()?;
        let data = backend
            .enumerate_unique(handle)
            .context("failed to enumerate unique values")?;

        match data {
            Some(data) => {
                let value = record_value(&data)?;
                self.unique.yielded += 1;
                Ok(Some(value))
            }
            None => {
                self.unique.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Starts the unique-value enumeration over without querying again.
    pub fn restart_unique_enumeration(&mut self) -> Result<()> {
        let (backend, handle) = self.open_handle()?;
        backend.restart_unique(handle);

        self.unique.restart();
        Ok(())
    }

    /// Every distinct value of the active query.
    pub fn list_all_unique(&mut self) -> Result<Vec<String>> {
        self.restart_unique_enumeration()?;

        let mut values = Vec::new();
        while let Some(value) = self.enumerate_next_unique()? {
            values.push(value);
        }
        Ok(values)
    }
}

impl<B: JournalBackend> Drop for JournalSession<B> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<B: JournalBackend> fmt::Display for JournalSession<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "journal-session[flags={}", self.flags)?;
        if !self.is_open() {
            write!(f, ", closed")?;
        }
        write!(f, "]")
    }
}

impl<B: JournalBackend> fmt::Debug for JournalSession<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JournalSession")
            .field("open", &self.is_open())
            .field("flags", &self.flags)
            .field("matches", &MatchDisplay(&self.matches).to_string())
            .field("entry", &self.entry)
            .field("fields", &self.fields)
            .field("unique", &self.unique)
            .finish()
    }
}

/// Iterator returned by [`JournalSession::entries`].
pub struct Entries<'a, B: JournalBackend> {
    session: &'a mut JournalSession<B>,
    direction: Direction,
    done: bool,
}

impl<B: JournalBackend> Iterator for Entries<'_, B> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let item = match self.session.step(self.direction) {
            Ok(0) => None,
            Ok(_) => Some(self.session.entry_map()),
            Err(e) => Some(Err(e)),
        };

        self.done = !matches!(item, Some(Ok(_)));
        item
    }
}
