//! Single-call helpers that open, use and close a session internally.

use crate::backend::JournalBackend;
use crate::entry::EntrySet;
use crate::flags::ScopeFlags;
use crate::matches::MatchToken;
use crate::session::JournalSession;
use sd_common::{ErrnoExt, Result};
use tracing::debug;

/// Writes one entry made of `KEY=VALUE` strings.
pub fn send<B, S>(backend: &B, fields: &[S]) -> Result<()>
where
    B: JournalBackend,
    S: AsRef<str>,
{
    let records: Vec<&[u8]> = fields.iter().map(|f| f.as_ref().as_bytes()).collect();
    backend
        .send(&records)
        .context("failed to send data to journal")
}

/// The current boot id as 32 lowercase hex characters.
pub fn boot_id<B: JournalBackend>(backend: &B) -> Result<String> {
    let id = backend.boot_id().context("failed to get boot id")?;
    Ok(id.to_string())
}

/// Disk space used by the local journal files, in bytes.
pub fn usage<B: JournalBackend>(backend: B) -> Result<u64> {
    let mut session = JournalSession::open(backend, ScopeFlags::LOCAL_ONLY)?;
    let usage = session.usage()?;
    session.close();
    Ok(usage)
}

/// Reads every local entry matching `tokens`.
///
/// Strings containing `=` are match terms, `and`/`or` are junctions; every
/// token is checked before the journal is opened.
pub fn read<B, S>(backend: B, tokens: &[S]) -> Result<EntrySet>
where
    B: JournalBackend,
    S: AsRef<str>,
{
    let tokens = MatchToken::parse_all(tokens)?;

    let mut session = JournalSession::open(backend, ScopeFlags::LOCAL_ONLY)?;
    session.apply_matches(&tokens)?;
    let entries = session.read_all()?;
    session.close();

    debug!(entries = entries.len(), "one-shot read");
    Ok(entries)
}
