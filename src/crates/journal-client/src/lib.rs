//! Cursor-based access to the systemd journal.
//!
//! This crate provides:
//! - [`JournalSession`]: an open journal with match filters, an entry cursor
//!   and field/unique-value enumeration
//! - [`JournalBackend`]: the store operations a session is built on
//! - [`MemoryJournal`]: a backend kept in process memory
//! - `Libsystemd` (feature `libsystemd`): a backend calling into
//!   `libsystemd.so`
//! - [`JournalConfig`]: saved queries loaded from YAML
//! - [`oneshot`]: helpers that open, use and close a session in one call
//!
//! # Examples
//!
//! ```
//! use journal_client::{Id128, JournalSession, MemoryJournal, NewEntry, ScopeFlags};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let journal = MemoryJournal::new(Id128::from_u128(1));
//! journal.append(NewEntry::new(1).field("MESSAGE", "hello").field("PRIORITY", "6"));
//! journal.append(NewEntry::new(2).field("MESSAGE", "oops").field("PRIORITY", "3"));
//!
//! let mut session = JournalSession::open(journal, ScopeFlags::empty())?;
//! session.add_match("PRIORITY=3")?;
//!
//! let entries = session.read_all()?;
//! assert_eq!(entries.len(), 1);
//! assert_eq!(entries[0].get("MESSAGE"), Some("oops"));
//! # Ok(())
//! # }
//! ```

mod backend;
pub use backend::JournalBackend;

mod config;
pub use config::{ConfigError, JournalConfig};

mod entry;
pub use entry::{Entry, EntrySet, parse_record};

mod flags;
pub use flags::ScopeFlags;

mod matches;
pub use matches::{Combinator, MatchDisplay, MatchToken};

mod memory;
pub use memory::{EntryOrigin, MemoryHandle, MemoryJournal, NewEntry};

pub mod oneshot;

mod session;
pub use session::{Direction, Entries, EntryState, JournalSession};

#[cfg(feature = "libsystemd")]
mod ffi;
#[cfg(feature = "libsystemd")]
pub use ffi::{JournalHandle, Libsystemd};

pub use sd_common::{Errno, Error, Id128, Result};
