use sd_common::{Errno, ErrnoExt, Result};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Splits a raw `KEY=VALUE` record at the first `=`.
///
/// Values are decoded as text; invalid UTF-8 sequences are replaced with
/// U+FFFD. Binary field values are not supported by this API.
pub fn parse_record(data: &[u8]) -> Result<(String, String)> {
    let Some(pos) = data.iter().position(|&b| b == b'=') else {
        return Err(Errno::EBADMSG).context("malformed field record");
    };

    let key = String::from_utf8_lossy(&data[..pos]).into_owned();
    let value = String::from_utf8_lossy(&data[pos + 1..]).into_owned();
    Ok((key, value))
}

/// The value half of a raw `KEY=VALUE` record.
pub(crate) fn record_value(data: &[u8]) -> Result<String> {
    parse_record(data).map(|(_, value)| value)
}

/// Snapshot of the fields of one journal entry.
///
/// Entries may repeat a field name; the snapshot keeps the first value, the
/// one [`get_field`](crate::JournalSession::get_field) would return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    fields: BTreeMap<String, String>,
}

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field unless the entry already has one with that name.
    pub fn insert(&mut self, key: String, value: String) {
        self.fields.entry(key).or_insert(value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.fields.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.fields
    }
}

impl FromIterator<(String, String)> for Entry {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut entry = Entry::new();
        for (key, value) in iter {
            entry.insert(key, value);
        }
        entry
    }
}

impl<'a> IntoIterator for &'a Entry {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Entries in traversal order, oldest first.
pub type EntrySet = Vec<Entry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_at_the_first_equals_sign() {
        let (key, value) = parse_record(b"MESSAGE=a=b=c").unwrap();
        assert_eq!(key, "MESSAGE");
        assert_eq!(value, "a=b=c");
    }

    #[test]
    fn empty_values_are_kept() {
        let (key, value) = parse_record(b"SYSLOG_IDENTIFIER=").unwrap();
        assert_eq!(key, "SYSLOG_IDENTIFIER");
        assert_eq!(value, "");
    }

    #[test]
    fn missing_separator_is_ebadmsg() {
        let err = parse_record(b"MESSAGE").unwrap_err();
        assert_eq!(err.errno(), Some(Errno::EBADMSG));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let (_, value) = parse_record(b"BLOB=\xff\xfe").unwrap();
        assert_eq!(value, "\u{fffd}\u{fffd}");
    }

    #[test]
    fn first_duplicate_wins() {
        let entry: Entry = [
            ("TAG".to_string(), "first".to_string()),
            ("TAG".to_string(), "second".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(entry.len(), 1);
        assert_eq!(entry.get("TAG"), Some("first"));
    }
}
