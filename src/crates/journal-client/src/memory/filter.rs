//! Match expressions over in-memory entries.
//!
//! The tree has the same three levels `sd_journal_add_match(3)` builds: an
//! AND of groups, each group an OR of runs, each run an AND of per-field
//! alternatives. Terms for the same field inside a run are OR-ed.

use super::StoredEntry;
use sd_common::Errno;

const FIELD_NAME_MAX: usize = 64;

/// `true` for 1 to 64 bytes of `[A-Z0-9_]` not starting with a digit.
pub(crate) fn field_name_is_valid(name: &[u8]) -> bool {
    if name.is_empty() || name.len() > FIELD_NAME_MAX {
        return false;
    }

    if name[0].is_ascii_digit() {
        return false;
    }

    name.iter()
        .all(|&b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// Splits a `FIELD=value` term, validating the field name.
pub(crate) fn split_term(data: &[u8]) -> Result<(&[u8], &[u8]), Errno> {
    let pos = data.iter().position(|&b| b == b'=').ok_or(Errno::EINVAL)?;
    let (field, value) = (&data[..pos], &data[pos + 1..]);

    if !field_name_is_valid(field) {
        return Err(Errno::EINVAL);
    }

    Ok((field, value))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldMatch {
    field: Vec<u8>,
    terms: Vec<Vec<u8>>,
}

/// Per-field alternatives that must all hold.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Run {
    fields: Vec<FieldMatch>,
}

impl Run {
    fn add(&mut self, field: &[u8], term: &[u8]) {
        match self.fields.iter_mut().find(|m| m.field == field) {
            Some(m) => {
                if !m.terms.iter().any(|t| t == term) {
                    m.terms.push(term.to_vec());
                }
            }
            None => self.fields.push(FieldMatch {
                field: field.to_vec(),
                terms: vec![term.to_vec()],
            }),
        }
    }

    fn matches(&self, entry: &StoredEntry) -> bool {
        self.fields
            .iter()
            .all(|m| m.terms.iter().any(|t| entry.has_record(t)))
    }
}

/// Runs of which at least one must hold.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Group {
    runs: Vec<Run>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct MatchTree {
    groups: Vec<Group>,
    group_open: bool,
    run_open: bool,
}

impl MatchTree {
    pub(crate) fn add_match(&mut self, data: &[u8]) -> Result<(), Errno> {
        let (field, _) = split_term(data)?;

        if !self.group_open {
            self.groups.push(Group::default());
            self.group_open = true;
            self.run_open = false;
        }

        let Some(group) = self.groups.last_mut() else {
            return Err(Errno::EINVAL);
        };

        if !self.run_open {
            group.runs.push(Run::default());
            self.run_open = true;
        }

        if let Some(run) = group.runs.last_mut() {
            run.add(field, data);
        }

        Ok(())
    }

    /// Closes the current run; a no-op when it has no terms.
    pub(crate) fn add_disjunction(&mut self) {
        if self.group_open && self.run_open {
            self.run_open = false;
        }
    }

    /// Closes the current group; a no-op when it has no terms.
    pub(crate) fn add_conjunction(&mut self) {
        if self.group_open {
            self.group_open = false;
            self.run_open = false;
        }
    }

    pub(crate) fn flush(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub(crate) fn matches(&self, entry: &StoredEntry) -> bool {
        self.groups
            .iter()
            .all(|g| g.runs.iter().any(|r| r.matches(entry)))
    }
}
