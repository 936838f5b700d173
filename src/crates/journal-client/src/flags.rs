use bitflags::bitflags;
use sd_common::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Selects which part of the journal a session reads.
    ///
    /// The bit values are the ones `sd_journal_open(3)` takes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ScopeFlags: u32 {
        /// Only entries generated on the local machine.
        const LOCAL_ONLY = 1 << 0;
        /// Only volatile entries (kept under /run).
        const RUNTIME_ONLY = 1 << 1;
        /// System services and the kernel.
        const SYSTEM = 1 << 2;
        /// The current user's entries.
        const CURRENT_USER = 1 << 3;
    }
}

/// Symbolic names, in display order.
const TOKENS: [(&str, ScopeFlags); 4] = [
    ("current-user", ScopeFlags::CURRENT_USER),
    ("system", ScopeFlags::SYSTEM),
    ("runtime-only", ScopeFlags::RUNTIME_ONLY),
    ("local-only", ScopeFlags::LOCAL_ONLY),
];

const NONE: &str = "none";
const SEPARATOR: char = '|';

impl ScopeFlags {
    /// Translates one symbolic token (`local-only`, `runtime-only`, `system`,
    /// `current-user`).
    pub fn from_token(token: &str) -> Result<Self> {
        TOKENS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, flag)| *flag)
            .ok_or_else(|| Error::invalid_argument("journal flag", token))
    }

    /// Combines a list of symbolic tokens; the first unknown token is
    /// reported.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens
            .into_iter()
            .try_fold(Self::empty(), |acc, token| {
                Ok(acc | Self::from_token(token.as_ref())?)
            })
    }

    /// Symbolic names of the set flags, in display order.
    pub fn tokens(&self) -> impl Iterator<Item = &'static str> + '_ {
        TOKENS
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
    }
}

impl fmt::Display for ScopeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str(NONE);
        }

        for (i, token) in self.tokens().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            f.write_str(token)?;
        }

        Ok(())
    }
}

impl FromStr for ScopeFlags {
    type Err = Error;

    /// Parses the [`Display`](fmt::Display) form.
    fn from_str(s: &str) -> Result<Self> {
        if s == NONE {
            return Ok(Self::empty());
        }

        Self::from_tokens(s.split(SEPARATOR))
    }
}

impl Serialize for ScopeFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.tokens())
    }
}

impl<'de> Deserialize<'de> for ScopeFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tokens = Vec::<String>::deserialize(deserializer)?;
        Self::from_tokens(&tokens).map_err(serde::de::Error::custom)
    }
}
