//! 128-bit identifiers (boot ids, machine ids).

use crate::errno::from_io;
use nix::errno::Errno;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

const BOOT_ID_PATH: &str = "/proc/sys/kernel/random/boot_id";

/// A 128-bit id, rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Id128(Uuid);

impl Id128 {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub const fn from_u128(v: u128) -> Self {
        Self(Uuid::from_u128(v))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn is_null(&self) -> bool {
        self.0.is_nil()
    }

    /// Parses either the plain 32-hex form or the hyphenated UUID form.
    pub fn parse(s: &str) -> Result<Self, Errno> {
        let s = s.trim();
        if s.len() != 32 && s.len() != 36 {
            return Err(Errno::EINVAL);
        }
        Uuid::parse_str(s).map(Self).map_err(|_| Errno::EINVAL)
    }

    /// Reads the boot id of the running kernel.
    pub fn current_boot() -> Result<Self, Errno> {
        Self::load(BOOT_ID_PATH)
    }

    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self, Errno> {
        let contents = std::fs::read_to_string(path).map_err(|e| from_io(&e))?;
        Self::parse(&contents)
    }
}

impl FromStr for Id128 {
    type Err = Errno;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Id128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl From<Uuid> for Id128 {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
