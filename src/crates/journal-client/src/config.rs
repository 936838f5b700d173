use crate::backend::JournalBackend;
use crate::flags::ScopeFlags;
use crate::matches::{MatchDisplay, MatchToken};
use crate::session::JournalSession;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A saved journal query: which part of the journal to open and which
/// entries to keep.
///
/// ```yaml
/// flags: [local-only, system]
/// matches: ["_SYSTEMD_UNIT=sshd.service", "or", "PRIORITY=3"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JournalConfig {
    /// Scope flags to open the journal with
    #[serde(default)]
    pub flags: ScopeFlags,

    /// Match terms and `and`/`or` junctions, in push order
    #[serde(default)]
    pub matches: Vec<MatchToken>,
}

impl JournalConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml_str(&contents)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Every junction must follow a term.
    fn validate(&self) -> Result<(), ConfigError> {
        let mut previous_was_term = false;

        for token in &self.matches {
            match token {
                MatchToken::Term(_) => previous_was_term = true,
                MatchToken::Combinator(c) if !previous_was_term => {
                    return Err(ConfigError::Invalid(format!(
                        "junction {:?} must follow a match term",
                        c.as_str()
                    )));
                }
                MatchToken::Combinator(_) => previous_was_term = false,
            }
        }

        Ok(())
    }

    /// Opens a session with the configured flags and pushes the matches.
    pub fn open<B: JournalBackend>(&self, backend: B) -> sd_common::Result<JournalSession<B>> {
        let mut session = JournalSession::open(backend, self.flags)?;
        session.apply_matches(&self.matches)?;

        tracing::debug!(
            flags = %self.flags,
            matches = %MatchDisplay(&self.matches),
            "opened configured journal session"
        );
        Ok(session)
    }
}
