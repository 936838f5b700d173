use sd_common::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Boolean combinator inserted between runs of match terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::And => "and",
            Combinator::Or => "or",
        }
    }
}

impl FromStr for Combinator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "and" => Ok(Combinator::And),
            "or" => Ok(Combinator::Or),
            _ => Err(Error::invalid_argument("match junction", s)),
        }
    }
}

/// One element of a match expression, in the order it was pushed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchToken {
    /// A literal `FIELD=value` term.
    Term(String),
    Combinator(Combinator),
}

impl MatchToken {
    pub fn term(s: impl Into<String>) -> Self {
        MatchToken::Term(s.into())
    }

    pub const AND: MatchToken = MatchToken::Combinator(Combinator::And);
    pub const OR: MatchToken = MatchToken::Combinator(Combinator::Or);

    /// Parses every token before returning, so that an unknown junction is
    /// reported before anything reaches a backend.
    pub fn parse_all<I, S>(tokens: I) -> Result<Vec<Self>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens.into_iter().map(|t| t.as_ref().parse()).collect()
    }
}

impl FromStr for MatchToken {
    type Err = Error;

    /// Anything containing `=` is a term; otherwise it must be `and` or `or`.
    fn from_str(s: &str) -> Result<Self> {
        if s.contains('=') {
            Ok(MatchToken::Term(s.to_string()))
        } else {
            s.parse().map(MatchToken::Combinator)
        }
    }
}

impl fmt::Display for MatchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchToken::Term(term) => f.write_str(term),
            MatchToken::Combinator(c) => f.write_str(c.as_str()),
        }
    }
}

impl Serialize for MatchToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MatchToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Renders a token list on one line, e.g. `A=1 B=2 OR C=3`; an empty list
/// matches everything and renders as `*`.
pub struct MatchDisplay<'a>(pub &'a [MatchToken]);

impl fmt::Display for MatchDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "*");
        }

        let mut previous_was_term = false;
        for token in self.0 {
            match token {
                MatchToken::Term(term) => {
                    if previous_was_term {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", term)?;
                    previous_was_term = true;
                }
                MatchToken::Combinator(Combinator::And) => {
                    write!(f, " AND ")?;
                    previous_was_term = false;
                }
                MatchToken::Combinator(Combinator::Or) => {
                    write!(f, " OR ")?;
                    previous_was_term = false;
                }
            }
        }

        Ok(())
    }
}
