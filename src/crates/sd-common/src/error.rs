use nix::errno::Errno;
use std::borrow::Cow;
use thiserror::Error;

/// Errors reported by the daemon facade and the journal client.
///
/// End-of-sequence conditions ("no more entries", "no more fields") are not
/// errors; they are reported as `Ok(None)` or `Ok(0)` by the operations that
/// can reach them.
#[derive(Debug, Error)]
pub enum Error {
    /// A backend call failed with an OS-style error code.
    #[error("{context}: {errno}")]
    System {
        context: Cow<'static, str>,
        errno: Errno,
    },

    /// A caller-supplied symbolic token was not recognized. Raised before
    /// any backend call is made.
    #[error("invalid {what}: {value:?}")]
    InvalidArgument { what: &'static str, value: String },
}

impl Error {
    pub fn system(context: impl Into<Cow<'static, str>>, errno: Errno) -> Self {
        Error::System {
            context: context.into(),
            errno,
        }
    }

    pub fn invalid_argument(what: &'static str, value: impl Into<String>) -> Self {
        Error::InvalidArgument {
            what,
            value: value.into(),
        }
    }

    /// The OS error code, for [`Error::System`].
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Error::System { errno, .. } => Some(*errno),
            Error::InvalidArgument { .. } => None,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }
}

/// A specialized Result type for daemon and journal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Attaches an operation description to a backend `Errno`.
pub trait ErrnoExt<T> {
    fn context(self, context: &'static str) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<Cow<'static, str>>;
}

impl<T> ErrnoExt<T> for std::result::Result<T, Errno> {
    fn context(self, context: &'static str) -> Result<T> {
        self.map_err(|errno| Error::system(context, errno))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<Cow<'static, str>>,
    {
        self.map_err(|errno| Error::system(f(), errno))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_error_display() {
        let err: Result<()> = Err(Errno::ENOENT).context("failed to open journal");
        let err = err.unwrap_err();

        assert_eq!(err.errno(), Some(Errno::ENOENT));
        assert!(!err.is_invalid_argument());

        let rendered = err.to_string();
        assert!(rendered.starts_with("failed to open journal: "));
        assert!(rendered.contains("ENOENT"));
    }

    #[test]
    fn lazy_context_is_formatted() {
        let err: Result<()> =
            Err(Errno::EINVAL).with_context(|| format!("failed to add match {:?}", "FOO"));
        assert_eq!(
            err.unwrap_err().to_string(),
            format!("failed to add match \"FOO\": {}", Errno::EINVAL)
        );
    }

    #[test]
    fn invalid_argument_names_the_value() {
        let err = Error::invalid_argument("journal flag", "bogus");
        assert!(err.is_invalid_argument());
        assert_eq!(err.errno(), None);
        assert_eq!(err.to_string(), "invalid journal flag: \"bogus\"");
    }
}
