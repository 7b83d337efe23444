//! Error types for DmlModel.
//!
//! Four families reach callers:
//!
//! - **Usage** (`Usage`, `Encode`): detected before any SQL leaves the process.
//! - **Channel** (`Channel`): reported by the execution channel, passed through verbatim.
//! - **Not found** (`UpdateNotFound`, `DeleteNotFound`): the channel succeeded
//!   but the statement matched zero rows.
//! - **Decode** (`Decode`): a stored value could not be read back. Inside a
//!   find these are isolated per field and never surface here.

use std::error::Error as StdError;
use std::fmt;

use crate::column::ColumnKind;

/// Result type alias for DmlModel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Precondition or API misuse; nothing was dispatched.
    Usage(UsageError),
    /// A value could not be encoded for its declared column kind.
    Encode { field: String, source: EncodeError },
    /// A stored value could not be decoded for its declared column kind.
    Decode { field: String, source: DecodeError },
    /// Failure reported by the execution channel.
    Channel(ChannelError),
    /// An UPDATE matched no rows.
    UpdateNotFound,
    /// A DELETE matched no rows.
    DeleteNotFound,
}

impl Error {
    /// Build a usage error.
    pub fn usage(kind: UsageErrorKind, message: impl Into<String>) -> Self {
        Error::Usage(UsageError {
            kind,
            message: message.into(),
        })
    }

    /// True for errors raised before dispatch.
    pub const fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_) | Error::Encode { .. })
    }

    /// True for errors reported by the execution channel.
    pub const fn is_channel(&self) -> bool {
        matches!(self, Error::Channel(_))
    }

    /// True for the zero-rows update/delete outcomes.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::UpdateNotFound | Error::DeleteNotFound)
    }

    /// The usage error kind, if this is a usage error.
    pub const fn usage_kind(&self) -> Option<UsageErrorKind> {
        match self {
            Error::Usage(e) => Some(e.kind),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Usage(e) => write!(f, "{e}"),
            Error::Encode { field, source } => write!(f, "cannot encode field `{field}`: {source}"),
            Error::Decode { field, source } => write!(f, "cannot decode field `{field}`: {source}"),
            Error::Channel(e) => write!(f, "{e}"),
            Error::UpdateNotFound => write!(f, "no rows found to update"),
            Error::DeleteNotFound => write!(f, "no rows found to delete"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Encode { source, .. } => Some(source),
            Error::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<UsageError> for Error {
    fn from(err: UsageError) -> Self {
        Error::Usage(err)
    }
}

impl From<ChannelError> for Error {
    fn from(err: ChannelError) -> Self {
        Error::Channel(err)
    }
}

/// Classification of usage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageErrorKind {
    /// Insert/update payload has no fields.
    EmptyData,
    /// A field is not declared on the model.
    UnknownField,
    /// UPDATE requested without any filter.
    MissingFilter,
    /// DELETE requested without any filter and without the dangerous override.
    UnfilteredDelete,
    /// Membership filter on a kind other than STRING or INT.
    InvalidMembershipKind,
    /// Comparison or membership filter against `NULL`, which never matches.
    NullFilter,
    /// Multi-row insert rows do not share the same field set.
    MismatchedRows,
    /// Model declaration is unusable (empty table, no fields, bad identifiers).
    InvalidModel,
}

impl UsageErrorKind {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            UsageErrorKind::EmptyData => "empty data",
            UsageErrorKind::UnknownField => "unknown field",
            UsageErrorKind::MissingFilter => "missing filter",
            UsageErrorKind::UnfilteredDelete => "unfiltered delete",
            UsageErrorKind::InvalidMembershipKind => "invalid membership kind",
            UsageErrorKind::NullFilter => "null filter",
            UsageErrorKind::MismatchedRows => "mismatched rows",
            UsageErrorKind::InvalidModel => "invalid model",
        }
    }
}

/// A precondition violation detected before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError {
    pub kind: UsageErrorKind,
    pub message: String,
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl StdError for UsageError {}

/// Opaque failure reported by the execution channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelError {
    /// Driver-supplied message, verbatim.
    pub message: String,
    /// The statement that failed, when known.
    pub sql: Option<String>,
}

impl ChannelError {
    /// Create a channel error from a driver message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql: None,
        }
    }

    /// Attach the failing statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "database error: {}", self.message)
    }
}

impl StdError for ChannelError {}

/// A value that does not fit its column kind on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeError {
    pub kind: ColumnKind,
    pub message: String,
}

impl EncodeError {
    pub fn new(kind: ColumnKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} encode failed: {}", self.kind, self.message)
    }
}

impl StdError for EncodeError {}

/// A stored value that does not fit its column kind on the way out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub kind: ColumnKind,
    pub message: String,
}

impl DecodeError {
    pub fn new(kind: ColumnKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} decode failed: {}", self.kind, self.message)
    }
}

impl StdError for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        assert_eq!(Error::UpdateNotFound.to_string(), "no rows found to update");
        assert_eq!(Error::DeleteNotFound.to_string(), "no rows found to delete");
        assert!(Error::DeleteNotFound.is_not_found());
        assert!(!Error::DeleteNotFound.is_channel());
    }

    #[test]
    fn test_usage_error_display() {
        let err = Error::usage(UsageErrorKind::MissingFilter, "update without filter");
        assert_eq!(err.to_string(), "missing filter: update without filter");
        assert!(err.is_usage());
        assert_eq!(err.usage_kind(), Some(UsageErrorKind::MissingFilter));
    }

    #[test]
    fn test_channel_error_keeps_message() {
        let err: Error = ChannelError::new("Duplicate entry '7' for key 'PRIMARY'")
            .with_sql("INSERT INTO player (id) VALUES (7)")
            .into();
        assert!(err.is_channel());
        assert!(err.to_string().contains("Duplicate entry"));
        if let Error::Channel(inner) = &err {
            assert_eq!(inner.sql.as_deref(), Some("INSERT INTO player (id) VALUES (7)"));
        }
    }

    #[test]
    fn test_encode_error_source() {
        let err = Error::Encode {
            field: "level".to_string(),
            source: EncodeError::new(ColumnKind::Int, "not an integer: \"abc\""),
        };
        assert!(err.is_usage());
        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "cannot encode field `level`: INT encode failed: not an integer: \"abc\""
        );
    }
}
