//! The execution channel contract.
//!
//! DmlModel never talks to a database itself. Rendered SQL text is handed to
//! an [`ExecutionChannel`], which resolves to a [`Completion`] carrying the
//! raw result rows, the affected-row count, the last insert id and an
//! optional driver error.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use asupersync::Cx;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Opaque execution-context token forwarded verbatim to the channel.
///
/// Hosts use it to pin a statement to a worker or connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextToken(pub u64);

impl fmt::Display for ContextToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// One raw result row: each column is its bytes, or `None` for SQL NULL.
pub type RawRow = Vec<Option<Vec<u8>>>;

/// Result of executing one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub rows: Vec<RawRow>,
    pub affected_rows: u64,
    pub insert_id: u64,
    pub error: Option<ChannelError>,
}

impl Completion {
    /// A successful completion with no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// A failed completion.
    pub fn failed(error: ChannelError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Set the result rows.
    #[must_use]
    pub fn with_rows(mut self, rows: Vec<RawRow>) -> Self {
        self.rows = rows;
        self
    }

    /// Set the affected-row count.
    #[must_use]
    pub fn with_affected_rows(mut self, affected_rows: u64) -> Self {
        self.affected_rows = affected_rows;
        self
    }

    /// Set the last insert id.
    #[must_use]
    pub fn with_insert_id(mut self, insert_id: u64) -> Self {
        self.insert_id = insert_id;
        self
    }

    /// True if the channel reported no error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Asynchronous SQL dispatch.
///
/// Implementations must not fail by panicking: driver failures are reported
/// through [`Completion::error`].
pub trait ExecutionChannel: Send + Sync {
    /// Execute `sql`, optionally on the execution context named by `context`.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        context: Option<ContextToken>,
    ) -> impl Future<Output = Completion> + Send;
}

impl<C: ExecutionChannel> ExecutionChannel for Arc<C> {
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        context: Option<ContextToken>,
    ) -> impl Future<Output = Completion> + Send {
        (**self).execute(cx, sql, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_builders() {
        let done = Completion::new().with_affected_rows(2).with_insert_id(9);
        assert!(done.is_ok());
        assert_eq!(done.affected_rows, 2);
        assert_eq!(done.insert_id, 9);
        assert!(done.rows.is_empty());

        let failed = Completion::failed(ChannelError::new("gone away"));
        assert!(!failed.is_ok());
        assert_eq!(failed.affected_rows, 0);
    }

    #[test]
    fn test_context_token_serde() {
        let json = serde_json::to_string(&ContextToken(3)).unwrap();
        assert_eq!(json, "3");
        let back: ContextToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ContextToken(3));
        assert_eq!(back.to_string(), "ctx#3");
    }
}
