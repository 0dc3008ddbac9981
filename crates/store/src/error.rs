use core_types::StoreErrorKind;
use std::time::Duration;
use thiserror::Error;

/// A classified failure reported by a store adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    /// The adapter's native error code (a SQLSTATE for PostgreSQL), when it had one.
    pub code: Option<String>,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Connection, message)
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            StoreErrorKind::Timeout,
            format!("statement did not complete within {limit:?}"),
        )
    }

    /// The error PostgreSQL raises for a missing relation.
    pub fn undefined_table(name: &str) -> Self {
        Self::new(
            StoreErrorKind::UndefinedTable,
            format!("relation \"{name}\" does not exist"),
        )
        .with_code("42P01")
    }
}
