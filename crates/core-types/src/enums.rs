use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of failure categories a store adapter can report.
///
/// Adapters translate their native error codes into one of these kinds, so
/// that nothing downstream of the adapter has to know about wire-level codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorKind {
    UndefinedTable,
    UndefinedObject,
    UndefinedColumn,
    UndefinedFunction,
    UndefinedSchema,
    DuplicateTable,
    DuplicateObject,
    DuplicateColumn,
    DuplicateSchema,
    UniqueViolation,
    ForeignKeyViolation,
    NotNullViolation,
    CheckViolation,
    DependentObjectsStillExist,
    SyntaxError,
    InsufficientPrivilege,
    QueryCanceled,
    Timeout,
    Connection,
    Other,
}

impl StoreErrorKind {
    /// Returns true when the error means the referenced object is not there.
    pub fn is_absent(&self) -> bool {
        matches!(
            self,
            StoreErrorKind::UndefinedTable
                | StoreErrorKind::UndefinedObject
                | StoreErrorKind::UndefinedSchema
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreErrorKind::UndefinedTable => "undefined_table",
            StoreErrorKind::UndefinedObject => "undefined_object",
            StoreErrorKind::UndefinedColumn => "undefined_column",
            StoreErrorKind::UndefinedFunction => "undefined_function",
            StoreErrorKind::UndefinedSchema => "undefined_schema",
            StoreErrorKind::DuplicateTable => "duplicate_table",
            StoreErrorKind::DuplicateObject => "duplicate_object",
            StoreErrorKind::DuplicateColumn => "duplicate_column",
            StoreErrorKind::DuplicateSchema => "duplicate_schema",
            StoreErrorKind::UniqueViolation => "unique_violation",
            StoreErrorKind::ForeignKeyViolation => "foreign_key_violation",
            StoreErrorKind::NotNullViolation => "not_null_violation",
            StoreErrorKind::CheckViolation => "check_violation",
            StoreErrorKind::DependentObjectsStillExist => "dependent_objects_still_exist",
            StoreErrorKind::SyntaxError => "syntax_error",
            StoreErrorKind::InsufficientPrivilege => "insufficient_privilege",
            StoreErrorKind::QueryCanceled => "query_canceled",
            StoreErrorKind::Timeout => "timeout",
            StoreErrorKind::Connection => "connection",
            StoreErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single statement fared when it was submitted to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Succeeded,
    /// Failed with an allow-listed error; the run carries on.
    ExpectedFailure,
    /// Failed with anything else; the run still carries on, but this is surfaced.
    UnexpectedFailure,
}

impl OutcomeStatus {
    pub fn is_failure(&self) -> bool {
        !matches!(self, OutcomeStatus::Succeeded)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OutcomeStatus::Succeeded => "succeeded",
            OutcomeStatus::ExpectedFailure => "expected failure",
            OutcomeStatus::UnexpectedFailure => "unexpected failure",
        };
        f.write_str(label)
    }
}

/// Result of a post-apply probe query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeStatus {
    Success,
    Unavailable,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Success => f.write_str("success"),
            ProbeStatus::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// The kinds of schema objects the teardown knows how to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Table,
    View,
}

impl ObjectKind {
    /// The SQL keyword used in `DROP <keyword>`.
    pub fn keyword(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Table => f.write_str("table"),
            ObjectKind::View => f.write_str("view"),
        }
    }
}
