use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("'{0}' is not a plain SQL identifier")]
    InvalidIdentifier(String),

    #[error("Teardown plan lists '{0}' more than once")]
    DuplicateTeardownTarget(String),

    #[error("Teardown plan is empty")]
    EmptyTeardownPlan,
}
