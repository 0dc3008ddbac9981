//! # Sequential Executor
//!
//! Applies the statements of a split script against a [`store::Store`], one at
//! a time and in order, and reports one [`ExecutionOutcome`] per statement.
//!
//! ## Behaviour
//!
//! - **Never aborts:** every statement is attempted regardless of how earlier
//!   ones fared. Deciding whether a run with failures is acceptable is left to
//!   the caller.
//! - **No retries, no wrapping transaction:** each statement commits on its own,
//!   so a partially failing script leaves the store partially applied.
//! - **Classification by kind:** failures are sorted into expected and
//!   unexpected using a [`FailurePolicy`] over `StoreErrorKind`, never by
//!   matching store-specific codes or messages.
//! - **Bounded waits:** with a statement timeout configured, a stalled
//!   statement becomes a `Timeout` failure and the run moves on.
//!
//! ## Public API
//!
//! - `StatementExecutor`: runs a statement list against a store.
//! - `FailurePolicy`: the allow-list of expected error kinds.
//! - `ExecutionOutcome` / `OutcomeCounts`: per-statement results and their tally.

pub mod outcome;
pub mod policy;
pub mod sequential;

pub use outcome::{ExecutionOutcome, OutcomeCounts};
pub use policy::FailurePolicy;
pub use sequential::StatementExecutor;
