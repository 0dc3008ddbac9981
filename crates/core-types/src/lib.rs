pub mod enums;
pub mod error;
pub mod identifier;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{ObjectKind, OutcomeStatus, ProbeStatus, StoreErrorKind};
pub use error::CoreError;
pub use identifier::is_plain_identifier;
pub use structs::{Statement, TeardownPlan, TeardownTarget, preview};
