use core_types::TeardownTarget;
use executor::{ExecutionOutcome, OutcomeCounts};
use std::fmt;
use std::path::PathBuf;
use verifier::VerificationReport;

/// Everything an apply run produced.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub script: PathBuf,
    pub outcomes: Vec<ExecutionOutcome>,
    pub counts: OutcomeCounts,
    /// Whether the store answered the readiness ping before verification.
    pub store_ready: bool,
    pub verification: VerificationReport,
}

impl ApplyReport {
    pub fn unexpected_failures(&self) -> impl Iterator<Item = &ExecutionOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == core_types::OutcomeStatus::UnexpectedFailure)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStatus {
    /// The drop statement completed.
    Dropped,
    /// The store reported the object as not existing.
    AlreadyAbsent,
}

impl fmt::Display for TeardownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownStatus::Dropped => write!(f, "dropped"),
            TeardownStatus::AlreadyAbsent => write!(f, "already absent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownStep {
    pub target: TeardownTarget,
    pub status: TeardownStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub steps: Vec<TeardownStep>,
}

impl TeardownReport {
    pub fn count(&self, status: TeardownStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }
}
