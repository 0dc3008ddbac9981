use core_types::OutcomeStatus;
use store::StoreError;

/// The result of submitting one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// 1-based position of the statement in the script.
    pub index: usize,
    /// 1-based source line the statement starts on.
    pub line: usize,
    pub statement: String,
    pub status: OutcomeStatus,
    /// The classified store error, for both kinds of failure.
    pub error: Option<StoreError>,
}

impl ExecutionOutcome {
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}

/// Outcome totals per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub succeeded: usize,
    pub expected_failures: usize,
    pub unexpected_failures: usize,
}

impl OutcomeCounts {
    pub fn tally<'a>(outcomes: impl IntoIterator<Item = &'a ExecutionOutcome>) -> Self {
        outcomes
            .into_iter()
            .fold(Self::default(), |mut counts, outcome| {
                match outcome.status {
                    OutcomeStatus::Succeeded => counts.succeeded += 1,
                    OutcomeStatus::ExpectedFailure => counts.expected_failures += 1,
                    OutcomeStatus::UnexpectedFailure => counts.unexpected_failures += 1,
                }
                counts
            })
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.expected_failures + self.unexpected_failures
    }
}
