use configuration::ExecutionSettings;
use core_types::{OutcomeStatus, StoreErrorKind};
use store::StoreError;

/// Decides which statement failures are expected on a fresh or partially
/// built database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailurePolicy {
    expected: Vec<StoreErrorKind>,
}

impl FailurePolicy {
    pub fn new(expected: impl IntoIterator<Item = StoreErrorKind>) -> Self {
        let mut expected: Vec<_> = expected.into_iter().collect();
        expected.sort();
        expected.dedup();
        Self { expected }
    }

    pub fn from_settings(settings: &ExecutionSettings) -> Self {
        Self::new(settings.expected_failures.iter().copied())
    }

    pub fn is_expected(&self, kind: StoreErrorKind) -> bool {
        self.expected.binary_search(&kind).is_ok()
    }

    pub fn classify(&self, error: &StoreError) -> OutcomeStatus {
        if self.is_expected(error.kind) {
            OutcomeStatus::ExpectedFailure
        } else {
            OutcomeStatus::UnexpectedFailure
        }
    }

    pub fn expected_kinds(&self) -> &[StoreErrorKind] {
        &self.expected
    }
}

impl Default for FailurePolicy {
    /// "Relation does not exist" and "object does not exist".
    fn default() -> Self {
        Self::new([StoreErrorKind::UndefinedTable, StoreErrorKind::UndefinedObject])
    }
}
