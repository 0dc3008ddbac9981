use core_types::ProbeStatus;
use std::collections::{BTreeMap, BTreeSet};

/// What verification found in the store after an apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// Base tables in the working schema, sorted by name.
    pub table_names: BTreeSet<String>,
    /// Row count per expected table; `None` when the table is absent or the
    /// count could not be taken.
    pub row_counts: BTreeMap<String, Option<i64>>,
    pub probe_results: BTreeMap<String, ProbeStatus>,
}

impl VerificationReport {
    pub fn row_count(&self, table: &str) -> Option<i64> {
        self.row_counts.get(table).copied().flatten()
    }

    pub fn probe(&self, name: &str) -> Option<ProbeStatus> {
        self.probe_results.get(name).copied()
    }

    pub fn unavailable_probes(&self) -> impl Iterator<Item = &str> {
        self.probe_results
            .iter()
            .filter(|(_, status)| **status == ProbeStatus::Unavailable)
            .map(|(name, _)| name.as_str())
    }
}
