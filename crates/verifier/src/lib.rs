use configuration::{DatabaseSettings, ProbeSettings, VerificationSettings};
use core_types::{ProbeStatus, is_plain_identifier};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use store::{Store, Value, list_base_tables_with_deadline, query_with_deadline};

pub mod report;

pub use report::VerificationReport;

/// A named read query confirming that an object is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub name: String,
    pub query: String,
    /// An empty result counts as `Unavailable`.
    pub require_rows: bool,
}

impl Probe {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            require_rows: false,
        }
    }

    pub fn requiring_rows(mut self) -> Self {
        self.require_rows = true;
        self
    }
}

impl From<&ProbeSettings> for Probe {
    fn from(settings: &ProbeSettings) -> Self {
        Self {
            name: settings.name.clone(),
            query: settings.query.clone(),
            require_rows: settings.require_rows,
        }
    }
}

/// Inspects the store after an apply.
///
/// Every step is independent: a failing catalog listing, count or probe is
/// logged and recorded in the report, and the remaining steps still run.
#[derive(Debug, Clone)]
pub struct Verifier {
    schema: String,
    expected_tables: Vec<String>,
    probes: Vec<Probe>,
    query_timeout: Option<Duration>,
}

impl Verifier {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            expected_tables: Vec::new(),
            probes: Vec::new(),
            query_timeout: None,
        }
    }

    pub fn from_settings(
        database: &DatabaseSettings,
        verification: &VerificationSettings,
        query_timeout: Option<Duration>,
    ) -> Self {
        Self {
            schema: database.schema.clone(),
            expected_tables: verification.expected_tables.clone(),
            probes: verification.probes.iter().map(Probe::from).collect(),
            query_timeout,
        }
    }

    pub fn with_expected_table(mut self, table: impl Into<String>) -> Self {
        self.expected_tables.push(table.into());
        self
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub async fn verify<S: Store>(&self, store: &mut S) -> VerificationReport {
        let table_names = self.list_tables(store).await;

        let mut row_counts = BTreeMap::new();
        for table in &self.expected_tables {
            let count = self.count_rows(store, table).await;
            row_counts.insert(table.clone(), count);
        }

        let mut probe_results = BTreeMap::new();
        for probe in &self.probes {
            let status = self.run_probe(store, probe).await;
            probe_results.insert(probe.name.clone(), status);
        }

        VerificationReport {
            table_names,
            row_counts,
            probe_results,
        }
    }

    async fn list_tables<S: Store>(&self, store: &mut S) -> BTreeSet<String> {
        match list_base_tables_with_deadline(store, &self.schema, self.query_timeout).await {
            Ok(names) => {
                tracing::info!(schema = %self.schema, count = names.len(), "Listed base tables");
                names.into_iter().collect()
            }
            Err(e) => {
                tracing::warn!(schema = %self.schema, kind = %e.kind, "Could not list tables: {}", e.message);
                BTreeSet::new()
            }
        }
    }

    async fn count_rows<S: Store>(&self, store: &mut S, table: &str) -> Option<i64> {
        if !is_plain_identifier(table) {
            tracing::warn!(table, "Skipping row count for a table name that is not a plain identifier");
            return None;
        }
        let sql = format!("SELECT COUNT(*) FROM {table}");
        match query_with_deadline(store, &sql, self.query_timeout).await {
            Ok(rows) => {
                let count = rows.first().and_then(|row| row.first()).and_then(Value::as_i64);
                match count {
                    Some(n) => tracing::info!(table, rows = n, "Counted rows"),
                    None => tracing::warn!(table, "Row count query returned no number"),
                }
                count
            }
            Err(e) if e.kind.is_absent() => {
                tracing::info!(table, "Table not present");
                None
            }
            Err(e) => {
                tracing::warn!(table, kind = %e.kind, "Row count failed: {}", e.message);
                None
            }
        }
    }

    async fn run_probe<S: Store>(&self, store: &mut S, probe: &Probe) -> ProbeStatus {
        match query_with_deadline(store, &probe.query, self.query_timeout).await {
            Ok(rows) if rows.is_empty() && probe.require_rows => {
                tracing::warn!(probe = %probe.name, "Probe returned no rows");
                ProbeStatus::Unavailable
            }
            Ok(rows) => {
                tracing::info!(probe = %probe.name, rows = rows.len(), "Probe succeeded");
                ProbeStatus::Success
            }
            Err(e) => {
                tracing::warn!(probe = %probe.name, kind = %e.kind, "Probe unavailable: {}", e.message);
                ProbeStatus::Unavailable
            }
        }
    }
}
