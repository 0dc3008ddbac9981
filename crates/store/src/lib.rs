//! # Store Capabilities
//!
//! The lifecycle driver, executor and verifier talk to the relational store
//! only through the traits in this crate. An adapter (PostgreSQL in the
//! `database` crate, or the in-memory [`MemoryStore`]) supplies:
//!
//! - `execute`: run one statement, get a row count or a classified error.
//! - `query`: run one read query, get rows back.
//! - `list_base_tables`: the catalog listing used by verification.
//! - `ping` / `close`: readiness and scoped release of the connection.
//!
//! Every failure crossing this boundary is a [`StoreError`] whose `kind` is one
//! of the closed [`StoreErrorKind`] variants.

use async_trait::async_trait;
use std::time::Duration;

pub mod error;
pub mod memory;
pub mod row;

pub use core_types::StoreErrorKind;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use row::{Row, Value};

/// A single acquired connection to a relational store.
#[async_trait]
pub trait Store: Send {
    /// Submits one statement and returns the number of rows it affected.
    async fn execute(&mut self, sql: &str) -> Result<u64, StoreError>;

    /// Runs a read query and returns every row it produced.
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, StoreError>;

    /// Names of the base tables (not views) in `schema`, sorted by name.
    async fn list_base_tables(&mut self, schema: &str) -> Result<Vec<String>, StoreError>;

    /// Round-trips to the store to confirm it is answering.
    async fn ping(&mut self) -> Result<(), StoreError>;

    /// Releases the connection.
    async fn close(self) -> Result<(), StoreError>;
}

/// Something that can hand out a [`Store`] connection.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: Store;

    async fn connect(&self) -> Result<Self::Store, StoreError>;
}

/// Executes `sql`, failing with [`StoreErrorKind::Timeout`] if it does not
/// finish within `deadline`.
pub async fn execute_with_deadline<S: Store>(
    store: &mut S,
    sql: &str,
    deadline: Option<Duration>,
) -> Result<u64, StoreError> {
    within(deadline, store.execute(sql)).await
}

/// Like [`execute_with_deadline`], for read queries.
pub async fn query_with_deadline<S: Store>(
    store: &mut S,
    sql: &str,
    deadline: Option<Duration>,
) -> Result<Vec<Row>, StoreError> {
    within(deadline, store.query(sql)).await
}

/// Like [`execute_with_deadline`], for the catalog listing.
pub async fn list_base_tables_with_deadline<S: Store>(
    store: &mut S,
    schema: &str,
    deadline: Option<Duration>,
) -> Result<Vec<String>, StoreError> {
    within(deadline, store.list_base_tables(schema)).await
}

/// Like [`execute_with_deadline`], for the readiness check.
pub async fn ping_with_deadline<S: Store>(
    store: &mut S,
    deadline: Option<Duration>,
) -> Result<(), StoreError> {
    within(deadline, store.ping()).await
}

async fn within<T>(
    deadline: Option<Duration>,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(StoreError::timeout(limit))),
        None => call.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test(start_paused = true)]
    async fn deadline_turns_a_stalled_statement_into_a_timeout() {
        let store = MemoryStore::new();
        store.stall_when("pg_sleep", Duration::from_secs(60));
        let mut conn = store.connect().await.unwrap();

        let result =
            execute_with_deadline(&mut conn, "SELECT pg_sleep(60)", Some(Duration::from_secs(5)))
                .await;

        assert_matches!(result, Err(StoreError { kind: StoreErrorKind::Timeout, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn catalog_listing_and_ping_are_bounded_too() {
        let store = MemoryStore::new();
        store.stall_when("information_schema", Duration::from_secs(60));
        store.stall_when("ping", Duration::from_secs(60));
        let mut conn = store.connect().await.unwrap();
        let deadline = Some(Duration::from_secs(2));

        assert_matches!(
            list_base_tables_with_deadline(&mut conn, "public", deadline).await,
            Err(StoreError { kind: StoreErrorKind::Timeout, .. })
        );
        assert_matches!(
            ping_with_deadline(&mut conn, deadline).await,
            Err(StoreError { kind: StoreErrorKind::Timeout, .. })
        );
    }

    #[tokio::test]
    async fn no_deadline_passes_results_through() {
        let store = MemoryStore::new();
        let mut conn = store.connect().await.unwrap();

        let affected = execute_with_deadline(&mut conn, "CREATE TABLE t (id INT)", None).await;
        assert_eq!(affected, Ok(0));
    }
}
