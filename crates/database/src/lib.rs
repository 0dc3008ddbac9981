//! # Bootstrap Database Crate
//!
//! The PostgreSQL adapter behind the `store` traits. It is the only crate that
//! knows about `sqlx`, connection options and SQLSTATE codes.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All database-specific logic lives here. The executor, verifier
//!   and lifecycle driver only ever see `Store`, `StoreError` and `StoreErrorKind`.
//! - **Scoped connection:** `PgConnector::connect` opens exactly one
//!   `PgConnection` per operation; `PgStore::close` releases it. There is no
//!   process-wide pool.
//! - **Closed error taxonomy:** `classify` turns every `sqlx::Error` into a
//!   `StoreError` whose kind is decided from the SQLSTATE code.
//!
//! ## Public API
//!
//! - `PgConnector`: built from `DatabaseSettings`, hands out `PgStore`s.
//! - `PgStore`: the `Store` implementation over a single `PgConnection`.
//! - `classify` / `kind_for_sqlstate`: the SQLSTATE mapping.
//! - `DbError`: configuration problems detected before any connection attempt.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod pg_store;
pub mod sqlstate;

// Re-export the key components to create a clean, public-facing API.
pub use connection::PgConnector;
pub use error::DbError;
pub use pg_store::PgStore;
pub use sqlstate::{classify, kind_for_sqlstate};
