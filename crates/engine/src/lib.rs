//! # Lifecycle Driver
//!
//! Orchestrates the two operations of a bootstrap run against one store
//! connection:
//!
//! - **Apply:** connect, load and split the script, execute every statement,
//!   then verify what exists. Statement failures are reported, never fatal.
//! - **Teardown:** connect, then drop each object of the configured plan in
//!   order. A missing object counts as done; any other failure stops the
//!   teardown.
//!
//! The connection is acquired at the start of an operation and closed on every
//! exit path. Only a missing or unreadable script, an unreachable store and a
//! teardown failure surface as [`EngineError`].

use configuration::Settings;
use core_types::TeardownPlan;
use executor::{ExecutionOutcome, OutcomeCounts, StatementExecutor};
use std::path::{Path, PathBuf};
use std::time::Duration;
use store::{Store, StoreConnector, execute_with_deadline, ping_with_deadline};
use verifier::Verifier;

pub mod error;
pub mod lifecycle;
pub mod report;
pub mod script;

pub use error::EngineError;
pub use lifecycle::{Lifecycle, Operation, Phase};
pub use report::{ApplyReport, TeardownReport, TeardownStatus, TeardownStep};
pub use script::load_script;

/// Everything the driver needs besides the connector.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub script_path: PathBuf,
    pub executor: StatementExecutor,
    pub verifier: Verifier,
    /// Pause between the last statement and the readiness check.
    pub settle_delay: Duration,
    pub teardown_plan: TeardownPlan,
    pub cascade: bool,
    /// Deadline for each teardown drop and for the readiness check.
    pub statement_timeout: Option<Duration>,
}

impl DriverOptions {
    pub fn from_settings(settings: &Settings) -> Result<Self, EngineError> {
        let teardown_plan = settings
            .teardown
            .plan()
            .map_err(|e| EngineError::Configuration(e.to_string()))?;
        let statement_timeout = settings.execution.statement_timeout();

        Ok(Self {
            script_path: settings.script.path.clone(),
            executor: StatementExecutor::from_settings(&settings.execution),
            verifier: Verifier::from_settings(
                &settings.database,
                &settings.verification,
                statement_timeout,
            ),
            settle_delay: settings.verification.settle_delay(),
            teardown_plan,
            cascade: settings.teardown.cascade,
            statement_timeout,
        })
    }

    pub fn with_script_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_path = path.into();
        self
    }
}

pub struct Driver<C: StoreConnector> {
    connector: C,
    options: DriverOptions,
}

impl<C: StoreConnector> Driver<C> {
    pub fn new(connector: C, options: DriverOptions) -> Self {
        Self { connector, options }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    pub async fn apply(&self) -> Result<ApplyReport, EngineError> {
        self.apply_with(|_, _| {}).await
    }

    /// Runs Apply, calling `on_outcome(outcome, total)` after each statement.
    pub async fn apply_with<F>(&self, on_outcome: F) -> Result<ApplyReport, EngineError>
    where
        F: FnMut(&ExecutionOutcome, usize) + Send,
    {
        let mut lifecycle = Lifecycle::new(Operation::Apply);
        let mut store = self.connect(&mut lifecycle).await?;
        let result = self.run_apply(&mut lifecycle, &mut store, on_outcome).await;
        self.release(store).await;
        lifecycle.terminate();
        result
    }

    pub async fn teardown(&self) -> Result<TeardownReport, EngineError> {
        let mut lifecycle = Lifecycle::new(Operation::Teardown);
        let mut store = self.connect(&mut lifecycle).await?;
        let result = self.run_teardown(&mut lifecycle, &mut store).await;
        self.release(store).await;
        lifecycle.terminate();
        result
    }

    async fn connect(&self, lifecycle: &mut Lifecycle) -> Result<C::Store, EngineError> {
        lifecycle.advance(Phase::ConnectingStore)?;
        match self.connector.connect().await {
            Ok(store) => Ok(store),
            Err(e) => {
                tracing::error!(kind = %e.kind, "Failed to connect to the store: {}", e.message);
                lifecycle.terminate();
                Err(EngineError::Connection(e))
            }
        }
    }

    async fn release(&self, store: C::Store) {
        if let Err(e) = store.close().await {
            tracing::warn!(kind = %e.kind, "Error while closing the store connection: {}", e.message);
        }
    }

    async fn run_apply<F>(
        &self,
        lifecycle: &mut Lifecycle,
        store: &mut C::Store,
        on_outcome: F,
    ) -> Result<ApplyReport, EngineError>
    where
        F: FnMut(&ExecutionOutcome, usize) + Send,
    {
        lifecycle.advance(Phase::LoadingScript)?;
        let path = self.options.script_path.as_path();
        let script = load_script(path).await.inspect_err(|e| {
            tracing::error!(path = %path.display(), "{e}");
        })?;
        let statements = splitter::split(&script);
        tracing::info!(path = %path.display(), statements = statements.len(), "Loaded script");

        lifecycle.advance(Phase::Running)?;
        let outcomes = self
            .options
            .executor
            .execute_with(store, &statements, on_outcome)
            .await;
        let counts = OutcomeCounts::tally(&outcomes);
        tracing::info!(
            succeeded = counts.succeeded,
            expected_failures = counts.expected_failures,
            unexpected_failures = counts.unexpected_failures,
            "Script applied"
        );

        lifecycle.advance(Phase::Reporting)?;
        let store_ready = self.settle(store).await;
        let verification = self.options.verifier.verify(store).await;

        Ok(ApplyReport {
            script: path.to_path_buf(),
            outcomes,
            counts,
            store_ready,
            verification,
        })
    }

    /// Waits out the configured settle delay, then pings the store.
    async fn settle(&self, store: &mut C::Store) -> bool {
        if !self.options.settle_delay.is_zero() {
            tracing::debug!(delay = ?self.options.settle_delay, "Waiting before verification");
            tokio::time::sleep(self.options.settle_delay).await;
        }
        match ping_with_deadline(store, self.options.statement_timeout).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(kind = %e.kind, "Store did not answer the readiness check: {}", e.message);
                false
            }
        }
    }

    async fn run_teardown(
        &self,
        lifecycle: &mut Lifecycle,
        store: &mut C::Store,
    ) -> Result<TeardownReport, EngineError> {
        lifecycle.advance(Phase::EnumeratingTeardownTargets)?;
        let plan = &self.options.teardown_plan;
        tracing::warn!(targets = plan.len(), "Dropping all configured schema objects");

        lifecycle.advance(Phase::Running)?;
        let mut steps = Vec::with_capacity(plan.len());
        for target in plan.iter() {
            let sql = target.drop_statement(self.options.cascade);
            let status =
                match execute_with_deadline(store, &sql, self.options.statement_timeout).await {
                    Ok(_) => {
                        tracing::info!(object = %target, "Dropped");
                        TeardownStatus::Dropped
                    }
                    Err(e) if e.kind.is_absent() => {
                        tracing::info!(object = %target, "Already absent");
                        TeardownStatus::AlreadyAbsent
                    }
                    Err(e) => {
                        tracing::error!(
                            object = %target,
                            kind = %e.kind,
                            code = e.code.as_deref().unwrap_or("-"),
                            "Teardown failed: {}",
                            e.message
                        );
                        return Err(EngineError::Teardown {
                            target: target.clone(),
                            completed: steps.len(),
                            source: e,
                        });
                    }
                };
            steps.push(TeardownStep {
                target: target.clone(),
                status,
            });
        }

        lifecycle.advance(Phase::Reporting)?;
        tracing::info!(steps = steps.len(), "Teardown complete");
        Ok(TeardownReport { steps })
    }
}

/// Loads and splits a script without touching any store.
pub async fn plan_script(path: &Path) -> Result<Vec<core_types::Statement>, EngineError> {
    let script = load_script(path).await?;
    Ok(splitter::split(&script))
}
