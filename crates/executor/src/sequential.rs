use crate::outcome::ExecutionOutcome;
use crate::policy::FailurePolicy;
use configuration::ExecutionSettings;
use core_types::{OutcomeStatus, Statement};
use std::time::Duration;
use store::{Store, execute_with_deadline};

/// Length of the statement excerpt attached to failure logs.
const PREVIEW_CHARS: usize = 100;

/// Applies statements strictly one after another.
#[derive(Debug, Clone, Default)]
pub struct StatementExecutor {
    policy: FailurePolicy,
    statement_timeout: Option<Duration>,
}

impl StatementExecutor {
    pub fn new(policy: FailurePolicy, statement_timeout: Option<Duration>) -> Self {
        Self {
            policy,
            statement_timeout,
        }
    }

    pub fn from_settings(settings: &ExecutionSettings) -> Self {
        Self::new(
            FailurePolicy::from_settings(settings),
            settings.statement_timeout(),
        )
    }

    pub fn policy(&self) -> &FailurePolicy {
        &self.policy
    }

    /// Runs every statement and returns one outcome per statement, in order.
    pub async fn execute<S: Store>(
        &self,
        store: &mut S,
        statements: &[Statement],
    ) -> Vec<ExecutionOutcome> {
        self.execute_with(store, statements, |_, _| {}).await
    }

    /// Like [`execute`](Self::execute), calling `on_outcome(outcome, total)`
    /// after each statement.
    pub async fn execute_with<S, F>(
        &self,
        store: &mut S,
        statements: &[Statement],
        mut on_outcome: F,
    ) -> Vec<ExecutionOutcome>
    where
        S: Store,
        F: FnMut(&ExecutionOutcome, usize) + Send,
    {
        let total = statements.len();
        let mut outcomes = Vec::with_capacity(total);

        for statement in statements {
            tracing::info!(index = statement.index, total, "Executing statement");
            let result =
                execute_with_deadline(store, &statement.text, self.statement_timeout).await;
            let outcome = self.record(statement, result);
            on_outcome(&outcome, total);
            outcomes.push(outcome);
        }

        outcomes
    }

    fn record(
        &self,
        statement: &Statement,
        result: Result<u64, store::StoreError>,
    ) -> ExecutionOutcome {
        let (status, error) = match result {
            Ok(rows) => {
                tracing::info!(index = statement.index, rows, "Statement succeeded");
                (OutcomeStatus::Succeeded, None)
            }
            Err(err) => {
                let status = self.policy.classify(&err);
                match status {
                    OutcomeStatus::ExpectedFailure => tracing::info!(
                        index = statement.index,
                        kind = %err.kind,
                        "Statement skipped: {}",
                        err.message
                    ),
                    _ => tracing::error!(
                        index = statement.index,
                        line = statement.line,
                        kind = %err.kind,
                        code = err.code.as_deref().unwrap_or("-"),
                        statement = %statement.preview(PREVIEW_CHARS),
                        "Statement failed: {}",
                        err.message
                    ),
                }
                (status, Some(err))
            }
        };

        ExecutionOutcome {
            index: statement.index,
            line: statement.line,
            statement: statement.text.clone(),
            status,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeCounts;
    use assert_matches::assert_matches;
    use core_types::StoreErrorKind;
    use store::{MemoryStore, StoreConnector, StoreError};

    fn statements(texts: &[&str]) -> Vec<Statement> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| Statement::new(i + 1, i + 1, *text))
            .collect()
    }

    #[tokio::test]
    async fn expected_failures_are_tolerated() {
        let memory = MemoryStore::new();
        let mut store = memory.connect().await.unwrap();
        let script = statements(&[
            "CREATE TABLE t (id INT);",
            "INSERT INTO t VALUES (1);",
            "DROP TABLE nonexistent;",
        ]);

        let outcomes = StatementExecutor::default()
            .execute(&mut store, &script)
            .await;

        let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                OutcomeStatus::Succeeded,
                OutcomeStatus::Succeeded,
                OutcomeStatus::ExpectedFailure
            ]
        );
        assert_matches!(
            &outcomes[2].error,
            Some(StoreError { kind: StoreErrorKind::UndefinedTable, .. })
        );
        assert_eq!(memory.row_count("t"), Some(1));
    }

    #[tokio::test]
    async fn unexpected_failure_does_not_stop_the_run() {
        let memory = MemoryStore::new();
        memory.fail_when(
            "broken",
            StoreError::new(StoreErrorKind::SyntaxError, "syntax error at or near \"broken\"")
                .with_code("42601"),
        );
        let mut store = memory.connect().await.unwrap();
        let script = statements(&[
            "CREATE TABLE a (id INT);",
            "CREATE broken;",
            "CREATE TABLE b (id INT);",
        ]);

        let outcomes = StatementExecutor::default()
            .execute(&mut store, &script)
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].status, OutcomeStatus::Succeeded);
        assert_eq!(outcomes[1].status, OutcomeStatus::UnexpectedFailure);
        assert_eq!(
            outcomes[1].error.as_ref().and_then(|e| e.code.as_deref()),
            Some("42601")
        );
        assert_eq!(outcomes[2].status, OutcomeStatus::Succeeded);
        assert_eq!(memory.executed().len(), 3);
        assert_eq!(memory.table_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn outcomes_keep_statement_order_and_positions() {
        let memory = MemoryStore::new();
        let mut store = memory.connect().await.unwrap();
        let script = vec![
            Statement::new(1, 3, "CREATE TABLE x (id INT);"),
            Statement::new(2, 7, "CREATE INDEX x_id ON x (id);"),
        ];

        let outcomes = StatementExecutor::default()
            .execute(&mut store, &script)
            .await;

        assert_eq!(outcomes[0].index, 1);
        assert_eq!(outcomes[0].line, 3);
        assert_eq!(outcomes[1].index, 2);
        assert_eq!(outcomes[1].line, 7);
        assert_eq!(outcomes[1].statement, "CREATE INDEX x_id ON x (id);");
        assert_eq!(memory.executed(), vec![
            "CREATE TABLE x (id INT);".to_string(),
            "CREATE INDEX x_id ON x (id);".to_string(),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_statement_times_out_and_run_continues() {
        let memory = MemoryStore::new();
        memory.stall_when("slow_table", Duration::from_secs(120));
        let mut store = memory.connect().await.unwrap();
        let script = statements(&[
            "CREATE TABLE slow_table (id INT);",
            "CREATE TABLE fast_table (id INT);",
        ]);

        let executor = StatementExecutor::new(FailurePolicy::default(), Some(Duration::from_secs(5)));
        let outcomes = executor.execute(&mut store, &script).await;

        assert_eq!(outcomes[0].status, OutcomeStatus::UnexpectedFailure);
        assert_matches!(
            &outcomes[0].error,
            Some(StoreError { kind: StoreErrorKind::Timeout, .. })
        );
        assert_eq!(outcomes[1].status, OutcomeStatus::Succeeded);
    }

    #[tokio::test]
    async fn callback_sees_every_outcome_with_the_total() {
        let memory = MemoryStore::new();
        let mut store = memory.connect().await.unwrap();
        let script = statements(&["CREATE TABLE t (id INT);", "DROP VIEW missing_view;"]);

        let mut seen = Vec::new();
        let outcomes = StatementExecutor::default()
            .execute_with(&mut store, &script, |outcome, total| {
                seen.push((outcome.index, total));
            })
            .await;

        assert_eq!(seen, vec![(1, 2), (2, 2)]);
        let counts = OutcomeCounts::tally(&outcomes);
        assert_eq!(counts.succeeded, 1);
        assert_eq!(counts.expected_failures, 1);
        assert_eq!(counts.total(), 2);
    }

    #[tokio::test]
    async fn empty_statement_list_produces_no_outcomes() {
        let memory = MemoryStore::new();
        let mut store = memory.connect().await.unwrap();
        let outcomes = StatementExecutor::default().execute(&mut store, &[]).await;
        assert!(outcomes.is_empty());
        assert!(memory.executed().is_empty());
    }
}
