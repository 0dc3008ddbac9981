use crate::error::EngineError;
use std::fmt;

/// The two entry operations of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Apply,
    Teardown,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Apply => write!(f, "apply"),
            Operation::Teardown => write!(f, "teardown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ConnectingStore,
    LoadingScript,
    EnumeratingTeardownTargets,
    Running,
    Reporting,
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "Idle",
            Phase::ConnectingStore => "ConnectingStore",
            Phase::LoadingScript => "LoadingScript",
            Phase::EnumeratingTeardownTargets => "EnumeratingTeardownTargets",
            Phase::Running => "Running",
            Phase::Reporting => "Reporting",
            Phase::Terminated => "Terminated",
        };
        f.write_str(name)
    }
}

/// Tracks the phase of one operation and rejects out-of-order steps.
///
/// `Idle -> ConnectingStore -> LoadingScript | EnumeratingTeardownTargets ->
/// Running -> Reporting -> Terminated`. Any phase may jump straight to
/// `Terminated` when the operation aborts.
#[derive(Debug)]
pub struct Lifecycle {
    operation: Operation,
    phase: Phase,
}

impl Lifecycle {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            phase: Phase::Idle,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn advance(&mut self, to: Phase) -> Result<(), EngineError> {
        if !self.allows(to) {
            return Err(EngineError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!(operation = %self.operation, from = %self.phase, to = %to, "Lifecycle transition");
        self.phase = to;
        Ok(())
    }

    /// Moves to `Terminated` from wherever the operation stopped.
    pub fn terminate(&mut self) {
        if self.phase != Phase::Terminated {
            tracing::debug!(operation = %self.operation, from = %self.phase, "Lifecycle terminated");
            self.phase = Phase::Terminated;
        }
    }

    fn allows(&self, to: Phase) -> bool {
        use Phase::*;
        match (self.phase, to) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Idle, ConnectingStore) => true,
            (ConnectingStore, LoadingScript) => self.operation == Operation::Apply,
            (ConnectingStore, EnumeratingTeardownTargets) => {
                self.operation == Operation::Teardown
            }
            (LoadingScript | EnumeratingTeardownTargets, Running) => true,
            (Running, Reporting) => true,
            _ => false,
        }
    }
}
