use crate::lifecycle::Phase;
use core_types::TeardownTarget;
use std::path::PathBuf;
use store::StoreError;
use thiserror::Error;

/// Conditions that end an operation early. Statement and probe failures are
/// never reported through this type.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Could not connect to the store: {0}")]
    Connection(#[source] StoreError),

    #[error("Script file not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("Could not read script file {}: {source}", .path.display())]
    ScriptUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Teardown stopped at {target} after {completed} completed step(s): {source}")]
    Teardown {
        target: TeardownTarget,
        completed: usize,
        #[source]
        source: StoreError,
    },

    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },
}
