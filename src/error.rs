//! Typed errors for the store, task transitions and the quality gate.
//!
//! `ShopError` is what command handlers return; the narrower enums are what
//! the pure modules return so callers can match on the exact failure.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::fields::{TaskAction, TaskStatus};

/// Failures reading or writing the JSON store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read store at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse store at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write store at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock store at {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialise store: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// A status or stage change that the task lifecycle does not allow.
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("Cannot {} task {task_id} while it is {from:?}", .action.verb())]
    InvalidTransition {
        task_id: u64,
        from: TaskStatus,
        action: TaskAction,
    },

    #[error("Task {task_id} is already completed")]
    AlreadyCompleted { task_id: u64 },

    #[error("Stage '{stage}' is not part of this task's workflow")]
    UnknownStage { stage: String },

    #[error("Stage '{stage}' is behind the batch's current stage '{current}'")]
    BehindBatchStage { stage: String, current: String },
}

/// An input the checklist requires before it can be submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Requirement {
    Unanswered { index: usize, description: String },
    Photo { index: usize, description: String },
    Measurement { index: usize, description: String },
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Unanswered { index, description } => {
                write!(f, "check {} ({}) has no pass/fail answer", index + 1, description)
            }
            Requirement::Photo { index, description } => {
                write!(f, "check {} ({}) requires a photo", index + 1, description)
            }
            Requirement::Measurement { index, description } => {
                write!(f, "check {} ({}) requires a measurement", index + 1, description)
            }
        }
    }
}

/// Failures raised by a checkpoint session.
#[derive(Debug, Error, PartialEq)]
pub enum GateError {
    #[error("Checkpoint has not been opened")]
    NotOpen,

    #[error("Checkpoint has already been submitted")]
    AlreadySubmitted,

    #[error("Check {index} does not exist (checklist has {len} checks)")]
    CheckOutOfRange { index: usize, len: usize },

    #[error("Measurement for check {index} must be a finite number")]
    InvalidMeasurement { index: usize },

    #[error("Checkpoint is incomplete: {}", join_requirements(.0))]
    Incomplete(Vec<Requirement>),
}

fn join_requirements(missing: &[Requirement]) -> String {
    missing
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced by command handlers.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("Task {0} not found")]
    TaskNotFound(u64),

    #[error("Worker {0} not found")]
    WorkerNotFound(u64),

    #[error("Batch {0} not found")]
    BatchNotFound(u64),

    #[error("Task {task_id} is blocked: {reason}")]
    Blocked { task_id: u64, reason: String },

    #[error("Applied {applied} of {total} item(s) before failing: {source}")]
    Partial {
        applied: usize,
        total: usize,
        #[source]
        source: Box<ShopError>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read import file {path}: {source}")]
    ImportRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse import file {path}: {source}")]
    ImportParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Backup failed: {0}")]
    Backup(#[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Gate(#[from] GateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_gate_error_lists_every_requirement() {
        let err = GateError::Incomplete(vec![
            Requirement::Photo { index: 0, description: "Grain match".into() },
            Requirement::Measurement { index: 2, description: "Cup depth".into() },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("check 1 (Grain match) requires a photo"));
        assert!(msg.contains("check 3 (Cup depth) requires a measurement"));
    }

    #[test]
    fn invalid_transition_names_action_and_status() {
        let err = TransitionError::InvalidTransition {
            task_id: 7,
            from: TaskStatus::Assigned,
            action: TaskAction::Complete,
        };
        assert_eq!(err.to_string(), "Cannot complete task 7 while it is Assigned");
    }

    #[test]
    fn partial_error_carries_counts_and_source() {
        let err = ShopError::Partial {
            applied: 2,
            total: 5,
            source: Box::new(ShopError::TaskNotFound(9)),
        };
        assert_eq!(err.to_string(), "Applied 2 of 5 item(s) before failing: Task 9 not found");
    }
}
