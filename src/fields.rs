//! Enumerations and field types for production tasks.
//!
//! This module defines the structured values shared by tasks, checkpoints and
//! the command line: task status, priority, checkpoint kinds, failure policies
//! and the status-changing actions a worker can issue.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task lifecycle status. Advances `Assigned -> InProgress -> Completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Assigned,
    InProgress,
    Completed,
}

/// Scheduling priority of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

/// When a checkpoint runs relative to the work on a stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointType {
    PreWork,
    PostWork,
}

/// How serious a checkpoint failure is considered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    #[default]
    Major,
    Minor,
}

/// What a failed checkpoint does to the task's progress.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    BlockProgress,
    WarnContinue,
    LogOnly,
}

/// Outcome of a single fixed QC field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QcOutcome {
    Pass,
    Fail,
}

/// What produced an inspection record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InspectionKind {
    /// An attempt at a checkpoint configured for the task's stage.
    #[default]
    Checkpoint,
    /// The fixed visual/hardware/sound sign-off.
    FinalQc,
}

/// Status-changing actions a worker can issue against a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Start,
    Pause,
    Complete,
    ReturnToQueue,
}

/// Grouping used by the worker task list.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum GroupBy {
    #[default]
    Batch,
    Model,
}

impl TaskAction {
    /// Lower-case verb used in logs and messages.
    pub fn verb(self) -> &'static str {
        match self {
            TaskAction::Start => "start",
            TaskAction::Pause => "pause",
            TaskAction::Complete => "complete",
            TaskAction::ReturnToQueue => "return to queue",
        }
    }
}
