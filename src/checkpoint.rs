//! Quality checkpoint configuration and inspection records.
//!
//! A `QualityCheckpoint` is the checklist configured for one stage and
//! checkpoint type. Running it against a task produces an `InspectionResult`,
//! which is append-only: a retry is a new record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fields::*;

/// A single item on a checklist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Check {
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: Option<String>,
    #[serde(default)]
    pub requires_photo: bool,
    #[serde(default)]
    pub requires_measurement: bool,
    #[serde(default)]
    pub common_failures: Vec<String>,
}

impl Check {
    pub fn new(description: &str) -> Self {
        Check {
            description: description.to_string(),
            ..Check::default()
        }
    }
}

/// Checklist configured for a (stage, checkpoint type) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityCheckpoint {
    pub id: u64,
    pub stage: String,
    pub checkpoint_type: CheckpointType,
    pub checks: Vec<Check>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

/// A numeric reading taken during an inspection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub check_index: usize,
    pub value: f64,
}

/// A photo reference attached to a check. The reference is opaque.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoRef {
    pub check_index: usize,
    pub reference: String,
}

/// Outcome of one checkpoint attempt against a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionResult {
    pub id: u64,
    pub task_id: u64,
    pub checkpoint_id: Option<u64>,
    #[serde(default)]
    pub kind: InspectionKind,
    pub stage: Option<String>,
    pub checkpoint_type: CheckpointType,
    pub results: BTreeMap<usize, bool>,
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<PhotoRef>,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    pub passed: bool,
    pub worker_id: Option<u64>,
    pub submitted_at_utc: i64,
}
