//! JSON-backed store and display helpers.
//!
//! `Database` stands in for the hosted production database: it holds tasks,
//! batches, workflow templates, checkpoint configuration, inspection results
//! and the worker roster in a single JSON document.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::checkpoint::{InspectionResult, QualityCheckpoint};
use crate::error::StoreError;
use crate::fields::*;
use crate::task::{Batch, Task, WorkflowTemplate, Worker};

/// In-memory copy of the store.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct Database {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub workflows: Vec<WorkflowTemplate>,
    #[serde(default)]
    pub checkpoints: Vec<QualityCheckpoint>,
    #[serde(default)]
    pub inspections: Vec<InspectionResult>,
    #[serde(default)]
    pub workers: Vec<Worker>,
}

impl Database {
    /// Load the store from a JSON file. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "store file missing, starting empty");
            return Ok(Database::default());
        }
        let mut buf = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut buf))
            .map_err(|source| StoreError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&buf).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save the store using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(self).map_err(StoreError::Serialize)?;
        let tmp = path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            let mut f = File::create(&tmp)?;
            f.write_all(data.as_bytes())?;
            f.flush()?;
            fs::rename(&tmp, path)
        };
        write().map_err(|source| {
            warn!(path = %path.display(), error = %source, "store write failed");
            StoreError::Write {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Reload the store under an exclusive lock, apply `mutate` and persist
    /// the result.
    ///
    /// `mutate` always sees what is on disk, so a change made by another
    /// process since this copy was loaded is validated against. If either the
    /// mutation or the write fails, the freshly loaded state is restored and
    /// nothing is written.
    pub fn transact<R, E, F>(&mut self, path: &Path, mutate: F) -> Result<R, E>
    where
        F: FnOnce(&mut Database) -> Result<R, E>,
        E: From<StoreError>,
    {
        let _lock = StoreLock::acquire(path)?;
        *self = Database::load(path)?;
        let snapshot = self.clone();
        let result = mutate(self).and_then(|r| {
            self.save(path)?;
            Ok(r)
        });
        if result.is_err() {
            debug!("rolling back in-memory store");
            *self = snapshot;
        }
        result
    }

    /// Generate the next available task ID.
    pub fn next_task_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Generate the next available inspection ID.
    pub fn next_inspection_id(&self) -> u64 {
        self.inspections.iter().map(|i| i.id).max().unwrap_or(0) + 1
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn batch(&self, id: u64) -> Option<&Batch> {
        self.batches.iter().find(|b| b.id == id)
    }

    pub fn workflow(&self, id: u64) -> Option<&WorkflowTemplate> {
        self.workflows.iter().find(|w| w.id == id)
    }

    pub fn worker(&self, id: u64) -> Option<&Worker> {
        self.workers.iter().find(|w| w.id == id)
    }

    /// The batch a task belongs to, if it has one and it exists.
    pub fn batch_for(&self, task: &Task) -> Option<&Batch> {
        task.batch_id.and_then(|id| self.batch(id))
    }

    /// Checklist configured for a stage and checkpoint type.
    pub fn checkpoint_for(
        &self,
        stage: Option<&str>,
        checkpoint_type: CheckpointType,
    ) -> Option<&QualityCheckpoint> {
        let stage = stage?;
        self.checkpoints
            .iter()
            .find(|c| c.stage == stage && c.checkpoint_type == checkpoint_type)
    }

    /// Most recent attempt at a configured checkpoint for a task.
    pub fn latest_checkpoint_attempt(
        &self,
        task_id: u64,
        checkpoint_id: u64,
    ) -> Option<&InspectionResult> {
        self.inspections
            .iter()
            .filter(|i| i.kind == InspectionKind::Checkpoint)
            .filter(|i| i.task_id == task_id && i.checkpoint_id == Some(checkpoint_id))
            .max_by_key(|i| (i.submitted_at_utc, i.id))
    }

    /// Most recent final QC sign-off for a task.
    pub fn latest_qc_sign_off(&self, task_id: u64) -> Option<&InspectionResult> {
        self.inspections
            .iter()
            .filter(|i| i.task_id == task_id && i.kind == InspectionKind::FinalQc)
            .max_by_key(|i| (i.submitted_at_utc, i.id))
    }

    /// Tasks assigned to a worker, in store order.
    pub fn tasks_for_worker(&self, worker_id: u64) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.worker_id == Some(worker_id))
            .collect()
    }
}

/// Exclusive lock on `<store>.lock`, held until dropped.
struct StoreLock {
    _file: File,
}

impl StoreLock {
    fn acquire(store: &Path) -> Result<Self, StoreError> {
        let mut name = store.as_os_str().to_owned();
        name.push(".lock");
        let path = PathBuf::from(name);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .and_then(|f| f.lock_exclusive().map(|_| f))
            .map_err(|source| StoreError::Lock {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "store locked");
        Ok(StoreLock { _file: file })
    }
}

/// Format a task status for display.
pub fn format_status(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::Assigned => "Assigned",
        TaskStatus::InProgress => "In Progress",
        TaskStatus::Completed => "Completed",
    }
}

/// Format a priority for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::Urgent => "Urgent",
        Priority::High => "High",
        Priority::Normal => "Normal",
        Priority::Low => "Low",
    }
}

/// Format a failure policy for display.
pub fn format_policy(p: FailurePolicy) -> &'static str {
    match p {
        FailurePolicy::BlockProgress => "block progress",
        FailurePolicy::WarnContinue => "warn and continue",
        FailurePolicy::LogOnly => "log only",
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Parse an `N=value` argument where N is a 1-based check number.
pub fn parse_indexed(s: &str) -> Result<(usize, String), String> {
    let (idx, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected N=value, got '{}'", s))?;
    let n: usize = idx
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a check number", idx.trim()))?;
    if n == 0 {
        return Err("check numbers start at 1".to_string());
    }
    Ok((n - 1, value.trim().to_string()))
}

/// Parse a comma-separated list of 1-based check numbers into 0-based indices.
pub fn parse_check_list(inputs: &[String]) -> Result<Vec<usize>, String> {
    let mut out = Vec::new();
    for raw in inputs {
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let n: usize = part
                .parse()
                .map_err(|_| format!("'{}' is not a check number", part))?;
            if n == 0 {
                return Err("check numbers start at 1".to_string());
            }
            out.push(n - 1);
        }
    }
    Ok(out)
}
