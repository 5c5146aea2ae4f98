//! Quality checkpoint gate.
//!
//! A `CheckpointSession` walks one checkpoint attempt through
//! `NotStarted -> InProgress -> Submitted`. It validates the answers locally
//! and decides whether the task may move on; persisting the resulting
//! `InspectionResult` and issuing the status change are left to the caller.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::checkpoint::{InspectionResult, Measurement, PhotoRef, QualityCheckpoint};
use crate::error::{GateError, Requirement};
use crate::fields::{CheckpointType, FailurePolicy, InspectionKind};

/// Where a checkpoint attempt is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    NotStarted,
    InProgress,
    Submitted { passed: bool },
}

/// What the caller should do after a checkpoint is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub passed: bool,
    pub can_proceed: bool,
    /// Set for a pre-work checkpoint that allows progress: the caller should
    /// also issue the task's `start` transition.
    pub auto_start: bool,
}

/// `true` unless the attempt failed and the policy blocks progress.
///
/// A checklist without a policy never blocks on its own; blocking is then
/// the caller's decision.
pub fn can_proceed(passed: bool, policy: Option<FailurePolicy>) -> bool {
    passed || policy != Some(FailurePolicy::BlockProgress)
}

/// One attempt at a checkpoint for a task.
#[derive(Debug, Clone)]
pub struct CheckpointSession {
    task_id: u64,
    stage: Option<String>,
    checkpoint_type: CheckpointType,
    checkpoint: Option<QualityCheckpoint>,
    state: GateState,
    answers: Vec<Option<bool>>,
    photos: BTreeMap<usize, String>,
    measurements: BTreeMap<usize, f64>,
    notes: Option<String>,
}

impl CheckpointSession {
    pub fn new(task_id: u64, stage: Option<String>, checkpoint_type: CheckpointType) -> Self {
        CheckpointSession {
            task_id,
            stage,
            checkpoint_type,
            checkpoint: None,
            state: GateState::NotStarted,
            answers: Vec::new(),
            photos: BTreeMap::new(),
            measurements: BTreeMap::new(),
            notes: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn checkpoint(&self) -> Option<&QualityCheckpoint> {
        self.checkpoint.as_ref()
    }

    /// Open the checkpoint with the configuration found for the task's stage.
    ///
    /// Without a configuration, or with an empty checklist, the attempt is
    /// immediately `Submitted { passed: true }`.
    pub fn open(&mut self, config: Option<QualityCheckpoint>) -> Result<GateState, GateError> {
        if self.state != GateState::NotStarted {
            return Err(GateError::AlreadySubmitted);
        }
        match config {
            Some(cp) if !cp.checks.is_empty() => {
                debug!(
                    task_id = self.task_id,
                    checkpoint_id = cp.id,
                    checks = cp.checks.len(),
                    "checkpoint opened"
                );
                self.answers = vec![None; cp.checks.len()];
                self.checkpoint = Some(cp);
                self.state = GateState::InProgress;
            }
            _ => {
                debug!(
                    task_id = self.task_id,
                    stage = ?self.stage,
                    "no checklist configured, passing trivially"
                );
                self.state = GateState::Submitted { passed: true };
            }
        }
        Ok(self.state)
    }

    fn check_index(&self, index: usize) -> Result<(), GateError> {
        match self.state {
            GateState::NotStarted => return Err(GateError::NotOpen),
            GateState::Submitted { .. } => return Err(GateError::AlreadySubmitted),
            GateState::InProgress => {}
        }
        if index >= self.answers.len() {
            return Err(GateError::CheckOutOfRange {
                index,
                len: self.answers.len(),
            });
        }
        Ok(())
    }

    /// Record a pass/fail answer for a check.
    pub fn answer(&mut self, index: usize, passed: bool) -> Result<(), GateError> {
        self.check_index(index)?;
        self.answers[index] = Some(passed);
        Ok(())
    }

    pub fn attach_photo(&mut self, index: usize, reference: &str) -> Result<(), GateError> {
        self.check_index(index)?;
        self.photos.insert(index, reference.to_string());
        Ok(())
    }

    pub fn record_measurement(&mut self, index: usize, value: f64) -> Result<(), GateError> {
        self.check_index(index)?;
        if !value.is_finite() {
            return Err(GateError::InvalidMeasurement { index });
        }
        self.measurements.insert(index, value);
        Ok(())
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes.filter(|n| !n.trim().is_empty());
    }

    /// Inputs still needed before the checklist can be submitted.
    pub fn missing_requirements(&self) -> Vec<Requirement> {
        let Some(cp) = &self.checkpoint else {
            return Vec::new();
        };
        let mut missing = Vec::new();
        for (index, check) in cp.checks.iter().enumerate() {
            let description = check.description.clone();
            if self.answers[index].is_none() {
                missing.push(Requirement::Unanswered { index, description: description.clone() });
            }
            if check.requires_photo && !self.photos.contains_key(&index) {
                missing.push(Requirement::Photo { index, description: description.clone() });
            }
            if check.requires_measurement && !self.measurements.contains_key(&index) {
                missing.push(Requirement::Measurement { index, description });
            }
        }
        missing
    }

    fn policy(&self) -> Option<FailurePolicy> {
        self.checkpoint.as_ref().map(|cp| cp.on_failure)
    }

    fn decide(&self, passed: bool) -> GateDecision {
        let can_proceed = can_proceed(passed, self.policy());
        GateDecision {
            passed,
            can_proceed,
            auto_start: can_proceed && self.checkpoint_type == CheckpointType::PreWork,
        }
    }

    /// Validate and submit. On a validation failure nothing changes.
    pub fn submit(&mut self) -> Result<GateDecision, GateError> {
        match self.state {
            GateState::NotStarted => return Err(GateError::NotOpen),
            GateState::Submitted { passed } if self.checkpoint.is_none() => {
                return Ok(self.decide(passed));
            }
            GateState::Submitted { .. } => return Err(GateError::AlreadySubmitted),
            GateState::InProgress => {}
        }
        let missing = self.missing_requirements();
        if !missing.is_empty() {
            return Err(GateError::Incomplete(missing));
        }
        let passed = self.answers.iter().all(|a| *a == Some(true));
        self.state = GateState::Submitted { passed };
        let decision = self.decide(passed);
        info!(
            task_id = self.task_id,
            checkpoint_type = ?self.checkpoint_type,
            passed,
            can_proceed = decision.can_proceed,
            "checkpoint submitted"
        );
        Ok(decision)
    }

    /// Build the record to persist for a submitted attempt.
    pub fn to_inspection(
        &self,
        id: u64,
        worker_id: Option<u64>,
        submitted_at_utc: i64,
    ) -> Result<InspectionResult, GateError> {
        let GateState::Submitted { passed } = self.state else {
            return Err(GateError::NotOpen);
        };
        Ok(InspectionResult {
            id,
            task_id: self.task_id,
            checkpoint_id: self.checkpoint.as_ref().map(|cp| cp.id),
            kind: InspectionKind::Checkpoint,
            stage: self.stage.clone(),
            checkpoint_type: self.checkpoint_type,
            results: self
                .answers
                .iter()
                .enumerate()
                .filter_map(|(i, a)| a.map(|v| (i, v)))
                .collect(),
            notes: self.notes.clone(),
            photos: self
                .photos
                .iter()
                .map(|(&check_index, reference)| PhotoRef {
                    check_index,
                    reference: reference.clone(),
                })
                .collect(),
            measurements: self
                .measurements
                .iter()
                .map(|(&check_index, &value)| Measurement { check_index, value })
                .collect(),
            passed,
            worker_id,
            submitted_at_utc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Check;
    use crate::fields::Severity;

    fn checklist(on_failure: FailurePolicy, checkpoint_type: CheckpointType) -> QualityCheckpoint {
        QualityCheckpoint {
            id: 1,
            stage: "sanding".into(),
            checkpoint_type,
            checks: vec![
                Check::new("Surface smooth to touch"),
                Check {
                    requires_photo: true,
                    common_failures: vec!["Swirl marks near the grille".into()],
                    ..Check::new("No visible scratches")
                },
                Check {
                    requires_measurement: true,
                    ..Check::new("Cup wall thickness (mm)")
                },
            ],
            severity: Severity::Major,
            on_failure,
        }
    }

    fn opened(on_failure: FailurePolicy, checkpoint_type: CheckpointType) -> CheckpointSession {
        let mut s = CheckpointSession::new(42, Some("sanding".into()), checkpoint_type);
        s.open(Some(checklist(on_failure, checkpoint_type))).unwrap();
        s
    }

    fn fill(s: &mut CheckpointSession, answers: [bool; 3]) {
        for (i, a) in answers.into_iter().enumerate() {
            s.answer(i, a).unwrap();
        }
        s.attach_photo(1, "photos/42-cup.jpg").unwrap();
        s.record_measurement(2, 4.5).unwrap();
    }

    #[test]
    fn missing_config_passes_trivially() {
        let mut s = CheckpointSession::new(42, Some("assembly".into()), CheckpointType::PreWork);
        assert_eq!(s.open(None).unwrap(), GateState::Submitted { passed: true });
        let d = s.submit().unwrap();
        assert!(d.passed && d.can_proceed && d.auto_start);
        let record = s.to_inspection(1, None, 0).unwrap();
        assert!(record.results.is_empty());
        assert_eq!(record.checkpoint_id, None);
    }

    #[test]
    fn missing_photo_rejects_submission_without_state_change() {
        let mut s = opened(FailurePolicy::BlockProgress, CheckpointType::PostWork);
        for i in 0..3 {
            s.answer(i, true).unwrap();
        }
        s.record_measurement(2, 4.5).unwrap();

        let err = s.submit().unwrap_err();
        assert_eq!(
            err,
            GateError::Incomplete(vec![Requirement::Photo {
                index: 1,
                description: "No visible scratches".into()
            }])
        );
        assert_eq!(s.state(), GateState::InProgress);
    }

    #[test]
    fn missing_measurement_and_answer_are_reported() {
        let mut s = opened(FailurePolicy::BlockProgress, CheckpointType::PostWork);
        s.answer(0, true).unwrap();
        s.attach_photo(1, "p.jpg").unwrap();
        let GateError::Incomplete(missing) = s.submit().unwrap_err() else {
            panic!("expected Incomplete");
        };
        assert_eq!(missing.len(), 3);
        assert!(matches!(missing[0], Requirement::Unanswered { index: 1, .. }));
        assert!(matches!(missing[1], Requirement::Unanswered { index: 2, .. }));
        assert!(matches!(missing[2], Requirement::Measurement { index: 2, .. }));
    }

    #[test]
    fn all_pass_proceeds_under_any_policy() {
        let policies = [
            FailurePolicy::BlockProgress,
            FailurePolicy::WarnContinue,
            FailurePolicy::LogOnly,
        ];
        for policy in policies {
            let mut s = opened(policy, CheckpointType::PostWork);
            fill(&mut s, [true, true, true]);
            let d = s.submit().unwrap();
            assert!(d.passed);
            assert!(d.can_proceed);
            assert!(!d.auto_start);
            assert_eq!(s.state(), GateState::Submitted { passed: true });
        }
    }

    #[test]
    fn failure_blocks_only_under_block_progress() {
        let mut blocked = opened(FailurePolicy::BlockProgress, CheckpointType::PreWork);
        fill(&mut blocked, [true, false, true]);
        let d = blocked.submit().unwrap();
        assert!(!d.passed);
        assert!(!d.can_proceed);
        assert!(!d.auto_start);

        for policy in [FailurePolicy::WarnContinue, FailurePolicy::LogOnly] {
            let mut s = opened(policy, CheckpointType::PreWork);
            fill(&mut s, [false, true, true]);
            let d = s.submit().unwrap();
            assert!(!d.passed);
            assert!(d.can_proceed);
            assert!(d.auto_start);
        }
    }

    #[test]
    fn can_proceed_truth_table() {
        assert!(can_proceed(true, Some(FailurePolicy::BlockProgress)));
        assert!(can_proceed(true, None));
        assert!(!can_proceed(false, Some(FailurePolicy::BlockProgress)));
        assert!(can_proceed(false, Some(FailurePolicy::WarnContinue)));
        assert!(can_proceed(false, Some(FailurePolicy::LogOnly)));
        assert!(can_proceed(false, None));
    }

    #[test]
    fn session_rejects_out_of_order_use() {
        let mut s = CheckpointSession::new(1, None, CheckpointType::PostWork);
        assert_eq!(s.answer(0, true), Err(GateError::NotOpen));
        assert_eq!(s.submit(), Err(GateError::NotOpen));

        let mut s = opened(FailurePolicy::BlockProgress, CheckpointType::PostWork);
        assert_eq!(s.answer(5, true), Err(GateError::CheckOutOfRange { index: 5, len: 3 }));
        assert_eq!(
            s.record_measurement(2, f64::NAN),
            Err(GateError::InvalidMeasurement { index: 2 })
        );
        fill(&mut s, [true, true, true]);
        s.submit().unwrap();
        assert_eq!(s.submit(), Err(GateError::AlreadySubmitted));
        assert_eq!(s.answer(0, false), Err(GateError::AlreadySubmitted));
        assert_eq!(s.open(None), Err(GateError::AlreadySubmitted));
    }

    #[test]
    fn inspection_record_carries_answers_and_attachments() {
        let mut s = opened(FailurePolicy::BlockProgress, CheckpointType::PostWork);
        fill(&mut s, [true, true, false]);
        s.set_notes(Some("Thin spot on left cup".into()));
        assert!(s.to_inspection(1, Some(3), 100).is_err());
        s.submit().unwrap();

        let record = s.to_inspection(9, Some(3), 100).unwrap();
        assert_eq!(record.id, 9);
        assert_eq!(record.task_id, 42);
        assert_eq!(record.checkpoint_id, Some(1));
        assert!(!record.passed);
        assert_eq!(record.results.get(&2), Some(&false));
        assert_eq!(record.photos[0].reference, "photos/42-cup.jpg");
        assert_eq!(record.measurements[0].value, 4.5);
        assert_eq!(record.notes.as_deref(), Some("Thin spot on left cup"));
    }
}
