//! Final QC sign-off with a fixed three-field checklist.
//!
//! Visual, hardware and sound are each pass or fail. The form runs through the
//! same `CheckpointSession` as configured checklists, with no photo or
//! measurement requirements. The gate only logs a failed sign-off; whether it
//! blocks completion is up to the caller.

use crate::checkpoint::{Check, InspectionResult, QualityCheckpoint};
use crate::error::{GateError, Requirement};
use crate::fields::{CheckpointType, FailurePolicy, InspectionKind, QcOutcome, Severity};
use crate::gate::{CheckpointSession, GateDecision};

/// Stage key recorded on final QC inspections.
pub const QC_STAGE: &str = "qc";

const FIELDS: [&str; 3] = ["Visual", "Hardware", "Sound"];

/// The three-field QC form. Unset fields are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QcChecklist {
    pub visual: Option<QcOutcome>,
    pub hardware: Option<QcOutcome>,
    pub sound: Option<QcOutcome>,
    pub notes: Option<String>,
}

/// Result of a submitted QC form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QcSignOff {
    pub overall: QcOutcome,
    pub decision: GateDecision,
}

impl QcChecklist {
    fn outcomes(&self) -> [Option<QcOutcome>; 3] {
        [self.visual, self.hardware, self.sound]
    }

    /// `Pass` only when every field is set and passes.
    pub fn overall_status(&self) -> QcOutcome {
        if self.outcomes().iter().all(|o| *o == Some(QcOutcome::Pass)) {
            QcOutcome::Pass
        } else {
            QcOutcome::Fail
        }
    }

    /// Fields still lacking a choice.
    pub fn missing(&self) -> Vec<Requirement> {
        self.outcomes()
            .iter()
            .zip(FIELDS)
            .enumerate()
            .filter(|(_, (o, _))| o.is_none())
            .map(|(index, (_, name))| Requirement::Unanswered {
                index,
                description: name.to_string(),
            })
            .collect()
    }

    /// The fixed checklist as a checkpoint configuration.
    ///
    /// It is never stored, and its id is not carried onto sign-off records.
    pub fn checkpoint() -> QualityCheckpoint {
        QualityCheckpoint {
            id: 0,
            stage: QC_STAGE.to_string(),
            checkpoint_type: CheckpointType::PostWork,
            checks: FIELDS.iter().map(|f| Check::new(f)).collect(),
            severity: Severity::Major,
            on_failure: FailurePolicy::LogOnly,
        }
    }

    /// Run the form through a checkpoint session and submit it.
    ///
    /// The returned session holds the submitted state so the caller can
    /// build the inspection record from it.
    pub fn submit(&self, task_id: u64) -> Result<(QcSignOff, CheckpointSession), GateError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(GateError::Incomplete(missing));
        }
        let mut session =
            CheckpointSession::new(task_id, Some(QC_STAGE.to_string()), CheckpointType::PostWork);
        session.open(Some(Self::checkpoint()))?;
        for (index, outcome) in self.outcomes().into_iter().enumerate() {
            session.answer(index, outcome == Some(QcOutcome::Pass))?;
        }
        session.set_notes(self.notes.clone());
        let decision = session.submit()?;
        Ok((
            QcSignOff {
                overall: self.overall_status(),
                decision,
            },
            session,
        ))
    }
}

/// Build the stored record for a submitted sign-off session.
///
/// Sign-offs are marked `InspectionKind::FinalQc` and carry no checkpoint id,
/// so they never mix with attempts at configured checkpoints.
pub fn sign_off_record(
    session: &CheckpointSession,
    id: u64,
    worker_id: Option<u64>,
    submitted_at_utc: i64,
) -> Result<InspectionResult, GateError> {
    let mut record = session.to_inspection(id, worker_id, submitted_at_utc)?;
    record.kind = InspectionKind::FinalQc;
    record.checkpoint_id = None;
    Ok(record)
}

/// Caller policy for final QC: a failed sign-off blocks completion.
pub fn blocks_completion(sign_off: &QcSignOff) -> bool {
    sign_off.overall == QcOutcome::Fail
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(v: QcOutcome, h: QcOutcome, s: QcOutcome) -> QcChecklist {
        QcChecklist {
            visual: Some(v),
            hardware: Some(h),
            sound: Some(s),
            notes: None,
        }
    }

    #[test]
    fn any_failed_field_fails_overall() {
        use QcOutcome::*;
        assert_eq!(form(Pass, Pass, Pass).overall_status(), Pass);
        assert_eq!(form(Fail, Pass, Pass).overall_status(), Fail);
        assert_eq!(form(Pass, Fail, Pass).overall_status(), Fail);
        assert_eq!(form(Pass, Pass, Fail).overall_status(), Fail);
    }

    #[test]
    fn sound_failure_is_submitted_but_blocks_completion() {
        let qc = QcChecklist {
            notes: Some("Left driver buzzes at 80Hz".into()),
            ..form(QcOutcome::Pass, QcOutcome::Pass, QcOutcome::Fail)
        };
        let (sign_off, session) = qc.submit(12).unwrap();
        assert_eq!(sign_off.overall, QcOutcome::Fail);
        assert!(!sign_off.decision.passed);
        // The gate leaves blocking to the caller.
        assert!(sign_off.decision.can_proceed);
        assert!(blocks_completion(&sign_off));

        let record = sign_off_record(&session, 1, None, 0).unwrap();
        assert!(!record.passed);
        assert_eq!(record.kind, InspectionKind::FinalQc);
        assert_eq!(record.checkpoint_id, None);
        assert_eq!(record.results.len(), 3);
        assert_eq!(record.notes.as_deref(), Some("Left driver buzzes at 80Hz"));
    }

    #[test]
    fn passing_form_does_not_block() {
        let (sign_off, _) = form(QcOutcome::Pass, QcOutcome::Pass, QcOutcome::Pass)
            .submit(1)
            .unwrap();
        assert_eq!(sign_off.overall, QcOutcome::Pass);
        assert!(!blocks_completion(&sign_off));
    }

    #[test]
    fn empty_field_rejects_submission() {
        let qc = QcChecklist {
            hardware: None,
            ..form(QcOutcome::Pass, QcOutcome::Pass, QcOutcome::Pass)
        };
        let err = qc.submit(1).unwrap_err();
        assert_eq!(
            err,
            GateError::Incomplete(vec![Requirement::Unanswered {
                index: 1,
                description: "Hardware".into()
            }])
        );
    }
}
