//! Workflow stage progress.
//!
//! Given a task's stage and the ordered stages of its batch's workflow, these
//! functions report where the task sits and what comes next. A task whose
//! stage is unknown, or which has no workflow, reports zero progress; callers
//! treat that as "no workflow context" rather than an error.

use crate::db::Database;
use crate::task::{StageDescriptor, Task};

/// Number of upcoming stages shown when the caller does not ask for a count.
pub const DEFAULT_NEXT_STAGES: usize = 2;

/// Position of a task within its workflow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageProgress {
    /// 1-based position of the task's stage, 0 when unknown.
    pub current_index: usize,
    pub total_stages: usize,
    pub percentage: f64,
}

impl StageProgress {
    pub const NONE: StageProgress = StageProgress {
        current_index: 0,
        total_stages: 0,
        percentage: 0.0,
    };

    pub fn is_known(&self) -> bool {
        self.current_index > 0
    }
}

fn stage_position(task: &Task, stages: &[StageDescriptor]) -> Option<usize> {
    let stage = task.stage.as_deref()?;
    stages.iter().position(|s| s.stage == stage)
}

/// Compute the task's ordinal position and percentage through `stages`.
pub fn compute_progress(task: &Task, stages: &[StageDescriptor]) -> StageProgress {
    match stage_position(task, stages) {
        Some(idx) => {
            let current_index = idx + 1;
            let total_stages = stages.len();
            StageProgress {
                current_index,
                total_stages,
                percentage: current_index as f64 / total_stages as f64 * 100.0,
            }
        }
        None => StageProgress::NONE,
    }
}

/// Up to `count` stages strictly after the task's current stage.
pub fn next_stages<'a>(
    task: &Task,
    stages: &'a [StageDescriptor],
    count: usize,
) -> &'a [StageDescriptor] {
    match stage_position(task, stages) {
        Some(idx) => {
            let rest = &stages[idx + 1..];
            &rest[..rest.len().min(count)]
        }
        None => &[],
    }
}

/// Resolve task -> batch -> workflow template. Any missing link yields no stages.
pub fn workflow_for_task<'a>(db: &'a Database, task: &Task) -> &'a [StageDescriptor] {
    db.batch_for(task)
        .and_then(|b| b.workflow_template_id)
        .and_then(|id| db.workflow(id))
        .map(|w| w.stages.as_slice())
        .unwrap_or(&[])
}

/// Index of a stage key within a workflow.
pub fn stage_index(stages: &[StageDescriptor], stage: &str) -> Option<usize> {
    stages.iter().position(|s| s.stage == stage)
}

/// Render a progress value as `3/4 (75%)`, or `-` without workflow context.
pub fn format_progress(p: &StageProgress) -> String {
    if p.is_known() {
        format!("{}/{} ({:.0}%)", p.current_index, p.total_stages, p.percentage)
    } else {
        "-".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{self, four_stages};

    fn at_stage(stage: Option<&str>) -> Task {
        let mut t = fixtures::task(1, "ZMF Caldera Closed", Some(10));
        t.stage = stage.map(str::to_string);
        t
    }

    #[test]
    fn qc_stage_in_four_stage_workflow() {
        let stages = four_stages();
        let task = at_stage(Some("qc"));
        let p = compute_progress(&task, &stages);
        assert_eq!(p.current_index, 3);
        assert_eq!(p.total_stages, 4);
        assert_eq!(p.percentage, 75.0);

        let next: Vec<&str> = next_stages(&task, &stages, DEFAULT_NEXT_STAGES)
            .iter()
            .map(|s| s.stage.as_str())
            .collect();
        assert_eq!(next, vec!["shipping"]);
    }

    #[test]
    fn position_is_one_based_for_every_stage() {
        let stages = four_stages();
        for (i, s) in stages.iter().enumerate() {
            let p = compute_progress(&at_stage(Some(&s.stage)), &stages);
            assert_eq!(p.current_index, i + 1);
            assert_eq!(p.percentage, (i + 1) as f64 / stages.len() as f64 * 100.0);
        }
    }

    #[test]
    fn unknown_stage_or_missing_workflow_is_zero() {
        let stages = four_stages();
        assert_eq!(compute_progress(&at_stage(Some("polishing")), &stages), StageProgress::NONE);
        assert_eq!(compute_progress(&at_stage(None), &stages), StageProgress::NONE);
        assert_eq!(compute_progress(&at_stage(Some("qc")), &[]), StageProgress::NONE);
        assert!(next_stages(&at_stage(Some("polishing")), &stages, 2).is_empty());
        assert!(next_stages(&at_stage(Some("qc")), &[], 2).is_empty());
    }

    #[test]
    fn next_stages_excludes_current_and_respects_count() {
        let stages = four_stages();
        let task = at_stage(Some("sanding"));
        let next = next_stages(&task, &stages, 2);
        assert_eq!(next.len(), 2);
        assert!(next.iter().all(|s| s.stage != "sanding"));
        assert_eq!(next[0].stage, "assembly");
        assert_eq!(next_stages(&task, &stages, 10).len(), 3);
        assert!(next_stages(&task, &stages, 0).is_empty());
    }

    #[test]
    fn next_stages_empty_at_final_stage() {
        assert!(next_stages(&at_stage(Some("shipping")), &four_stages(), 2).is_empty());
    }

    #[test]
    fn first_matching_descriptor_wins() {
        let mut stages = four_stages();
        stages.push(StageDescriptor::new("qc", "Final QC"));
        let p = compute_progress(&at_stage(Some("qc")), &stages);
        assert_eq!(p.current_index, 3);
        assert_eq!(p.total_stages, 5);
    }

    #[test]
    fn workflow_resolves_through_batch() {
        let db = fixtures::database();
        let batched = db.get(1).unwrap();
        assert_eq!(workflow_for_task(&db, batched).len(), 4);
        let loose = db.get(3).unwrap();
        assert!(workflow_for_task(&db, loose).is_empty());
    }

    #[test]
    fn test_format_progress() {
        let p = compute_progress(&at_stage(Some("qc")), &four_stages());
        assert_eq!(format_progress(&p), "3/4 (75%)");
        assert_eq!(format_progress(&StageProgress::NONE), "-");
    }
}
