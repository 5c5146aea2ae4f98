//! Task status transitions and stage moves.
//!
//! Status only advances `assigned -> in_progress -> completed`. `pause` and
//! `return to queue` are the only backward moves, and neither touches the
//! stage. Stage moves never go behind the batch's current stage.

use tracing::{debug, info, warn};

use crate::error::{ShopError, TransitionError};
use crate::fields::{TaskAction, TaskStatus};
use crate::task::{StageDescriptor, Task};
use crate::workflow::stage_index;

/// Status the task would have after `action`, or why it cannot happen.
pub fn next_status(task: &Task, action: TaskAction) -> Result<TaskStatus, TransitionError> {
    use TaskStatus::*;
    let next = match (task.status, action) {
        (Completed, _) => return Err(TransitionError::AlreadyCompleted { task_id: task.id }),
        (Assigned, TaskAction::Start) => InProgress,
        (InProgress, TaskAction::Pause) => Assigned,
        (InProgress, TaskAction::Complete) => Completed,
        (Assigned | InProgress, TaskAction::ReturnToQueue) => Assigned,
        (from, action) => {
            return Err(TransitionError::InvalidTransition {
                task_id: task.id,
                from,
                action,
            })
        }
    };
    Ok(next)
}

/// Apply `action` to the task, updating timestamps and assignment.
pub fn apply_action(
    task: &mut Task,
    action: TaskAction,
    now_utc: i64,
) -> Result<TaskStatus, TransitionError> {
    let next = next_status(task, action)?;
    match action {
        TaskAction::Start => {
            task.started_at_utc.get_or_insert(now_utc);
        }
        TaskAction::Complete => {
            task.completed_at_utc = Some(now_utc);
            if task.actual_minutes.is_none() {
                task.actual_minutes = task
                    .started_at_utc
                    .map(|started| elapsed_minutes(started, now_utc));
            }
        }
        TaskAction::ReturnToQueue => {
            task.worker_id = None;
        }
        TaskAction::Pause => {}
    }
    debug!(task_id = task.id, from = ?task.status, to = ?next, "status transition");
    task.status = next;
    task.updated_at_utc = now_utc;
    Ok(next)
}

/// Whole minutes between two UTC timestamps, clamped to the `u32` range.
fn elapsed_minutes(from_utc: i64, to_utc: i64) -> u32 {
    let minutes = to_utc.saturating_sub(from_utc).max(0) / 60;
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// Validate moving a task to `target` within `stages`.
///
/// Without a workflow any stage name is accepted. With one, the stage must
/// exist and must not precede the batch's current stage.
pub fn check_stage_move(
    stages: &[StageDescriptor],
    batch_current: Option<&str>,
    target: &str,
) -> Result<(), TransitionError> {
    if stages.is_empty() {
        return Ok(());
    }
    let Some(target_idx) = stage_index(stages, target) else {
        return Err(TransitionError::UnknownStage {
            stage: target.to_string(),
        });
    };
    if let Some(current) = batch_current {
        if let Some(current_idx) = stage_index(stages, current) {
            if target_idx < current_idx {
                return Err(TransitionError::BehindBatchStage {
                    stage: target.to_string(),
                    current: current.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Apply `op` to each item in order, stopping at the first failure.
///
/// Items applied before the failure stay applied. Returns the number of
/// items applied, or `ShopError::Partial` naming how far it got.
pub fn apply_sequential<T, F>(items: &[T], mut op: F) -> Result<usize, ShopError>
where
    F: FnMut(&T) -> Result<(), ShopError>,
{
    let total = items.len();
    for (applied, item) in items.iter().enumerate() {
        if let Err(source) = op(item) {
            warn!(applied, total, error = %source, "sequential operation stopped");
            return Err(ShopError::Partial {
                applied,
                total,
                source: Box::new(source),
            });
        }
    }
    info!(total, "sequential operation finished");
    Ok(total)
}
