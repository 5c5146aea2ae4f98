//! Command implementations for the CLI interface.
//!
//! Each subcommand loads the store once through `Shop`, runs one of the core
//! operations (grouping, progress, transitions, checkpoint gating) and writes
//! the store back when it changed.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Settings;
use crate::db::*;
use crate::error::{ShopError, TransitionError};
use crate::fields::*;
use crate::gate::{can_proceed, CheckpointSession, GateDecision};
use crate::grouping::{group_by_model, group_tasks, GroupKey};
use crate::lifecycle::{apply_action, apply_sequential, check_stage_move};
use crate::qc::{blocks_completion, sign_off_record, QcChecklist};
use crate::task::{OrderItem, Task};
use crate::workflow::{compute_progress, format_progress, next_stages, workflow_for_task};

#[derive(Subcommand)]
pub enum Commands {
    /// List tasks grouped by batch, or unbatched work by model.
    Tasks {
        /// Only tasks assigned to this worker.
        #[arg(long)]
        worker: Option<u64>,
        /// Grouping: batch | model.
        #[arg(long, value_enum, default_value_t = GroupBy::Batch)]
        by: GroupBy,
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
    },

    /// Show a task's position in its workflow and the stages that follow.
    Progress {
        id: u64,
        /// Number of upcoming stages to show.
        #[arg(long)]
        next: Option<usize>,
    },

    /// Start work on a task.
    Start { id: u64 },

    /// Pause a task in progress.
    Pause { id: u64 },

    /// Mark a task completed.
    Complete { id: u64 },

    /// Unassign a task and put it back in the queue.
    Requeue { id: u64 },

    /// Move a task to another workflow stage.
    Stage { id: u64, stage: String },

    /// Run the checkpoint configured for a task's stage.
    Inspect {
        id: u64,
        /// Checkpoint type: pre-work | post-work.
        #[arg(long = "type", value_enum)]
        checkpoint_type: CheckpointType,
        /// Check numbers that passed. Comma-separated, may be repeated.
        #[arg(long)]
        pass: Vec<String>,
        /// Check numbers that failed. Comma-separated, may be repeated.
        #[arg(long)]
        fail: Vec<String>,
        /// Photo reference for a check: N=reference.
        #[arg(long)]
        photo: Vec<String>,
        /// Measurement for a check: N=value.
        #[arg(long)]
        measure: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Final QC sign-off: visual, hardware and sound.
    Qc {
        id: u64,
        #[arg(long, value_enum)]
        visual: Option<QcOutcome>,
        #[arg(long, value_enum)]
        hardware: Option<QcOutcome>,
        #[arg(long, value_enum)]
        sound: Option<QcOutcome>,
        #[arg(long)]
        notes: Option<String>,
        /// Complete the task if the sign-off passes.
        #[arg(long)]
        complete: bool,
    },

    /// Assign tasks to a worker, one at a time.
    Assign {
        worker: u64,
        #[arg(required = true)]
        ids: Vec<u64>,
    },

    /// Import order line items from a JSON file as tasks.
    Import {
        input: PathBuf,
        /// Skip creating a backup before import.
        #[arg(long)]
        no_backup: bool,
    },

    /// List batches with their current stage.
    Batches,

    /// List the worker roster.
    Workers,

    /// List workflow templates.
    Workflows,

    /// List checkpoint configuration.
    Checkpoints {
        /// Only checkpoints for this stage.
        #[arg(long)]
        stage: Option<String>,
    },

    /// Create a timestamped backup of the store.
    Backup,

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Loaded store plus the settings it was opened with.
///
/// Reads use the copy loaded at startup. Every write goes through
/// `Database::transact`, which re-reads the file under a lock first.
pub struct Shop {
    pub db: Database,
    pub path: PathBuf,
    pub settings: Settings,
}

impl Shop {
    pub fn open(settings: Settings) -> Result<Self, ShopError> {
        let db = Database::load(&settings.store_path)?;
        Ok(Shop {
            db,
            path: settings.store_path.clone(),
            settings,
        })
    }

    #[cfg(test)]
    pub fn with_db(db: Database, path: PathBuf) -> Self {
        let settings = Settings {
            store_path: path.clone(),
            log_level: "warn".into(),
            next_stages: crate::workflow::DEFAULT_NEXT_STAGES,
        };
        Shop { db, path, settings }
    }

    fn task(&self, id: u64) -> Result<&Task, ShopError> {
        self.db.get(id).ok_or(ShopError::TaskNotFound(id))
    }
}

/// Dispatch a parsed command.
pub fn run(shop: &mut Shop, command: Commands) -> Result<(), ShopError> {
    match command {
        Commands::Tasks { worker, by, all } => cmd_tasks(shop, worker, by, all),
        Commands::Progress { id, next } => cmd_progress(shop, id, next),
        Commands::Start { id } => cmd_transition(shop, id, TaskAction::Start).map(|_| ()),
        Commands::Pause { id } => cmd_transition(shop, id, TaskAction::Pause).map(|_| ()),
        Commands::Complete { id } => cmd_transition(shop, id, TaskAction::Complete).map(|_| ()),
        Commands::Requeue { id } => {
            cmd_transition(shop, id, TaskAction::ReturnToQueue).map(|_| ())
        }
        Commands::Stage { id, stage } => cmd_stage(shop, id, stage),
        Commands::Inspect { id, checkpoint_type, pass, fail, photo, measure, notes } => {
            cmd_inspect(shop, id, checkpoint_type, pass, fail, photo, measure, notes).map(|_| ())
        }
        Commands::Qc { id, visual, hardware, sound, notes, complete } => {
            let form = QcChecklist { visual, hardware, sound, notes };
            cmd_qc(shop, id, form, complete)
        }
        Commands::Assign { worker, ids } => cmd_assign(shop, worker, &ids).map(|_| ()),
        Commands::Import { input, no_backup } => cmd_import(shop, &input, no_backup).map(|_| ()),
        Commands::Batches => cmd_batches(shop),
        Commands::Workers => cmd_workers(shop),
        Commands::Workflows => cmd_workflows(shop),
        Commands::Checkpoints { stage } => cmd_checkpoints(shop, stage),
        Commands::Backup => {
            let backup_path = create_backup(&shop.path).map_err(ShopError::Backup)?;
            println!("Backup created: {}", backup_path);
            Ok(())
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Print tasks as a table with their workflow progress.
fn print_table(db: &Database, tasks: &[&Task], next_count: usize) {
    println!(
        "  {:<5} {:<11} {:<7} {:<10} {:<10} {:<18} {}",
        "ID", "Status", "Pri", "Stage", "Progress", "Next", "Product"
    );
    for t in tasks {
        let stages = workflow_for_task(db, t);
        let progress = compute_progress(t, stages);
        let next = next_stages(t, stages, next_count)
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {:<5} {:<11} {:<7} {:<10} {:<10} {:<18} {}",
            t.id,
            format_status(t.status),
            format_priority(t.priority),
            truncate(t.stage.as_deref().unwrap_or("-"), 10),
            format_progress(&progress),
            truncate(if next.is_empty() { "-" } else { next.as_str() }, 18),
            t.product_name()
        );
    }
}

/// List tasks grouped by batch, optionally sub-grouping unbatched work by model.
pub fn cmd_tasks(
    shop: &Shop,
    worker: Option<u64>,
    by: GroupBy,
    all: bool,
) -> Result<(), ShopError> {
    let db = &shop.db;
    let candidates: Vec<&Task> = match worker {
        Some(w) => {
            db.worker(w).ok_or(ShopError::WorkerNotFound(w))?;
            db.tasks_for_worker(w)
        }
        None => db.tasks.iter().collect(),
    };
    let visible: Vec<&Task> = candidates
        .into_iter()
        .filter(|t| all || t.status != TaskStatus::Completed)
        .collect();

    if visible.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    let next_count = shop.settings.next_stages;
    for (key, tasks) in group_tasks(visible.iter().copied()) {
        match key {
            GroupKey::Batch(id) => {
                let (name, stage) = db
                    .batch(id)
                    .map(|b| (b.name.as_str(), b.current_stage.as_deref().unwrap_or("-")))
                    .unwrap_or(("(unknown batch)", "-"));
                println!("Batch {} - {} [stage: {}] ({} task(s))", id, name, stage, tasks.len());
                print_table(db, &tasks, next_count);
            }
            GroupKey::Individual if by == GroupBy::Model => {
                println!("Individual ({} task(s))", tasks.len());
                for (model, group) in group_by_model(tasks.iter().copied()) {
                    println!(
                        " {} x{} ({} in progress){}",
                        if model.is_empty() { "-" } else { model.as_str() },
                        group.count,
                        group.in_progress_count,
                        if group.has_urgent { " URGENT" } else { "" }
                    );
                    print_table(db, &group.tasks, next_count);
                }
            }
            GroupKey::Individual => {
                println!("Individual ({} task(s))", tasks.len());
                print_table(db, &tasks, next_count);
            }
        }
        println!();
    }
    Ok(())
}

/// Show where a task sits in its workflow.
pub fn cmd_progress(shop: &Shop, id: u64, next: Option<usize>) -> Result<(), ShopError> {
    let task = shop.task(id)?;
    let stages = workflow_for_task(&shop.db, task);
    let progress = compute_progress(task, stages);

    println!("Task:      {} ({})", task.id, task.product_name());
    println!("Stage:     {}", task.stage.as_deref().unwrap_or("-"));
    println!("Status:    {}", format_status(task.status));
    if !progress.is_known() {
        println!("Progress:  no workflow context");
        return Ok(());
    }
    println!("Progress:  {}", format_progress(&progress));
    let upcoming = next_stages(task, stages, next.unwrap_or(shop.settings.next_stages));
    if upcoming.is_empty() {
        println!("Next:      final stage");
    } else {
        println!("Next:");
        for s in upcoming {
            println!("  - {} ({})", s.name, s.stage);
        }
    }
    for checkpoint_type in [CheckpointType::PreWork, CheckpointType::PostWork] {
        if let Some(cp) = shop.db.checkpoint_for(task.stage.as_deref(), checkpoint_type) {
            println!(
                "{:?} checkpoint: {} check(s), on failure: {}",
                checkpoint_type,
                cp.checks.len(),
                format_policy(cp.on_failure)
            );
        }
    }
    Ok(())
}

/// Reject `action` unless the checkpoint guarding it has let the task through.
///
/// Starting is guarded by the pre-work checkpoint and completing by the
/// post-work checkpoint of the task's stage. A stage with no checklist never
/// blocks. Completion is also blocked by a failed final QC sign-off.
fn ensure_cleared(db: &Database, task: &Task, action: TaskAction) -> Result<(), ShopError> {
    let checkpoint_type = match action {
        TaskAction::Start => CheckpointType::PreWork,
        TaskAction::Complete => CheckpointType::PostWork,
        _ => return Ok(()),
    };
    if let Some(cp) = db.checkpoint_for(task.stage.as_deref(), checkpoint_type) {
        if !cp.checks.is_empty() {
            let blocked = |what: &str| ShopError::Blocked {
                task_id: task.id,
                reason: format!(
                    "{:?} checkpoint for stage '{}' {}",
                    checkpoint_type, cp.stage, what
                ),
            };
            match db.latest_checkpoint_attempt(task.id, cp.id) {
                None => return Err(blocked("has not been submitted")),
                Some(i) if !can_proceed(i.passed, Some(cp.on_failure)) => {
                    return Err(blocked("failed"))
                }
                Some(_) => {}
            }
        }
    }
    if action == TaskAction::Complete {
        if let Some(sign_off) = db.latest_qc_sign_off(task.id) {
            if !sign_off.passed {
                return Err(ShopError::Blocked {
                    task_id: task.id,
                    reason: "final QC sign-off failed".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn transition(
    db: &mut Database,
    id: u64,
    action: TaskAction,
    now: i64,
) -> Result<TaskStatus, ShopError> {
    let task = db.get(id).ok_or(ShopError::TaskNotFound(id))?;
    ensure_cleared(db, task, action)?;
    let task = db.get_mut(id).ok_or(ShopError::TaskNotFound(id))?;
    Ok(apply_action(task, action, now)?)
}

/// Issue a status transition for a task and persist it.
///
/// The task's current status is checked against the store as it is on disk,
/// so repeating an action another invocation already applied is rejected.
pub fn cmd_transition(
    shop: &mut Shop,
    id: u64,
    action: TaskAction,
) -> Result<TaskStatus, ShopError> {
    let now = Utc::now().timestamp();
    let status = shop
        .db
        .transact(&shop.path, |db| transition(db, id, action, now))?;
    info!(task_id = id, action = action.verb(), ?status, "task updated");
    println!("Task {} is now {}", id, format_status(status));
    Ok(status)
}

/// Move a task to another stage of its workflow.
pub fn cmd_stage(shop: &mut Shop, id: u64, stage: String) -> Result<(), ShopError> {
    shop.db.transact(&shop.path, |db| -> Result<(), ShopError> {
        let task = db.get(id).ok_or(ShopError::TaskNotFound(id))?;
        if task.status == TaskStatus::Completed {
            return Err(TransitionError::AlreadyCompleted { task_id: id }.into());
        }
        let stages = workflow_for_task(db, task);
        let batch_current = db.batch_for(task).and_then(|b| b.current_stage.as_deref());
        check_stage_move(stages, batch_current, &stage)?;
        let task = db.get_mut(id).ok_or(ShopError::TaskNotFound(id))?;
        task.stage = Some(stage.clone());
        task.updated_at_utc = Utc::now().timestamp();
        Ok(())
    })?;
    info!(task_id = id, %stage, "stage changed");
    println!("Task {} moved to stage {}", id, stage);
    Ok(())
}

/// What `cmd_inspect` did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InspectReport {
    pub decision: GateDecision,
    /// The pre-work pass moved the task from assigned to in progress.
    pub started: bool,
}

/// Run the configured checkpoint for a task and record the attempt.
#[allow(clippy::too_many_arguments)]
pub fn cmd_inspect(
    shop: &mut Shop,
    id: u64,
    checkpoint_type: CheckpointType,
    pass: Vec<String>,
    fail: Vec<String>,
    photo: Vec<String>,
    measure: Vec<String>,
    notes: Option<String>,
) -> Result<InspectReport, ShopError> {
    let task = shop.task(id)?;
    let config = shop.db.checkpoint_for(task.stage.as_deref(), checkpoint_type).cloned();
    let mut session = CheckpointSession::new(id, task.stage.clone(), checkpoint_type);
    session.open(config)?;

    if let Some(cp) = session.checkpoint() {
        for (i, check) in cp.checks.iter().enumerate() {
            for hint in &check.common_failures {
                println!("  hint for check {} ({}): {}", i + 1, check.description, hint);
            }
        }
        let passed = parse_check_list(&pass).map_err(ShopError::InvalidArgument)?;
        let failed = parse_check_list(&fail).map_err(ShopError::InvalidArgument)?;
        let passed_set: BTreeSet<usize> = passed.iter().copied().collect();
        if let Some(both) = failed.iter().find(|&&i| passed_set.contains(&i)) {
            return Err(ShopError::InvalidArgument(format!(
                "check {} is listed as both passed and failed",
                both + 1
            )));
        }
        for i in passed {
            session.answer(i, true)?;
        }
        for i in failed {
            session.answer(i, false)?;
        }
        for raw in &photo {
            let (i, reference) = parse_indexed(raw).map_err(ShopError::InvalidArgument)?;
            session.attach_photo(i, &reference)?;
        }
        for raw in &measure {
            let (i, value) = parse_indexed(raw).map_err(ShopError::InvalidArgument)?;
            let value: f64 = value
                .parse()
                .map_err(|_| ShopError::InvalidArgument(format!("'{}' is not a number", value)))?;
            session.record_measurement(i, value)?;
        }
        session.set_notes(notes);
    } else {
        println!("No {:?} checklist configured for this stage.", checkpoint_type);
    }

    let decision = session.submit()?;
    let worker_id = task.worker_id;
    let policy = session.checkpoint().map(|cp| cp.on_failure);

    let now = Utc::now().timestamp();
    let started = shop.db.transact(&shop.path, |db| -> Result<bool, ShopError> {
        if session.checkpoint().is_some() {
            let record = session.to_inspection(db.next_inspection_id(), worker_id, now)?;
            db.inspections.push(record);
        }
        if !decision.auto_start {
            return Ok(false);
        }
        let task = db.get_mut(id).ok_or(ShopError::TaskNotFound(id))?;
        if task.status != TaskStatus::Assigned {
            return Ok(false);
        }
        apply_action(task, TaskAction::Start, now)?;
        Ok(true)
    })?;

    println!("Checkpoint {}.", if decision.passed { "passed" } else { "failed" });
    if !decision.can_proceed {
        return Err(ShopError::Blocked {
            task_id: id,
            reason: format!("{:?} checkpoint failed", checkpoint_type),
        });
    }
    if !decision.passed {
        match policy {
            Some(FailurePolicy::WarnContinue) => {
                warn!(task_id = id, "checkpoint failed, continuing");
                println!("Warning: checkpoint failed; continuing.");
            }
            _ => info!(task_id = id, "checkpoint failure logged"),
        }
    }
    if started {
        info!(task_id = id, "task started by pre-work checkpoint");
        println!("Task {} started.", id);
    }
    Ok(InspectReport { decision, started })
}

/// Record a final QC sign-off; a failure blocks completion.
pub fn cmd_qc(
    shop: &mut Shop,
    id: u64,
    form: QcChecklist,
    complete: bool,
) -> Result<(), ShopError> {
    let worker_id = shop.task(id)?.worker_id;
    let (sign_off, session) = form.submit(id)?;
    let now = Utc::now().timestamp();
    shop.db.transact(&shop.path, |db| -> Result<(), ShopError> {
        let record = sign_off_record(&session, db.next_inspection_id(), worker_id, now)?;
        db.inspections.push(record);
        Ok(())
    })?;
    println!("QC {:?}", sign_off.overall);

    if blocks_completion(&sign_off) {
        warn!(task_id = id, "final QC failed");
        if complete {
            return Err(ShopError::Blocked {
                task_id: id,
                reason: "final QC sign-off failed".to_string(),
            });
        }
    } else if complete {
        cmd_transition(shop, id, TaskAction::Complete)?;
    }
    Ok(())
}

/// Assign tasks to a worker one by one, keeping earlier assignments on failure.
pub fn cmd_assign(shop: &mut Shop, worker: u64, ids: &[u64]) -> Result<usize, ShopError> {
    match shop.db.worker(worker) {
        None => return Err(ShopError::WorkerNotFound(worker)),
        Some(w) if !w.active => {
            return Err(ShopError::InvalidArgument(format!("worker {} is not active", w.name)))
        }
        Some(_) => {}
    }
    let path = shop.path.clone();
    let db = &mut shop.db;
    let applied = apply_sequential(ids, |&id| {
        db.transact(&path, |db| -> Result<(), ShopError> {
            let task = db.get_mut(id).ok_or(ShopError::TaskNotFound(id))?;
            if task.status == TaskStatus::Completed {
                return Err(TransitionError::AlreadyCompleted { task_id: id }.into());
            }
            task.worker_id = Some(worker);
            task.updated_at_utc = Utc::now().timestamp();
            Ok(())
        })
    })?;
    println!("Assigned {} task(s) to worker {}", applied, worker);
    Ok(applied)
}

/// One order line item in an import file.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportLine {
    pub order_number: Option<String>,
    pub product_name: String,
    #[serde(default = "default_task_type")]
    pub task_type: String,
    #[serde(default)]
    pub priority: Priority,
    pub stage: Option<String>,
    pub batch_id: Option<u64>,
    pub worker_id: Option<u64>,
    pub estimated_minutes: Option<u32>,
    pub notes: Option<String>,
}

fn default_task_type() -> String {
    "build".to_string()
}

fn import_line(db: &mut Database, line: &ImportLine, now: i64) -> Result<u64, ShopError> {
    if line.product_name.trim().is_empty() {
        return Err(ShopError::InvalidArgument("product_name is empty".to_string()));
    }
    if let Some(b) = line.batch_id {
        db.batch(b).ok_or(ShopError::BatchNotFound(b))?;
    }
    if let Some(w) = line.worker_id {
        db.worker(w).ok_or(ShopError::WorkerNotFound(w))?;
    }
    let id = db.next_task_id();
    db.tasks.push(Task {
        id,
        task_type: line.task_type.clone(),
        stage: line.stage.clone(),
        status: TaskStatus::Assigned,
        priority: line.priority,
        estimated_minutes: line.estimated_minutes,
        actual_minutes: None,
        notes: line.notes.clone(),
        order_item: OrderItem {
            order_number: line.order_number.clone(),
            product_name: line.product_name.trim().to_string(),
        },
        batch_id: line.batch_id,
        worker_id: line.worker_id,
        started_at_utc: None,
        completed_at_utc: None,
        created_at_utc: now,
        updated_at_utc: now,
    });
    Ok(id)
}

/// Import line items as tasks, one at a time, with a backup first.
pub fn cmd_import(shop: &mut Shop, input: &Path, no_backup: bool) -> Result<usize, ShopError> {
    let raw = fs::read_to_string(input).map_err(|source| ShopError::ImportRead {
        path: input.to_path_buf(),
        source,
    })?;
    let lines: Vec<ImportLine> =
        serde_json::from_str(&raw).map_err(|source| ShopError::ImportParse {
            path: input.to_path_buf(),
            source,
        })?;

    if !no_backup && shop.path.exists() {
        let backup_path = create_backup(&shop.path).map_err(ShopError::Backup)?;
        println!("Created backup: {}", backup_path);
    }

    let path = shop.path.clone();
    let db = &mut shop.db;
    let now = Utc::now().timestamp();
    let imported = apply_sequential(&lines, |line| {
        let id = db.transact(&path, |db| import_line(db, line, now))?;
        info!(task_id = id, product = %line.product_name, "imported line item");
        Ok(())
    })?;
    println!("Imported {} task(s)", imported);
    Ok(imported)
}

/// List batches with their workflow position.
pub fn cmd_batches(shop: &Shop) -> Result<(), ShopError> {
    let db = &shop.db;
    let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
    for t in &db.tasks {
        if let Some(b) = t.batch_id {
            *counts.entry(b).or_default() += 1;
        }
    }
    println!("{:<5} {:<20} {:<12} {:<20} {}", "ID", "Name", "Stage", "Workflow", "Tasks");
    for b in &db.batches {
        let workflow = b
            .workflow_template_id
            .and_then(|id| db.workflow(id))
            .map(|w| w.name.as_str())
            .unwrap_or("-");
        println!(
            "{:<5} {:<20} {:<12} {:<20} {}",
            b.id,
            truncate(&b.name, 20),
            truncate(b.current_stage.as_deref().unwrap_or("-"), 12),
            truncate(workflow, 20),
            counts.get(&b.id).copied().unwrap_or(0)
        );
    }
    Ok(())
}

/// List the roster with open task counts.
pub fn cmd_workers(shop: &Shop) -> Result<(), ShopError> {
    println!("{:<5} {:<20} {:<8} {:<9} {}", "ID", "Name", "Active", "Assigned", "In Progress");
    for w in &shop.db.workers {
        let tasks = shop.db.tasks_for_worker(w.id);
        let count = |s: TaskStatus| tasks.iter().filter(|t| t.status == s).count();
        println!(
            "{:<5} {:<20} {:<8} {:<9} {}",
            w.id,
            truncate(&w.name, 20),
            if w.active { "yes" } else { "no" },
            count(TaskStatus::Assigned),
            count(TaskStatus::InProgress)
        );
    }
    Ok(())
}

/// List workflow templates and their stages.
pub fn cmd_workflows(shop: &Shop) -> Result<(), ShopError> {
    for w in &shop.db.workflows {
        let stages = w
            .stages
            .iter()
            .map(|s| s.stage.as_str())
            .collect::<Vec<_>>()
            .join(" -> ");
        println!("{:<5} {:<20} {}", w.id, truncate(&w.name, 20), stages);
    }
    Ok(())
}

/// List checkpoint configuration with failure hints.
pub fn cmd_checkpoints(shop: &Shop, stage: Option<String>) -> Result<(), ShopError> {
    let selected = shop
        .db
        .checkpoints
        .iter()
        .filter(|c| stage.as_deref().map_or(true, |s| c.stage == s));
    for cp in selected {
        println!(
            "{} {:?} ({:?}, on failure: {})",
            cp.stage,
            cp.checkpoint_type,
            cp.severity,
            format_policy(cp.on_failure)
        );
        for (i, check) in cp.checks.iter().enumerate() {
            let mut flags = Vec::new();
            if check.requires_photo {
                flags.push("photo");
            }
            if check.requires_measurement {
                flags.push("measurement");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            println!("  {}. {}{}", i + 1, check.description, flags);
            if let Some(criteria) = &check.acceptance_criteria {
                println!("     accept: {}", criteria);
            }
            for hint in &check.common_failures {
                println!("     watch for: {}", hint);
            }
        }
    }
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Copy the store into a timestamped file under `backup/` next to it.
pub fn create_backup(db_path: &Path) -> Result<String, std::io::Error> {
    if !db_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Store file does not exist",
        ));
    }

    let parent_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let db_filename = db_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("shopfloor.json");

    let backup_path = backup_dir.join(format!("{}_{}", timestamp, db_filename));
    fs::copy(db_path, &backup_path)?;

    Ok(backup_path.to_string_lossy().to_string())
}
