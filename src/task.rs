//! Task, batch and workflow data structures.
//!
//! These mirror the records served by the production database: a `Task` is
//! one unit of assignable work, a `Batch` groups tasks that travel through the
//! same `WorkflowTemplate`, and a `Worker` is an entry in the roster.

use serde::{Deserialize, Serialize};

use crate::fields::*;

/// The order line item a task was planned from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub order_number: Option<String>,
    pub product_name: String,
}

/// A unit of production or repair work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: u64,
    pub task_type: String,
    pub stage: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    pub estimated_minutes: Option<u32>,
    pub actual_minutes: Option<u32>,
    pub notes: Option<String>,
    #[serde(default)]
    pub order_item: OrderItem,
    pub batch_id: Option<u64>,
    pub worker_id: Option<u64>,
    pub started_at_utc: Option<i64>,
    pub completed_at_utc: Option<i64>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl Task {
    /// Product title of the line item this task belongs to.
    pub fn product_name(&self) -> &str {
        &self.order_item.product_name
    }
}

/// A named production run sharing one workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    pub id: u64,
    pub name: String,
    pub current_stage: Option<String>,
    pub workflow_template_id: Option<u64>,
}

/// One stage of a workflow: the key tasks carry and a display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageDescriptor {
    pub stage: String,
    pub name: String,
}

impl StageDescriptor {
    pub fn new(stage: &str, name: &str) -> Self {
        StageDescriptor {
            stage: stage.to_string(),
            name: name.to_string(),
        }
    }
}

/// Ordered list of production stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowTemplate {
    pub id: u64,
    pub name: String,
    pub stages: Vec<StageDescriptor>,
}

/// A member of the workshop roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Worker {
    pub id: u64,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
