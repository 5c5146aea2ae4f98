//! Task grouping for the worker task list.
//!
//! Tasks are partitioned by batch, with unbatched work in a reserved
//! `individual` bucket. Unbatched work can be further grouped by the headphone
//! model parsed from the product title. Both partitions keep input order
//! within each group and never drop or duplicate a task.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::fields::{Priority, TaskStatus};
use crate::task::Task;

/// Name of the bucket holding tasks without a batch.
pub const INDIVIDUAL: &str = "individual";

// Brand prefix followed by the model word, e.g. "ZMF Caldera Closed".
static MODEL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bZMF\s+(\w+)").unwrap());

/// Key of a batch group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Batch(u64),
    Individual,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Batch(id) => write!(f, "{}", id),
            GroupKey::Individual => f.write_str(INDIVIDUAL),
        }
    }
}

impl GroupKey {
    pub fn for_task(task: &Task) -> Self {
        task.batch_id.map(GroupKey::Batch).unwrap_or(GroupKey::Individual)
    }
}

/// Aggregate for one model within unbatched work.
#[derive(Debug, Clone, Default)]
pub struct ModelGroup<'a> {
    pub count: usize,
    pub tasks: Vec<&'a Task>,
    pub in_progress_count: usize,
    pub has_urgent: bool,
}

/// Partition tasks by batch, preserving input order within each group.
pub fn group_tasks<'a, I>(tasks: I) -> BTreeMap<GroupKey, Vec<&'a Task>>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut groups: BTreeMap<GroupKey, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        groups.entry(GroupKey::for_task(task)).or_default().push(task);
    }
    groups
}

/// Model name from a product title.
///
/// `ZMF <Model> ...` yields `<Model>`. Anything else falls back to the first
/// whitespace-delimited token, which may not be a real catalog model.
pub fn extract_model(product_name: &str) -> String {
    if let Some(caps) = MODEL_REGEX.captures(product_name) {
        return caps[1].to_string();
    }
    product_name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Group tasks by model name with per-model counts.
pub fn group_by_model<'a, I>(tasks: I) -> BTreeMap<String, ModelGroup<'a>>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut groups: BTreeMap<String, ModelGroup> = BTreeMap::new();
    for task in tasks {
        let group = groups.entry(extract_model(task.product_name())).or_default();
        group.count += 1;
        if task.status == TaskStatus::InProgress {
            group.in_progress_count += 1;
        }
        if task.priority == Priority::Urgent {
            group.has_urgent = true;
        }
        group.tasks.push(task);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::task;

    #[test]
    fn test_extract_model() {
        assert_eq!(extract_model("ZMF Caldera Closed"), "Caldera");
        assert_eq!(extract_model("ZMF Verite"), "Verite");
        assert_eq!(extract_model("Premium Cable"), "Premium");
        assert_eq!(extract_model("Repair: ZMF Atrium Open"), "Atrium");
        assert_eq!(extract_model("  Pads   Universe"), "Pads");
        assert_eq!(extract_model(""), "");
        assert_eq!(extract_model("ZMF"), "ZMF");
    }

    #[test]
    fn group_tasks_uses_individual_bucket_and_keeps_order() {
        let tasks = vec![
            task(1, "ZMF Verite Open", Some(10)),
            task(2, "Premium Cable", None),
            task(3, "ZMF Caldera Closed", Some(10)),
            task(4, "ZMF Auteur", Some(11)),
            task(5, "Pads", None),
        ];
        let groups = group_tasks(&tasks);

        let ids = |k: GroupKey| groups[&k].iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids(GroupKey::Batch(10)), vec![1, 3]);
        assert_eq!(ids(GroupKey::Batch(11)), vec![4]);
        assert_eq!(ids(GroupKey::Individual), vec![2, 5]);
        assert_eq!(GroupKey::Individual.to_string(), INDIVIDUAL);
    }

    #[test]
    fn group_tasks_partitions_without_loss() {
        let tasks: Vec<Task> = (1..=20)
            .map(|i| task(i, "ZMF Atrium", if i % 3 == 0 { None } else { Some(i % 4) }))
            .collect();
        let groups = group_tasks(&tasks);
        let total: usize = groups.values().map(Vec::len).sum();
        assert_eq!(total, tasks.len());

        let mut seen: Vec<u64> = groups.values().flatten().map(|t| t.id).collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn group_by_model_aggregates() {
        let mut a = task(1, "ZMF Caldera Closed", None);
        a.status = TaskStatus::InProgress;
        let mut b = task(2, "ZMF Caldera Open", None);
        b.priority = Priority::Urgent;
        let c = task(3, "ZMF Verite Closed", None);
        let d = task(4, "Premium Cable", None);
        let tasks = vec![a, b, c, d];

        let groups = group_by_model(&tasks);
        assert_eq!(groups.len(), 3);

        let caldera = &groups["Caldera"];
        assert_eq!(caldera.count, 2);
        assert_eq!(caldera.in_progress_count, 1);
        assert!(caldera.has_urgent);
        assert_eq!(caldera.tasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);

        let verite = &groups["Verite"];
        assert_eq!(verite.count, 1);
        assert_eq!(verite.in_progress_count, 0);
        assert!(!verite.has_urgent);

        assert_eq!(groups["Premium"].count, 1);
        assert_eq!(groups.values().map(|g| g.count).sum::<usize>(), tasks.len());
    }
}
