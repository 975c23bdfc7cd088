//! Pure aggregation over task collections
//!
//! Every figure that reaches a prompt or an API response (completion rate,
//! overdue set, priority buckets, sub-task progress) is computed here.

use crate::models::{Priority, Task};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Percentage of completed tasks, rounded to one decimal; 0 for no tasks
#[must_use]
pub fn completion_rate(tasks: &[Task]) -> f64 {
    percentage(completed(tasks).len(), tasks.len())
}

/// `part / total * 100` rounded to one decimal; 0 when `total` is 0
#[must_use]
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = part as f64 / total as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

/// A pending task whose due time is strictly before `now`
#[must_use]
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    !task.completed && task.due_date.is_some_and(|due| due < now)
}

/// Due on the same UTC calendar day as `now`
#[must_use]
pub fn is_due_today(task: &Task, now: DateTime<Utc>) -> bool {
    task.due_date
        .is_some_and(|due| due.date_naive() == now.date_naive())
}

/// Pending tasks due strictly before `now`, in input order
#[must_use]
pub fn overdue(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    tasks.iter().filter(|t| is_overdue(t, now)).collect()
}

#[must_use]
pub fn pending(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| !t.completed).collect()
}

#[must_use]
pub fn completed(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.completed).collect()
}

/// Bucket tasks by priority; tasks without one are left out
#[must_use]
pub fn group_by_priority<'a, I>(tasks: I) -> BTreeMap<Priority, Vec<&'a Task>>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut groups: BTreeMap<Priority, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        if let Some(priority) = task.priority {
            groups.entry(priority).or_default().push(task);
        }
    }
    groups
}

/// `(done, total)` over the task's sub-tasks
#[must_use]
pub fn mini_task_progress(task: &Task) -> (usize, usize) {
    let done = task.mini_tasks.values().filter(|done| **done).count();
    (done, task.mini_tasks.len())
}

/// Counts reported alongside a generated project summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskSummaryStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub completion_rate: f64,
}

impl TaskSummaryStats {
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            total_tasks: tasks.len(),
            completed_tasks: completed(tasks).len(),
            pending_tasks: pending(tasks).len(),
            completion_rate: completion_rate(tasks),
        }
    }
}

/// Counts reported alongside generated recommendations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationStats {
    pub total_pending_tasks: usize,
    pub high_priority_tasks: usize,
    pub overdue_tasks: usize,
    pub overdue_task_ids: Vec<i64>,
}

impl RecommendationStats {
    #[must_use]
    pub fn from_tasks(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let pending = pending(tasks);
        let high_priority_tasks = group_by_priority(pending.iter().copied())
            .get(&Priority::High)
            .map_or(0, Vec::len);
        let overdue_task_ids: Vec<i64> = overdue(tasks, now).iter().map(|t| t.id).collect();

        Self {
            total_pending_tasks: pending.len(),
            high_priority_tasks,
            overdue_tasks: overdue_task_ids.len(),
            overdue_task_ids,
        }
    }
}
