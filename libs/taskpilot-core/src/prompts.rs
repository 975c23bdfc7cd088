//! Prompt text for the summary and recommendation endpoints
//!
//! Builders are pure: the same tasks and `now` always give the same text.
//! All counts come from [`crate::insights`].

use crate::insights::{self, is_due_today, is_overdue, mini_task_progress, percentage};
use crate::models::{Priority, Task};
use chrono::{DateTime, Utc};
use std::fmt::Write;
use taskpilot_common::format_due;

/// System instructions sent with summary prompts
pub const SUMMARY_INSTRUCTIONS: &str = "You are TaskPilot AI, a project assistant. \
Describe the current state of the user's tasks objectively and concisely. \
Do not give advice unless asked.";

/// System instructions sent with recommendation prompts
pub const RECOMMENDATION_INSTRUCTIONS: &str = "You are TaskPilot AI, a practical task helper. \
Give only actionable advice, without repeating task details. Be direct and brief.";

const EMPTY_SUMMARY_PROMPT: &str = "I currently have no tasks in my project. Please provide a \
brief overview of how to get started with task management and project organization.";

const EMPTY_RECOMMENDATION_PROMPT: &str = "I have no tasks currently. Please provide \
recommendations on how to start organizing and planning tasks effectively.";

const ALL_COMPLETED_PROMPT: &str = "All my tasks are completed! Please provide recommendations \
for maintaining productivity and planning future tasks.";

const SUMMARY_INSTRUCTIONS_TAIL: &str = "
Analyze my project status and provide a summary covering:
• Current state: completion rate, task distribution by priority
• Timeline status: what's on track, overdue, or approaching deadlines
• Project health: patterns in task types, progress on sub-tasks, bottlenecks, or notable progress

Focus on describing what IS, not what I should DO. Keep it informative but concise (3 sentences).";

const RECOMMENDATION_TAIL: &str = "

Give me quick action items - NO explanations:

🔥 **Today:** What's my #1 task?
📅 **This Week:** Top 2 priorities?
⏰ **Time:** Quick estimates?

Keep it super brief!";

/// Render one task as the multi-line block embedded in prompts
#[must_use]
pub fn format_task_details(task: &Task, now: DateTime<Utc>) -> String {
    let mut lines = vec![format!("Title: {}", task.title)];

    if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("Description: {description}"));
    }

    lines.push(format!(
        "Status: {}",
        if task.completed { "✅ Completed" } else { "⏳ Pending" }
    ));

    if let Some(priority) = task.priority {
        lines.push(format!(
            "Priority: {} {}",
            priority.marker(),
            priority.as_str().to_uppercase()
        ));
    }

    if let Some(due) = task.due_date {
        let due_line = if is_overdue(task, now) {
            "⚠️ OVERDUE".to_string()
        } else if is_due_today(task, now) {
            "📅 Due Today".to_string()
        } else {
            format!("📅 Due: {}", format_due(&due))
        };
        lines.push(due_line);
    }

    if !task.tags.is_empty() {
        lines.push(format!("Tags: {}", task.tags.join(", ")));
    }

    if !task.mini_tasks.is_empty() {
        let (done, total) = mini_task_progress(task);
        lines.push(format!("Sub-tasks: {done}/{total} completed"));
        for (label, finished) in &task.mini_tasks {
            lines.push(format!("  {} {label}", if *finished { "✅" } else { "⏳" }));
        }
    }

    lines.push(format!("Created: {}", format_due(&task.created_at)));
    lines.join("\n")
}

/// Prompt asking for a short description of the project's state
#[must_use]
pub fn build_summary_prompt(tasks: &[Task], now: DateTime<Utc>) -> String {
    if tasks.is_empty() {
        return EMPTY_SUMMARY_PROMPT.to_string();
    }

    let completed = insights::completed(tasks);
    let pending = insights::pending(tasks);
    let overdue = insights::overdue(tasks, now);
    let priorities = insights::group_by_priority(tasks);

    let mut prompt = String::from(
        "I need a comprehensive but short summary of my current project status. \
         Here are all my tasks with detailed information:\n\n",
    );

    prompt.push_str("📊 OVERVIEW:\n");
    let _ = writeln!(prompt, "Total tasks: {}", tasks.len());
    let _ = writeln!(
        prompt,
        "Completed: {} ({:.1}%)",
        completed.len(),
        insights::completion_rate(tasks)
    );
    let _ = writeln!(
        prompt,
        "Pending: {} ({:.1}%)",
        pending.len(),
        percentage(pending.len(), tasks.len())
    );
    if !priorities.is_empty() {
        let distribution: Vec<String> = priorities
            .iter()
            .rev()
            .map(|(priority, group)| format!("{} {}", group.len(), priority.as_str()))
            .collect();
        let _ = writeln!(prompt, "By priority: {}", distribution.join(", "));
    }
    prompt.push('\n');

    // Overdue tasks are listed once, in their own section.
    let on_schedule: Vec<&Task> = pending
        .iter()
        .copied()
        .filter(|t| !is_overdue(t, now))
        .collect();
    let high_priority = insights::group_by_priority(on_schedule.iter().copied())
        .remove(&Priority::High)
        .unwrap_or_default();
    let other_pending: Vec<&Task> = on_schedule
        .iter()
        .copied()
        .filter(|t| !high_priority.iter().any(|h| std::ptr::eq(*h, *t)))
        .collect();

    push_section(&mut prompt, "⚠️ OVERDUE TASKS", &overdue, now);
    push_section(&mut prompt, "🔴 HIGH PRIORITY PENDING TASKS", &high_priority, now);
    push_section(&mut prompt, "📋 OTHER PENDING TASKS", &other_pending, now);
    push_section(&mut prompt, "✅ COMPLETED TASKS", &completed, now);

    prompt.push_str(SUMMARY_INSTRUCTIONS_TAIL);
    prompt
}

/// Prompt asking what to work on next
#[must_use]
pub fn build_recommendation_prompt(tasks: &[Task], now: DateTime<Utc>) -> String {
    if tasks.is_empty() {
        return EMPTY_RECOMMENDATION_PROMPT.to_string();
    }

    let pending = insights::pending(tasks);
    if pending.is_empty() {
        return ALL_COMPLETED_PROMPT.to_string();
    }

    let mut prompt = String::from(
        "I need intelligent task prioritization recommendations. \
         Here are my pending tasks with complete details:\n\n",
    );
    let _ = writeln!(prompt, "📅 Current time: {}", now.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(prompt, "📋 Total pending tasks: {}\n", pending.len());

    prompt.push_str("PENDING TASKS:\n");
    for (i, task) in pending.iter().enumerate() {
        let _ = write!(prompt, "\n{}. {}\n", i + 1, format_task_details(task, now));
    }

    let completed = insights::completed(tasks);
    if !completed.is_empty() {
        prompt.push_str("\n✅ COMPLETED TASKS (for context):\n");
        for task in completed {
            let _ = writeln!(
                prompt,
                "- {} (created {})",
                task.title,
                task.created_at.format("%Y-%m-%d")
            );
        }
    }

    prompt.push_str(RECOMMENDATION_TAIL);
    prompt
}

fn push_section(prompt: &mut String, heading: &str, tasks: &[&Task], now: DateTime<Utc>) {
    if tasks.is_empty() {
        return;
    }
    let _ = writeln!(prompt, "{heading} ({}):", tasks.len());
    for task in tasks {
        let _ = write!(prompt, "{}\n\n", format_task_details(task, now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_mock_tasks, fixed_now, task, TaskFixtureExt};
    use chrono::Duration;

    #[test]
    fn test_empty_prompts_are_onboarding_text() {
        let summary = build_summary_prompt(&[], fixed_now());
        let recommendation = build_recommendation_prompt(&[], fixed_now());

        assert!(summary.starts_with("I currently have no tasks"));
        assert!(recommendation.starts_with("I have no tasks currently"));
    }

    #[test]
    fn test_all_completed_recommendation() {
        let now = fixed_now();
        let tasks = vec![task(1, "done", now).completed()];
        assert!(build_recommendation_prompt(&tasks, now).starts_with("All my tasks are completed!"));
    }

    #[test]
    fn test_summary_sections() {
        let now = fixed_now();
        let prompt = build_summary_prompt(&create_mock_tasks(now), now);

        assert!(prompt.contains("Total tasks: 3"));
        assert!(prompt.contains("Completed: 1 (33.3%)"));
        assert!(prompt.contains("Pending: 2 (66.7%)"));
        assert!(prompt.contains("By priority: 1 high"));
        assert!(prompt.contains("⚠️ OVERDUE TASKS (1):"));
        assert!(prompt.contains("📋 OTHER PENDING TASKS (1):"));
        assert!(prompt.contains("✅ COMPLETED TASKS (1):"));
        assert!(!prompt.contains("HIGH PRIORITY PENDING TASKS"));
        assert!(prompt.ends_with("(3 sentences)."));
    }

    #[test]
    fn test_overdue_task_listed_once() {
        let now = fixed_now();
        let prompt = build_summary_prompt(&create_mock_tasks(now), now);
        assert_eq!(prompt.matches("Title: Fix login bug").count(), 1);
    }

    #[test]
    fn test_pending_sections_split_by_priority() {
        let now = fixed_now();
        let tasks = vec![
            task(1, "Draft roadmap", now + Duration::days(3)).with_priority(Priority::High),
            task(2, "Tidy backlog", now + Duration::days(5)),
            task(3, "Book venue", now + Duration::days(4)).with_priority(Priority::Low),
            task(4, "Patch outage", now - Duration::days(1)).with_priority(Priority::High),
        ];
        let prompt = build_summary_prompt(&tasks, now);

        let high = prompt.find("🔴 HIGH PRIORITY PENDING TASKS (1):").unwrap();
        let other = prompt.find("📋 OTHER PENDING TASKS (2):").unwrap();
        let roadmap = prompt.find("Title: Draft roadmap").unwrap();
        let backlog = prompt.find("Title: Tidy backlog").unwrap();
        let venue = prompt.find("Title: Book venue").unwrap();
        assert!(high < roadmap && roadmap < other);
        assert!(other < backlog && backlog < venue);
        assert_eq!(prompt.matches("Title: Patch outage").count(), 1);
        assert!(prompt.contains("By priority: 2 high, 1 low"));
    }

    #[test]
    fn test_summary_is_deterministic_for_fixed_now() {
        let now = fixed_now();
        let tasks = create_mock_tasks(now);
        assert_eq!(build_summary_prompt(&tasks, now), build_summary_prompt(&tasks, now));
    }

    #[test]
    fn test_recommendation_prompt() {
        let now = fixed_now();
        let prompt = build_recommendation_prompt(&create_mock_tasks(now), now);

        assert!(prompt.contains("📅 Current time: 2024-06-15 12:00 UTC"));
        assert!(prompt.contains("📋 Total pending tasks: 2"));
        assert!(prompt.contains("\n1. Title: Fix login bug"));
        assert!(prompt.contains("\n2. Title: Plan team offsite"));
        assert!(prompt.contains("- Submit expense report (created 2024-06-08)"));
        assert!(prompt.ends_with("Keep it super brief!"));
    }

    #[test]
    fn test_format_task_details_full() {
        let now = fixed_now();
        let mut t = task(7, "Ship release", now + Duration::days(2))
            .with_priority(Priority::High)
            .with_mini_tasks(&[("changelog", true), ("tag", false)]);
        t.description = Some("Version 2.0".to_string());
        t.tags = vec!["release".to_string(), "backend".to_string()];

        let details = format_task_details(&t, now);
        let lines: Vec<&str> = details.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Title: Ship release",
                "Description: Version 2.0",
                "Status: ⏳ Pending",
                "Priority: 🔴 HIGH",
                "📅 Due: 2024-06-17 12:00",
                "Tags: release, backend",
                "Sub-tasks: 1/2 completed",
                "  ✅ changelog",
                "  ⏳ tag",
                "Created: 2024-06-08 12:00",
            ]
        );
    }

    #[test]
    fn test_format_due_states() {
        let now = fixed_now();
        let late = format_task_details(&task(1, "late", now - Duration::hours(1)), now);
        assert!(late.contains("⚠️ OVERDUE"));

        let today = format_task_details(&task(2, "today", now + Duration::hours(1)), now);
        assert!(today.contains("📅 Due Today"));

        let done_late = format_task_details(&task(3, "done", now - Duration::days(2)).completed(), now);
        assert!(done_late.contains("Status: ✅ Completed"));
        assert!(!done_late.contains("OVERDUE"));
    }
}
