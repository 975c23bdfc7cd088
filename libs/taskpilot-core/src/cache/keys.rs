//! Cache key derivation
//!
//! Keys have the form `{namespace}:{endpoint}:{digest}`. The digest covers
//! the canonical form of every task, so two collections holding the same
//! tasks in a different order map to the same key.

use crate::models::Task;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Bytes of the SHA-256 output kept in the key
const DIGEST_BYTES: usize = 16;

/// Derive the cache key for `tasks` under `endpoint`
#[must_use]
pub fn fingerprint(namespace: &str, endpoint: &str, tasks: &[Task]) -> String {
    format!("{namespace}:{endpoint}:{}", task_digest(tasks))
}

/// Hex digest over the canonical, order-independent form of `tasks`
#[must_use]
pub fn task_digest(tasks: &[Task]) -> String {
    let mut lines: Vec<String> = tasks.iter().map(canonical_task).collect();
    lines.sort_unstable();

    let hash = Sha256::digest(lines.join("\n").as_bytes());
    hex::encode(&hash[..DIGEST_BYTES])
}

/// One task as compact JSON with object keys in sorted order
fn canonical_task(task: &Task) -> String {
    // Task serialization cannot fail: every map in it is keyed by strings.
    let value = serde_json::to_value(task).unwrap_or(Value::Null);
    sort_keys(value).to_string()
}

/// Rebuild objects with keys inserted in sorted order, at every depth
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, sort_keys(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn task(id: i64, completed: bool) -> Task {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        Task {
            id,
            title: format!("Task {id}"),
            description: Some("details".to_string()),
            due_date: Some(created + Duration::days(id)),
            completed,
            created_at: created,
            owner_id: 1,
            priority: Some(Priority::Medium),
            tags: vec!["work".to_string(), "q3".to_string()],
            mini_tasks: BTreeMap::from([("draft".to_string(), true), ("review".to_string(), false)]),
        }
    }

    #[test]
    fn test_key_format() {
        let key = fingerprint("ai_cache", "summary", &[task(1, false)]);
        let parts: Vec<&str> = key.split(':').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ai_cache");
        assert_eq!(parts[1], "summary");
        assert_eq!(parts[2].len(), DIGEST_BYTES * 2);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_endpoint_is_part_of_key() {
        let tasks = [task(1, false)];
        assert_ne!(
            fingerprint("ai_cache", "summary", &tasks),
            fingerprint("ai_cache", "recommendations", &tasks)
        );
    }

    #[test]
    fn test_empty_collection_has_stable_key() {
        assert_eq!(task_digest(&[]), task_digest(&[]));
        assert_ne!(task_digest(&[]), task_digest(&[task(1, false)]));
    }

    #[test]
    fn test_canonical_form_sorts_keys() {
        let canonical = canonical_task(&task(1, false));
        let completed = canonical.find("\"completed\"").unwrap();
        let title = canonical.find("\"title\"").unwrap();
        let created = canonical.find("\"created_at\"").unwrap();
        assert!(completed < created);
        assert!(created < title);
    }

    #[test]
    fn test_sort_keys_nested() {
        let value = serde_json::json!({"b": {"z": 1, "a": 2}, "a": [{"y": 1, "x": 2}]});
        assert_eq!(
            sort_keys(value).to_string(),
            r#"{"a":[{"x":2,"y":1}],"b":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn test_every_field_changes_key() {
        let original = task(1, false);
        let edits: [(&str, fn(&mut Task)); 14] = [
            ("id", |t| t.id = 2),
            ("title", |t| t.title.push('!')),
            ("description", |t| t.description = Some("other".to_string())),
            ("description cleared", |t| t.description = None),
            ("due_date", |t| t.due_date = t.due_date.map(|d| d + Duration::hours(1))),
            ("due_date cleared", |t| t.due_date = None),
            ("completed", |t| t.completed = true),
            ("created_at", |t| t.created_at += Duration::seconds(1)),
            ("owner_id", |t| t.owner_id = 2),
            ("priority", |t| t.priority = Some(Priority::High)),
            ("priority cleared", |t| t.priority = None),
            ("tags", |t| t.tags.push("urgent".to_string())),
            ("mini_tasks flag", |t| {
                t.mini_tasks.insert("review".to_string(), true);
            }),
            ("mini_tasks entry", |t| {
                t.mini_tasks.insert("publish".to_string(), false);
            }),
        ];

        let baseline = task_digest(std::slice::from_ref(&original));
        for (field, edit) in edits {
            let mut changed = original.clone();
            edit(&mut changed);
            assert_ne!(baseline, task_digest(&[changed]), "{field}");
        }
    }

    #[test]
    fn test_tag_order_is_significant() {
        let a = task(1, false);
        let mut b = a.clone();
        b.tags.reverse();
        assert_ne!(task_digest(&[a]), task_digest(&[b]));
    }

    proptest! {
        #[test]
        fn prop_order_independent(count in 1usize..8, rotation in 0usize..8) {
            let tasks: Vec<Task> = (1..=count as i64).map(|id| task(id, id % 2 == 0)).collect();
            let mut shuffled = tasks.clone();
            shuffled.rotate_left(rotation % count);
            shuffled.reverse();

            prop_assert_eq!(
                fingerprint("ai_cache", "summary", &tasks),
                fingerprint("ai_cache", "summary", &shuffled)
            );
        }

        #[test]
        fn prop_completed_flag_changes_key(count in 1usize..8, index in 0usize..8) {
            let tasks: Vec<Task> = (1..=count as i64).map(|id| task(id, false)).collect();
            let mut changed = tasks.clone();
            changed[index % count].completed = true;

            prop_assert_ne!(task_digest(&tasks), task_digest(&changed));
        }

        #[test]
        fn prop_title_changes_key(title in "[a-zA-Z0-9 ]{1,40}") {
            let original = task(1, false);
            let mut changed = original.clone();
            changed.title = format!("{} {}", original.title, title);

            prop_assert_ne!(task_digest(&[original]), task_digest(&[changed]));
        }
    }
}
