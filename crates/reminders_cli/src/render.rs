//! Text and JSON rendering for command output.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write;

use reminders_protocol::{short_id, Priority, Reminder, ReminderList};
use serde::Serialize;

const INDENT: usize = 2;

fn status(reminder: &Reminder) -> &'static str {
    if reminder.is_completed() {
        "✓"
    } else {
        "•"
    }
}

fn due_suffix(reminder: &Reminder) -> String {
    match reminder.record.due.as_deref() {
        Some(due) if !due.is_empty() => format!("  [due {due}]"),
        _ => String::new(),
    }
}

fn priority_suffix(reminder: &Reminder) -> String {
    match reminder.record.priority() {
        Priority::None => String::new(),
        priority => format!("  [{priority}]"),
    }
}

/// `• Title  [due 2026-03-01]  [high]  (ABC123)`, indented by `indent`.
pub fn reminder_line(reminder: &Reminder, indent: usize) -> String {
    format!(
        "{:indent$}{} {}{}{}  ({})",
        "",
        status(reminder),
        reminder.title(),
        due_suffix(reminder),
        priority_suffix(reminder),
        reminder.short_id(),
    )
}

fn newest_first(items: &mut [&Reminder]) {
    items.sort_by_key(|r| Reverse(r.record.modified_ts.unwrap_or(0)));
}

fn write_tree(
    out: &mut String,
    reminder: &Reminder,
    indent: usize,
    children: &HashMap<&str, Vec<&Reminder>>,
) {
    let _ = writeln!(out, "{}", reminder_line(reminder, indent));
    if let Some(kids) = children.get(reminder.id.as_str()) {
        let mut kids = kids.clone();
        newest_first(&mut kids);
        for kid in kids {
            write_tree(out, kid, indent + INDENT, children);
        }
    }
}

/// Reminders grouped by list name, subtasks nested under their parent.
///
/// A subtask whose parent is not shown is listed at the top level of its
/// list.
pub fn reminders_by_list(reminders: &[Reminder], list_filter: Option<&str>) -> String {
    let wanted = list_filter.map(str::to_lowercase);
    let shown: Vec<&Reminder> = reminders
        .iter()
        .filter(|r| wanted.as_ref().map_or(true, |w| r.list_name.to_lowercase() == *w))
        .collect();
    let ids: HashSet<&str> = shown.iter().map(|r| r.id.as_str()).collect();

    let mut by_list: BTreeMap<&str, Vec<&Reminder>> = BTreeMap::new();
    let mut children: HashMap<&str, Vec<&Reminder>> = HashMap::new();
    for reminder in shown {
        match reminder.record.parent_ref.as_deref().filter(|p| ids.contains(p)) {
            Some(parent) => children.entry(parent).or_default().push(reminder),
            None => by_list.entry(&reminder.list_name).or_default().push(reminder),
        }
    }

    let active = reminders.iter().filter(|r| !r.is_completed()).count();
    let mut out = format!("\n✅ Reminders: {} ({} active)\n", reminders.len(), active);
    for (name, mut items) in by_list {
        let total = items.len()
            + items
                .iter()
                .map(|r| children.get(r.id.as_str()).map_or(0, Vec::len))
                .sum::<usize>();
        let _ = write!(out, "\n📋 {name} ({total})\n");
        newest_first(&mut items);
        for reminder in items {
            write_tree(&mut out, reminder, INDENT, &children);
        }
    }
    out
}

/// Direct children of one parent, newest first.
pub fn children_of(parent_title: &str, children: &[&Reminder]) -> String {
    let mut children = children.to_vec();
    newest_first(&mut children);
    let mut out = format!("\n📋 {} ({} items)\n", parent_title, children.len());
    for child in children {
        let _ = writeln!(out, "{}", reminder_line(child, INDENT));
    }
    out
}

/// Lists sorted by name with their active counts.
pub fn lists(lists: &[ReminderList], active: &HashMap<String, usize>) -> String {
    let mut sorted: Vec<&ReminderList> = lists.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = format!("\n📋 Lists ({})\n", sorted.len());
    for list in sorted {
        let count = active.get(&list.id).copied().unwrap_or(0);
        let short: String = short_id(&list.id).chars().take(8).collect();
        let _ = writeln!(out, "  • {} ({} active)  [{}]", list.name, count, short);
    }
    out
}

/// Active reminders per list identifier.
pub fn active_counts(reminders: &[Reminder]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for reminder in reminders.iter().filter(|r| !r.is_completed()) {
        if let Some(list) = &reminder.record.list_ref {
            *counts.entry(list.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Search hits with their list names.
pub fn search_results(query: &str, matches: &[Reminder]) -> String {
    let mut out = format!("\n🔍 Search: '{}' → {} matches\n", query, matches.len());
    for reminder in matches {
        let _ = writeln!(
            out,
            "  {} {}{}  ({}) — {}",
            status(reminder),
            reminder.title(),
            due_suffix(reminder),
            reminder.short_id(),
            reminder.list_name,
        );
    }
    out
}

/// The `json` command's document.
#[derive(Debug, Serialize)]
pub struct JsonExport {
    pub lists: Vec<ReminderList>,
    pub active: Vec<Reminder>,
    pub completed: Vec<Reminder>,
}

impl JsonExport {
    /// Splits `reminders` by completion.
    pub fn new(lists: Vec<ReminderList>, reminders: Vec<Reminder>) -> Self {
        let (completed, active) = reminders.into_iter().partition(Reminder::is_completed);
        Self {
            lists,
            active,
            completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reminders_protocol::ReminderRecord;

    fn reminder(id: &str, title: &str, list: &str) -> Reminder {
        Reminder {
            id: format!("Reminder/{id}"),
            list_name: list.to_string(),
            record: ReminderRecord {
                title: title.to_string(),
                list_ref: Some(format!("List/{list}")),
                ..ReminderRecord::default()
            },
        }
    }

    #[test]
    fn line_with_annotations() {
        let mut r = reminder("ABC", "Buy milk", "Shopping");
        assert_eq!(reminder_line(&r, 2), "  • Buy milk  (ABC)");

        r.record.due = Some("2026-03-01".to_string());
        r.record.priority = 1;
        r.record.completed = true;
        assert_eq!(
            reminder_line(&r, 0),
            "✓ Buy milk  [due 2026-03-01]  [high]  (ABC)"
        );
    }

    #[test]
    fn grouped_and_nested() {
        let mut old = reminder("A", "Old", "Work");
        old.record.modified_ts = Some(1);
        let mut new = reminder("B", "New", "Work");
        new.record.modified_ts = Some(2);
        let mut sub = reminder("C", "Sub", "Work");
        sub.record.parent_ref = Some("Reminder/A".to_string());
        let home = reminder("D", "Dishes", "Home");

        let out = reminders_by_list(&[old, new, sub, home], None);
        let expected = "\n✅ Reminders: 4 (4 active)\n\
            \n📋 Home (1)\n  • Dishes  (D)\n\
            \n📋 Work (3)\n  • New  (B)\n  • Old  (A)\n    • Sub  (C)\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn list_filter_is_case_insensitive() {
        let items = [reminder("A", "One", "Work"), reminder("B", "Two", "Home")];
        let out = reminders_by_list(&items, Some("work"));
        assert!(out.contains("📋 Work (1)"));
        assert!(!out.contains("Home"));
    }

    #[test]
    fn orphaned_subtask_is_top_level() {
        let mut sub = reminder("C", "Sub", "Work");
        sub.record.parent_ref = Some("Reminder/GONE".to_string());
        let out = reminders_by_list(&[sub], None);
        assert!(out.contains("\n📋 Work (1)\n  • Sub  (C)\n"));
    }

    #[test]
    fn children_listing() {
        let a = reminder("A", "Eggs", "Shopping");
        let out = children_of("Groceries", &[&a]);
        assert_eq!(out, "\n📋 Groceries (1 items)\n  • Eggs  (A)\n");
    }

    #[test]
    fn lists_sorted_with_counts() {
        let all = vec![
            ReminderList {
                id: "List/ZZZ-1234567890".to_string(),
                name: "Work".to_string(),
            },
            ReminderList {
                id: "List/Home".to_string(),
                name: "Home".to_string(),
            },
        ];
        let mut done = reminder("B", "Done", "Home");
        done.record.completed = true;
        let counts = active_counts(&[reminder("A", "One", "Home"), done]);

        let out = lists(&all, &counts);
        assert_eq!(
            out,
            "\n📋 Lists (2)\n  • Home (1 active)  [Home]\n  • Work (0 active)  [ZZZ-1234]\n"
        );
    }

    #[test]
    fn search_output() {
        let out = search_results("milk", &[reminder("A", "Buy milk", "Shopping")]);
        assert_eq!(
            out,
            "\n🔍 Search: 'milk' → 1 matches\n  • Buy milk  (A) — Shopping\n"
        );
    }

    #[test]
    fn json_export_splits_by_completion() {
        let mut done = reminder("B", "Done", "Home");
        done.record.completed = true;
        let export = JsonExport::new(Vec::new(), vec![reminder("A", "Open", "Home"), done]);
        assert_eq!(export.active.len(), 1);
        assert_eq!(export.completed.len(), 1);

        let value = serde_json::to_value(&export).unwrap();
        assert_eq!(value["active"][0]["title"], "Open");
        assert_eq!(value["completed"][0]["id"], "Reminder/B");
        assert!(value["lists"].as_array().unwrap().is_empty());
    }
}
