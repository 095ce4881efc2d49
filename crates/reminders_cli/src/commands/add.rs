//! Add and add-batch command implementations.

use reminders_protocol::Priority;
use reminders_storage::ConfigPaths;
use reminders_sync_engine::NewReminder;

use crate::context::Context;

const LIST_REQUIRED: &str = "list is required (use -l \"<list-name>\")";

/// Flags of the add command.
#[derive(Debug, Clone)]
pub struct AddArgs {
    pub title: String,
    pub list: Option<String>,
    pub due: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
    pub parent: Option<String>,
}

impl AddArgs {
    fn into_new_reminder(self) -> Result<NewReminder, Box<dyn std::error::Error>> {
        let list = self.list.ok_or(LIST_REQUIRED)?;
        let priority = self
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()?
            .unwrap_or_default();

        let mut new = NewReminder::new(self.title)
            .with_list(list)
            .with_priority(priority);
        if let Some(due) = self.due {
            new = new.with_due(due);
        }
        if let Some(notes) = self.notes {
            new = new.with_notes(notes);
        }
        if let Some(parent) = self.parent {
            new = new.with_parent(parent);
        }
        Ok(new)
    }
}

/// Runs the add command.
pub fn run(paths: &ConfigPaths, args: AddArgs) -> Result<(), Box<dyn std::error::Error>> {
    let new = args.into_new_reminder()?;
    let parent = subtask_suffix("subtask", new.parent.as_deref());

    let context = Context::synced(paths)?;
    let created = context.writer().create(new)?;
    println!(
        "✅ Added: '{}' → {}{}  ({})",
        created.title(),
        created.list_name,
        parent,
        created.short_id()
    );
    Ok(())
}

/// Runs the add-batch command.
pub fn run_batch(
    paths: &ConfigPaths,
    titles: &[String],
    list: Option<&str>,
    parent: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let list = list.ok_or(LIST_REQUIRED)?;

    let context = Context::synced(paths)?;
    let created = context.writer().create_batch(titles, Some(list), parent)?;
    let list_name = created.first().map_or(list, |r| r.list_name.as_str());
    println!(
        "✅ Added {} reminders → {}{}:",
        created.len(),
        list_name,
        subtask_suffix("subtasks", parent)
    );
    for reminder in &created {
        println!("   • {}", reminder.title());
    }
    Ok(())
}

fn subtask_suffix(noun: &str, parent: Option<&str>) -> String {
    parent.map_or_else(String::new, |p| format!(" ({noun} of {p})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> AddArgs {
        AddArgs {
            title: "Buy milk".to_string(),
            list: Some("Shopping".to_string()),
            due: None,
            priority: None,
            notes: None,
            parent: None,
        }
    }

    #[test]
    fn list_is_required() {
        let err = AddArgs { list: None, ..args() }.into_new_reminder().unwrap_err();
        assert_eq!(err.to_string(), LIST_REQUIRED);
    }

    #[test]
    fn flags_map_onto_new_reminder() {
        let new = AddArgs {
            due: Some("2026-03-01".to_string()),
            priority: Some("High".to_string()),
            notes: Some("2%".to_string()),
            parent: Some("ABC".to_string()),
            ..args()
        }
        .into_new_reminder()
        .unwrap();
        assert_eq!(
            new,
            NewReminder::new("Buy milk")
                .with_list("Shopping")
                .with_due("2026-03-01")
                .with_priority(Priority::High)
                .with_notes("2%")
                .with_parent("ABC")
        );
    }

    #[test]
    fn unknown_priority_is_rejected() {
        let result = AddArgs {
            priority: Some("urgent".to_string()),
            ..args()
        }
        .into_new_reminder();
        assert!(result.is_err());
    }

    #[test]
    fn suffixes() {
        assert_eq!(subtask_suffix("subtask", None), "");
        assert_eq!(subtask_suffix("subtasks", Some("AB")), " (subtasks of AB)");
    }
}
