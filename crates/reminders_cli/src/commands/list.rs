//! List command implementation.

use reminders_protocol::Reminder;
use reminders_storage::ConfigPaths;

use crate::context::Context;
use crate::render;

/// Runs the list command.
///
/// With `parent`, shows only that reminder's direct children.
pub fn run(
    paths: &ConfigPaths,
    all: bool,
    list: Option<&str>,
    parent: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let context = Context::synced(paths)?;
    let engine = context.engine();
    let reminders = engine.get_reminders(all);

    let Some(parent) = parent else {
        print!("{}", render::reminders_by_list(&reminders, list));
        return Ok(());
    };

    let (parent_id, title) = match find_parent(&reminders, parent) {
        Some(found) => found,
        None => {
            let id = engine
                .find_reminder_by_id(parent)
                .ok_or_else(|| format!("parent reminder '{parent}' not found"))?;
            let title = engine
                .get_reminder(&id)
                .map_or_else(|| parent.to_string(), |r| r.title().to_string());
            (id, title)
        }
    };
    let children: Vec<&Reminder> = reminders
        .iter()
        .filter(|r| r.record.parent_ref.as_deref() == Some(parent_id.as_str()))
        .collect();
    print!("{}", render::children_of(&title, &children));
    Ok(())
}

/// Matches a title or a full short id, both case-insensitively.
fn find_parent(reminders: &[Reminder], wanted: &str) -> Option<(String, String)> {
    let wanted = wanted.to_lowercase();
    reminders
        .iter()
        .find(|r| r.title().to_lowercase() == wanted || r.short_id().to_lowercase() == wanted)
        .map(|r| (r.id.clone(), r.title().to_string()))
}
