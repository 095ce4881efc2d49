//! Complete, delete and edit command implementations.

use reminders_storage::ConfigPaths;
use reminders_sync_engine::ReminderEdit;

use crate::context::Context;

/// Runs the complete command.
pub fn complete(paths: &ConfigPaths, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let context = Context::synced(paths)?;
    let done = context.writer().complete(id)?;
    println!("✅ Completed: {}  ({})", done.title(), done.short_id());
    Ok(())
}

/// Runs the delete command.
pub fn delete(paths: &ConfigPaths, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let context = Context::synced(paths)?;
    let removed = context.writer().delete(id)?;
    println!("✅ Deleted: {}  ({})", removed.title(), removed.short_id());
    Ok(())
}

/// Runs the edit command.
pub fn edit(
    paths: &ConfigPaths,
    id: &str,
    edit: ReminderEdit,
) -> Result<(), Box<dyn std::error::Error>> {
    if edit.is_empty() {
        return Err("nothing to change (use --title, --due, --notes or --priority)".into());
    }
    let context = Context::synced(paths)?;
    let updated = context.writer().edit(id, edit)?;
    println!("✅ Updated: {}  ({})", updated.title(), updated.short_id());
    Ok(())
}
