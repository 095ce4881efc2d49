//! Sync command implementation.

use reminders_storage::ConfigPaths;

use crate::context::Context;

/// Runs the sync command.
pub fn run(paths: &ConfigPaths, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let context = Context::open(paths)?;
    let result = context.sync(force)?;
    let cache = context.engine().cache();

    println!("✅ Sync complete.");
    println!(
        "   {} sync: {} changes in {} pages, {} reminders ({} active), {} lists",
        if result.full { "Full" } else { "Delta" },
        result.records,
        result.pages,
        cache.reminders.len(),
        cache.active_count(),
        cache.lists.len(),
    );
    Ok(())
}
