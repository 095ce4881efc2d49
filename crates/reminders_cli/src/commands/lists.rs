//! Lists command implementation.

use reminders_storage::ConfigPaths;

use crate::context::Context;
use crate::render;

/// Runs the lists command.
pub fn run(paths: &ConfigPaths) -> Result<(), Box<dyn std::error::Error>> {
    let context = Context::synced(paths)?;
    let engine = context.engine();
    let counts = render::active_counts(&engine.get_reminders(false));
    print!("{}", render::lists(&engine.get_lists(), &counts));
    Ok(())
}
