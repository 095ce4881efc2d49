//! JSON export command implementation.

use reminders_storage::ConfigPaths;

use crate::context::Context;
use crate::render::JsonExport;

/// Runs the json command.
pub fn run(paths: &ConfigPaths) -> Result<(), Box<dyn std::error::Error>> {
    let context = Context::synced(paths)?;
    let engine = context.engine();
    let export = JsonExport::new(engine.get_lists(), engine.get_reminders(true));
    println!("{}", serde_json::to_string_pretty(&export)?);
    Ok(())
}
