//! Search command implementation.

use reminders_storage::ConfigPaths;

use crate::context::Context;
use crate::render;

/// Runs the search command.
pub fn run(paths: &ConfigPaths, query: &str, all: bool) -> Result<(), Box<dyn std::error::Error>> {
    let context = Context::synced(paths)?;
    let matches = context.engine().search(query, all);
    print!("{}", render::search_results(query, &matches));
    Ok(())
}
