//! Auth command implementation.

use reminders_storage::ConfigPaths;

use crate::context::authenticator;
use crate::credentials::TerminalCredentials;

/// Runs the auth command.
pub fn run(paths: &ConfigPaths, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = TerminalCredentials::new(paths.credentials_file());
    let session = authenticator(paths)?.ensure_session(&credentials, force)?;

    println!("✅ Authenticated");
    println!("   CK base: {}", session.storage_base_url);
    if session.trust_token.as_deref().is_some_and(|t| !t.is_empty()) {
        println!("   Trust token: saved (won't need 2FA next time)");
    }
    Ok(())
}
