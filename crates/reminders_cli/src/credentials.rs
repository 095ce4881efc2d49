//! Terminal credential sources.
//!
//! Lookup order for each of the account name and password: environment,
//! then the credentials file, then an interactive prompt.

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use reminders_auth::{AuthError, AuthResult, CredentialProvider, Credentials};
use tracing::debug;

/// Environment variable and file key for the account name.
pub const USERNAME_KEY: &str = "ICLOUD_USERNAME";
/// Environment variable and file key for the password.
pub const PASSWORD_KEY: &str = "ICLOUD_PASSWORD";

/// Whatever subset of the credentials a source provided.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FoundCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl FoundCredentials {
    fn from_env() -> Self {
        Self {
            username: env::var(USERNAME_KEY).ok().and_then(non_empty),
            password: env::var(PASSWORD_KEY).ok().and_then(non_empty),
        }
    }

    fn is_complete(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Fills missing values from `fallback`.
    fn or(self, fallback: Self) -> Self {
        Self {
            username: self.username.or(fallback.username),
            password: self.password.or(fallback.password),
        }
    }
}

/// Parses `KEY=value` lines, with an optional `export ` prefix and quotes.
pub fn parse_credentials_file(contents: &str) -> FoundCredentials {
    let mut found = FoundCredentials::default();
    for line in contents.lines() {
        let line = line.trim();
        let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = non_empty(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string());
        match key.trim() {
            USERNAME_KEY => found.username = value,
            PASSWORD_KEY => found.password = value,
            _ => {}
        }
    }
    found
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Reads credentials from the environment, a file, or the terminal.
#[derive(Debug, Clone)]
pub struct TerminalCredentials {
    credentials_file: PathBuf,
}

impl TerminalCredentials {
    /// Uses `credentials_file` as the second source.
    pub fn new(credentials_file: PathBuf) -> Self {
        Self { credentials_file }
    }

    /// Combines `first` with the credentials file, `first` winning.
    fn with_file(&self, first: FoundCredentials) -> FoundCredentials {
        if first.is_complete() {
            return first;
        }
        match fs::read_to_string(&self.credentials_file) {
            Ok(contents) => first.or(parse_credentials_file(&contents)),
            Err(e) => {
                debug!(path = %self.credentials_file.display(), error = %e, "no credentials file");
                first
            }
        }
    }
}

impl CredentialProvider for TerminalCredentials {
    fn credentials(&self) -> AuthResult<Credentials> {
        eprintln!("Signing in to iCloud (SRP)...");
        let found = self.with_file(FoundCredentials::from_env());

        let username = match found.username {
            Some(username) => username,
            None => prompt_line("Apple ID: ")?,
        };
        let password = match found.password {
            Some(password) => password,
            None => rpassword::prompt_password("Password: ")
                .map(|p| p.trim().to_string())
                .map_err(|e| AuthError::credentials(format!("read password: {e}")))?,
        };

        if username.is_empty() || password.is_empty() {
            return Err(AuthError::credentials("Apple ID and password are required"));
        }
        Ok(Credentials::new(username, password))
    }

    fn two_factor_code(&self) -> AuthResult<String> {
        eprintln!("Two-factor authentication required.");
        let code = prompt_line("Enter 2FA code: ")?;
        if code.is_empty() {
            return Err(AuthError::credentials("no two-factor code entered"));
        }
        Ok(code)
    }
}

fn prompt_line(prompt: &str) -> AuthResult<String> {
    let read = || -> io::Result<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{prompt}")?;
        stderr.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    };
    read().map_err(|e| AuthError::credentials(format!("read input: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_export_lines() {
        let found = parse_credentials_file(
            "# iCloud\nexport ICLOUD_USERNAME=\"me@example.com\"\nexport ICLOUD_PASSWORD='s3cret'\n",
        );
        assert_eq!(found.username.as_deref(), Some("me@example.com"));
        assert_eq!(found.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn parses_bare_lines_and_ignores_others() {
        let found = parse_credentials_file("OTHER=1\n  ICLOUD_USERNAME=plain  \nnonsense\n");
        assert_eq!(found.username.as_deref(), Some("plain"));
        assert_eq!(found.password, None);
    }

    #[test]
    fn empty_values_count_as_missing() {
        let found = parse_credentials_file("ICLOUD_USERNAME=\"\"\nICLOUD_PASSWORD=");
        assert_eq!(found, FoundCredentials::default());
    }

    #[test]
    fn password_may_contain_equals() {
        let found = parse_credentials_file("ICLOUD_PASSWORD=a=b");
        assert_eq!(found.password.as_deref(), Some("a=b"));
    }

    #[test]
    fn earlier_source_wins() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("credentials");
        fs::write(&file, "ICLOUD_USERNAME=file-user\nICLOUD_PASSWORD=file-pass\n").unwrap();
        let provider = TerminalCredentials::new(file);

        let from_env = FoundCredentials {
            username: Some("env-user".to_string()),
            password: None,
        };
        let found = provider.with_file(from_env);
        assert_eq!(found.username.as_deref(), Some("env-user"));
        assert_eq!(found.password.as_deref(), Some("file-pass"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let provider = TerminalCredentials::new(dir.path().join("absent"));
        assert_eq!(
            provider.with_file(FoundCredentials::default()),
            FoundCredentials::default()
        );
    }
}
