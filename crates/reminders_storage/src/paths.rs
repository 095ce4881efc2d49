//! Default on-disk locations.

use std::path::{Path, PathBuf};

use crate::error::{StorageError, StorageResult};

/// Directory name under `~/.config`.
pub const CONFIG_DIR_NAME: &str = "icloud-reminders";

/// Locations of the session, cache, and credentials files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    dir: PathBuf,
}

impl ConfigPaths {
    /// Paths rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Paths rooted at `~/.config/icloud-reminders`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoHomeDir`] if the home directory is unknown.
    pub fn default_location() -> StorageResult<Self> {
        let home = dirs::home_dir().ok_or(StorageError::NoHomeDir)?;
        Ok(Self::new(home.join(".config").join(CONFIG_DIR_NAME)))
    }

    /// The config directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `session.json`.
    pub fn session_file(&self) -> PathBuf {
        self.dir.join("session.json")
    }

    /// `ck_cache.json`.
    pub fn cache_file(&self) -> PathBuf {
        self.dir.join("ck_cache.json")
    }

    /// `credentials`, an optional `export KEY="value"` file.
    pub fn credentials_file(&self) -> PathBuf {
        self.dir.join("credentials")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        let paths = ConfigPaths::new("/cfg");
        assert_eq!(paths.session_file(), PathBuf::from("/cfg/session.json"));
        assert_eq!(paths.cache_file(), PathBuf::from("/cfg/ck_cache.json"));
        assert_eq!(paths.credentials_file(), PathBuf::from("/cfg/credentials"));
    }
}
