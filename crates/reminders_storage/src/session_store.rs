//! Persisted session.

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use reminders_protocol::Session;
use tracing::warn;

/// Loads and saves the [`Session`] document.
#[derive(Debug)]
pub struct SessionStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> SessionStore<B> {
    /// Creates a store over `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Loads the persisted session.
    ///
    /// A missing document yields `None`. So does an unparseable one, after a
    /// warning, which forces a fresh sign-in instead of failing.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend cannot be read.
    pub fn load(&self) -> StorageResult<Option<Session>> {
        let Some(bytes) = self.backend.read()? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    /// Persists `session`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, session: &Session) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(session)?;
        self.backend.write(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryBackend;
    use reminders_protocol::Cookie;

    #[test]
    fn missing_session_loads_none() {
        let store = SessionStore::new(InMemoryBackend::new());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_session_loads_none() {
        let store = SessionStore::new(InMemoryBackend::with_data("{not json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let store = SessionStore::new(InMemoryBackend::new());
        let mut session = Session {
            storage_base_url: "https://ck.test".into(),
            trust_token: Some("trust".into()),
            cookies: vec![Cookie::new("X-APPLE-WEBAUTH-TOKEN", "v=2", ".icloud.com")],
            ..Session::default()
        };
        session.touch();
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));
    }
}
