//! Per-invocation wiring: session, transport, cache and writer.

use std::error::Error;
use std::sync::Arc;

use reminders_auth::{AuthConfig, Authenticator};
use reminders_http::ReqwestClient;
use reminders_storage::{ConfigPaths, FileBackend};
use reminders_sync_engine::{
    HttpRecordTransport, SyncConfig, SyncCycleResult, SyncEngine, Writer,
};
use tracing::info;

use crate::credentials::TerminalCredentials;

pub type Transport = HttpRecordTransport<ReqwestClient>;
pub type Engine = SyncEngine<Transport, FileBackend>;

/// An authenticator over the session file in `paths`.
pub fn authenticator(
    paths: &ConfigPaths,
) -> Result<Authenticator<ReqwestClient, FileBackend>, Box<dyn Error>> {
    Ok(Authenticator::new(
        AuthConfig::default(),
        ReqwestClient::new()?,
        FileBackend::new(&paths.session_file()),
    ))
}

/// Everything a command needs after signing in.
pub struct Context {
    engine: Arc<Engine>,
    writer: Writer<Transport, FileBackend>,
}

impl Context {
    /// Reuses or refreshes the saved session and loads the cache.
    pub fn open(paths: &ConfigPaths) -> Result<Self, Box<dyn Error>> {
        let credentials = TerminalCredentials::new(paths.credentials_file());
        let session = authenticator(paths)?
            .ensure_session(&credentials, false)
            .map_err(|e| format!("not authenticated: {e} (run 'reminders auth')"))?;

        let config = SyncConfig::default();
        let transport =
            HttpRecordTransport::from_session(&session, ReqwestClient::new()?, config.clone())?;
        let engine = Arc::new(SyncEngine::new(
            config,
            transport,
            FileBackend::new(&paths.cache_file()),
        ));
        let writer = Writer::new(Arc::clone(&engine));
        Ok(Self { engine, writer })
    }

    /// Opens the context and runs a delta sync.
    pub fn synced(paths: &ConfigPaths) -> Result<Self, Box<dyn Error>> {
        let context = Self::open(paths)?;
        context.sync(false)?;
        Ok(context)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn writer(&self) -> &Writer<Transport, FileBackend> {
        &self.writer
    }

    /// Pulls changes; `force` refetches everything.
    pub fn sync(&self, force: bool) -> Result<SyncCycleResult, Box<dyn Error>> {
        let result = self.engine.sync(force)?;
        info!(
            pages = result.pages,
            records = result.records,
            full = result.full,
            "sync finished in {:?}",
            result.duration
        );
        Ok(result)
    }
}
