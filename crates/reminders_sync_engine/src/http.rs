//! Record transport over the storage service's JSON API.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::RecordTransport;
use reminders_http::{HttpClient, HttpRequest, HttpSession};
use reminders_protocol::cloudkit::{
    endpoint_url, ChangesRequest, ChangesResponse, Endpoint, ModifyRequest, ModifyResponse,
    RecordOperation, ZoneId, ZonesListResponse,
};
use reminders_protocol::{cookie_hosts, Session};

const ORIGIN: &str = "https://www.icloud.com";

/// [`RecordTransport`] backed by an authenticated HTTP session.
#[derive(Debug)]
pub struct HttpRecordTransport<C: HttpClient> {
    base_url: String,
    config: SyncConfig,
    http: HttpSession<C>,
}

impl<C: HttpClient> HttpRecordTransport<C> {
    /// Creates a transport for the storage service at `base_url`.
    ///
    /// The session starts with no cookies.
    pub fn new(base_url: impl Into<String>, client: C, config: SyncConfig) -> Self {
        let http = HttpSession::new(client).with_retry(config.retry.clone());
        Self {
            base_url: base_url.into(),
            config,
            http,
        }
    }

    /// Creates a transport that reuses `session`'s cookies.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingSession`] if the session has no storage
    /// service URL.
    pub fn from_session(session: &Session, client: C, config: SyncConfig) -> SyncResult<Self> {
        if !session.is_usable() {
            return Err(SyncError::MissingSession);
        }
        let transport = Self::new(session.storage_base_url.clone(), client, config);
        transport
            .http
            .restore_cookies(&session.cookies, &cookie_hosts(&session.storage_base_url));
        Ok(transport)
    }

    /// Storage service base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying HTTP session.
    pub fn http(&self) -> &HttpSession<C> {
        &self.http
    }

    fn zone_id(&self, owner: &str) -> ZoneId {
        ZoneId::new(self.config.zone_name.clone(), owner)
    }

    fn post<Req, Res>(&self, endpoint: Endpoint, body: &Req) -> SyncResult<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let url = endpoint_url(
            &self.base_url,
            &self.config.container,
            &self.config.environment,
            endpoint,
        );
        debug!(endpoint = endpoint.as_str(), "database request");
        let request = HttpRequest::post_json(url, body)?
            .header("Accept", "application/json")
            .header("Origin", ORIGIN)
            .header("Referer", format!("{ORIGIN}/"));
        let response = self.http.expect_success(&request)?;
        Ok(response.json()?)
    }
}

impl<C: HttpClient> RecordTransport for HttpRecordTransport<C> {
    fn discover_owner(&self) -> SyncResult<String> {
        let zones: ZonesListResponse = self.post(Endpoint::ZonesList, &json!({}))?;
        zones
            .owner_of(&self.config.zone_name)
            .map(str::to_string)
            .ok_or(SyncError::NoZones)
    }

    fn fetch_changes(&self, owner: &str, cursor: Option<&str>) -> SyncResult<ChangesResponse> {
        let request = ChangesRequest::new(self.zone_id(owner), &self.config.desired_keys, cursor);
        self.post(Endpoint::ChangesZone, &request)
    }

    fn modify_records(
        &self,
        owner: &str,
        operations: Vec<RecordOperation>,
    ) -> SyncResult<ModifyResponse> {
        let request = ModifyRequest::atomic(self.zone_id(owner), operations);
        self.post(Endpoint::RecordsModify, &request)
    }
}
