//! Session establishment.
//!
//! A persisted session is reused when a probe of the storage service
//! succeeds. A stale one gets exactly one token-only refresh. Everything
//! else falls through to the full SRP handshake, with a one-time code when
//! the account asks for it.

use std::sync::atomic::{AtomicBool, Ordering};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use reminders_http::{HttpClient, HttpRequest, HttpResponse, HttpSession};
use reminders_protocol::cloudkit::{endpoint_url, Endpoint, CONTAINER, ENVIRONMENT};
use reminders_protocol::{cookie_hosts, Session};
use reminders_storage::{SessionStore, StorageBackend};

use crate::config::AuthConfig;
use crate::credentials::{CredentialProvider, Credentials};
use crate::error::{AuthError, AuthResult};
use crate::headers::{HandshakeHeaders, AUTH_ATTRIBUTES_HEADER, TRUST_TOKEN_HEADER};
use crate::srp::{derive_password_key, PasswordProtocol, SrpClient};

/// Cookie holding the session token when no header carried one.
pub const SESSION_TOKEN_COOKIE: &str = "X-APPLE-DS-WEB-SESSION-TOKEN";

/// Where the authenticator is in establishing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Nothing attempted yet.
    Idle,
    /// Checking whether a persisted session still works.
    SessionProbe,
    /// Exchanging the stored token for fresh cookies.
    RefreshAttempt,
    /// Starting an interactive sign-in.
    FullAuth,
    /// Loading the sign-in page.
    Init,
    /// Submitting the account name.
    Federate,
    /// Running the SRP exchange.
    SrpExchange,
    /// Waiting for the one-time code.
    AwaitCode,
    /// Submitting the one-time code.
    Verify,
    /// Fetching the trust token.
    TrustFetch,
    /// Exchanging the session token for service URLs.
    ServiceExchange,
    /// A usable session is available.
    Ready,
    /// The last attempt failed.
    Failed,
}

#[derive(Debug, Deserialize)]
struct SigninInit {
    #[serde(default)]
    iteration: u32,
    salt: String,
    #[serde(default)]
    protocol: String,
    b: String,
    #[serde(default)]
    c: Value,
}

/// Outcome of the service exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ServiceInfo {
    storage_base_url: String,
    account_id: Option<String>,
}

/// Establishes and persists authenticated sessions.
pub struct Authenticator<C: HttpClient, B: StorageBackend> {
    config: AuthConfig,
    http: HttpSession<C>,
    store: SessionStore<B>,
    state: RwLock<AuthState>,
    two_factor_required: AtomicBool,
}

impl<C: HttpClient, B: StorageBackend> Authenticator<C, B> {
    /// Creates an authenticator sending through `client` and persisting to
    /// `backend`.
    pub fn new(config: AuthConfig, client: C, backend: B) -> Self {
        let http = HttpSession::new(client).with_retry(config.retry.clone());
        Self {
            config,
            http,
            store: SessionStore::new(backend),
            state: RwLock::new(AuthState::Idle),
            two_factor_required: AtomicBool::new(false),
        }
    }

    /// Current state.
    pub fn state(&self) -> AuthState {
        *self.state.read()
    }

    /// Whether the last sign-in asked for a one-time code.
    pub fn two_factor_required(&self) -> bool {
        self.two_factor_required.load(Ordering::SeqCst)
    }

    /// The configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// The HTTP session carrying the cookie jar.
    pub fn http(&self) -> &HttpSession<C> {
        &self.http
    }

    /// The session store.
    pub fn store(&self) -> &SessionStore<B> {
        &self.store
    }

    fn set_state(&self, state: AuthState) {
        debug!(?state, "auth state");
        *self.state.write() = state;
    }

    /// Returns a usable session, reusing or refreshing the persisted one
    /// unless `force_reauth` is set.
    ///
    /// `provider` is only consulted when a full sign-in is needed.
    ///
    /// # Errors
    ///
    /// Credential errors are returned verbatim. Transport failures surface
    /// once their retry budget is spent.
    pub fn ensure_session(
        &self,
        provider: &dyn CredentialProvider,
        force_reauth: bool,
    ) -> AuthResult<Session> {
        let result = self.establish(provider, force_reauth);
        match &result {
            Ok(_) => self.set_state(AuthState::Ready),
            Err(_) => self.set_state(AuthState::Failed),
        }
        result
    }

    fn establish(
        &self,
        provider: &dyn CredentialProvider,
        force_reauth: bool,
    ) -> AuthResult<Session> {
        let previous = self.store.load()?;
        let trust_token = previous.as_ref().and_then(|s| s.trust_token.clone());

        if !force_reauth {
            if let Some(saved) = previous.filter(Session::is_usable) {
                if let Some(session) = self.reuse(saved) {
                    return Ok(session);
                }
            }
        }

        self.full_auth(provider, trust_token)
    }

    fn reuse(&self, mut session: Session) -> Option<Session> {
        self.set_state(AuthState::SessionProbe);
        info!("trying saved session");
        self.http.clear_cookies();
        self.http.restore_cookies(
            &session.cookies,
            &cookie_hosts(&session.storage_base_url),
        );

        if self.probe(&session.storage_base_url) {
            info!("session reused");
            return Some(session);
        }

        self.set_state(AuthState::RefreshAttempt);
        info!("probe failed, refreshing session");
        match self.refresh(&mut session) {
            Ok(()) => {
                self.persist(&session);
                info!("session refreshed");
                Some(session)
            }
            Err(e) => {
                warn!(error = %e, "session refresh failed, signing in again");
                None
            }
        }
    }

    /// POSTs `{}` to the zone listing endpoint.
    fn probe(&self, storage_base_url: &str) -> bool {
        let url = endpoint_url(storage_base_url, CONTAINER, ENVIRONMENT, Endpoint::ZonesList);
        let Ok(request) = HttpRequest::post_json(url, &json!({})) else {
            return false;
        };
        let request = self.with_web_origin(request);
        match self.http.send(&request) {
            Ok(response) => response.is_success(),
            Err(e) => {
                debug!(error = %e, "probe failed");
                false
            }
        }
    }

    fn refresh(&self, session: &mut Session) -> AuthResult<()> {
        let token = session
            .session_token
            .clone()
            .or_else(|| self.http.cookie(SESSION_TOKEN_COOKIE))
            .ok_or(AuthError::MissingField {
                step: "refresh",
                field: "session token",
            })?;
        let info = self.service_exchange(
            &token,
            session.account_country.as_deref(),
            session.account_id.as_deref(),
        )?;
        session.storage_base_url = info.storage_base_url;
        if info.account_id.is_some() {
            session.account_id = info.account_id;
        }
        session.cookies = self.http.extract_cookies();
        session.touch();
        Ok(())
    }

    fn full_auth(
        &self,
        provider: &dyn CredentialProvider,
        trust_token: Option<String>,
    ) -> AuthResult<Session> {
        self.set_state(AuthState::FullAuth);
        info!("signing in");
        self.http.clear_cookies();
        self.two_factor_required.store(false, Ordering::SeqCst);

        let credentials = provider.credentials()?;
        let mut headers = HandshakeHeaders::new();

        self.set_state(AuthState::Init);
        self.start(&mut headers)?;

        self.set_state(AuthState::Federate);
        self.federate(&mut headers, &credentials.username)?;

        self.set_state(AuthState::SrpExchange);
        let needs_code = self.srp_exchange(&mut headers, &credentials, trust_token.as_deref())?;
        drop(credentials);

        if needs_code {
            self.two_factor_required.store(true, Ordering::SeqCst);
            self.set_state(AuthState::AwaitCode);
            info!("two-factor authentication required");
            let code = provider.two_factor_code()?;

            self.set_state(AuthState::Verify);
            self.verify_code(&mut headers, &code)?;
            info!("two-factor code accepted");
        }

        self.set_state(AuthState::TrustFetch);
        let trust_token = match self.fetch_trust(&mut headers) {
            Ok(Some(token)) => Some(token),
            Ok(None) => trust_token,
            Err(e) => {
                warn!(error = %e, "trust fetch failed");
                trust_token
            }
        };

        self.set_state(AuthState::ServiceExchange);
        let token = headers
            .session_token
            .clone()
            .or_else(|| self.http.cookie(SESSION_TOKEN_COOKIE))
            .ok_or(AuthError::MissingField {
                step: "service exchange",
                field: "session token",
            })?;
        let info = self.service_exchange(&token, headers.account_country.as_deref(), None)?;

        let mut session = Session {
            storage_base_url: info.storage_base_url,
            session_token: headers.session_token,
            trust_token,
            account_country: headers.account_country,
            session_id: headers.session_id,
            server_nonce: headers.server_nonce,
            account_id: info.account_id,
            cookies: self.http.extract_cookies(),
            created_at: None,
        };
        session.touch();
        self.persist(&session);
        info!(storage = %session.storage_base_url, "authenticated");
        Ok(session)
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = self.store.save(session) {
            warn!(error = %e, "failed to save session");
        }
    }

    fn send_handshake(
        &self,
        headers: &mut HandshakeHeaders,
        request: HttpRequest,
    ) -> AuthResult<HttpResponse> {
        let request = headers.apply(&self.config, request);
        let response = self.http.send(&request)?;
        headers.capture_tokens(&response);
        headers.capture_session(&response);
        Ok(response)
    }

    fn start(&self, headers: &mut HandshakeHeaders) -> AuthResult<()> {
        let cid = &headers.client_id;
        let url = format!(
            "{}/authorize/signin?frame_id={cid}&language=en_US&skVersion=7&iframeId={cid}&client_id={}&redirect_uri={}&response_type=code&response_mode=web_message&state={cid}&authVersion=latest",
            self.config.auth_endpoint, self.config.widget_key, self.config.home_endpoint,
        );
        let request = HttpRequest::get(url)
            .header("Accept", "*/*")
            .header("User-Agent", self.config.user_agent.as_str());
        let response = self.http.send(&request)?;
        if response.status != 200 {
            return Err(AuthError::unexpected_status("authorize", response.status, &response.text()));
        }
        headers.auth_attributes = response.header(AUTH_ATTRIBUTES_HEADER).map(str::to_string);
        Ok(())
    }

    fn federate(&self, headers: &mut HandshakeHeaders, username: &str) -> AuthResult<()> {
        let url = format!("{}/federate?isRememberMeEnabled=true", self.config.auth_endpoint);
        let request = HttpRequest::post_json(url, &json!({
            "accountName": username,
            "rememberMe": true,
        }))?;
        let response = self.send_handshake(headers, request)?;
        if response.status != 200 {
            return Err(AuthError::unexpected_status("federate", response.status, &response.text()));
        }
        Ok(())
    }

    /// Returns true when a one-time code is required.
    fn srp_exchange(
        &self,
        headers: &mut HandshakeHeaders,
        credentials: &Credentials,
        trust_token: Option<&str>,
    ) -> AuthResult<bool> {
        let client = SrpClient::new();

        let url = format!("{}/signin/init", self.config.auth_endpoint);
        let request = HttpRequest::post_json(url, &json!({
            "a": BASE64_STANDARD.encode(client.public_key()),
            "accountName": credentials.username,
            "protocols": [PasswordProtocol::S2k.as_str(), PasswordProtocol::S2kFo.as_str()],
        }))?;
        let response = self.send_handshake(headers, request)?;
        if response.status != 200 {
            return Err(AuthError::unexpected_status("signin init", response.status, &response.text()));
        }
        let init: SigninInit = response.json()?;

        let salt = BASE64_STANDARD
            .decode(&init.salt)
            .map_err(|e| AuthError::srp(format!("decode salt: {e}")))?;
        let server_public = BASE64_STANDARD
            .decode(&init.b)
            .map_err(|e| AuthError::srp(format!("decode B: {e}")))?;
        let protocol = PasswordProtocol::parse(&init.protocol).unwrap_or(PasswordProtocol::S2k);
        debug!(protocol = protocol.as_str(), iterations = init.iteration, "srp challenge");

        let password_key =
            derive_password_key(credentials.password(), &salt, init.iteration, protocol);
        let proof =
            client.process_challenge(&credentials.username, &password_key, &salt, &server_public)?;

        let trust_tokens: Vec<&str> = trust_token.into_iter().filter(|t| !t.is_empty()).collect();
        let url = format!("{}/signin/complete?isRememberMeEnabled=true", self.config.auth_endpoint);
        let request = HttpRequest::post_json(url, &json!({
            "accountName": credentials.username,
            "rememberMe": true,
            "trustTokens": trust_tokens,
            "m1": BASE64_STANDARD.encode(&proof.m1),
            "c": init.c,
            "m2": BASE64_STANDARD.encode(&proof.m2),
        }))?;
        let response = self.send_handshake(headers, request)?;

        match response.status {
            200 => Ok(false),
            409 => Ok(true),
            403 => Err(AuthError::InvalidCredentials),
            401 => Err(AuthError::Unauthorized),
            412 => Err(AuthError::AcknowledgementRequired),
            status => Err(AuthError::unexpected_status("signin complete", status, &response.text())),
        }
    }

    fn verify_code(&self, headers: &mut HandshakeHeaders, code: &str) -> AuthResult<()> {
        let url = format!("{}/verify/trusteddevice/securitycode", self.config.auth_endpoint);
        let request = HttpRequest::post_json(url, &json!({
            "securityCode": { "code": code.trim() },
        }))?;
        let response = self.send_handshake(headers, request)?;
        if response.status != 200 && response.status != 204 {
            return Err(AuthError::TwoFactorRejected {
                status: response.status,
            });
        }
        Ok(())
    }

    /// Returns the trust token, if the provider issued one.
    fn fetch_trust(&self, headers: &mut HandshakeHeaders) -> AuthResult<Option<String>> {
        let url = format!("{}/2sv/trust", self.config.auth_endpoint);
        let response = self.send_handshake(headers, HttpRequest::get(url))?;
        if response.status != 204 {
            return Err(AuthError::unexpected_status("trust", response.status, &response.text()));
        }
        Ok(response.header(TRUST_TOKEN_HEADER).map(str::to_string))
    }

    fn service_exchange(
        &self,
        token: &str,
        account_country: Option<&str>,
        account_id: Option<&str>,
    ) -> AuthResult<ServiceInfo> {
        let mut body = json!({
            "dsWebAuthToken": token,
            "extended_login": true,
        });
        if let Some(country) = account_country.filter(|c| !c.is_empty()) {
            body["accountCountryCode"] = json!(country);
        }
        if let Some(id) = account_id.filter(|id| !id.is_empty()) {
            body["dsPrsId"] = json!(id);
        }

        let url = format!("{}/accountLogin", self.config.setup_endpoint);
        let request = self.with_web_origin(HttpRequest::post_json(url, &body)?);
        let response = self.http.send(&request)?;
        if response.status != 200 {
            return Err(AuthError::unexpected_status("accountLogin", response.status, &response.text()));
        }

        let value: Value = response.json()?;
        let storage_base_url = value
            .pointer("/webservices/ckdatabasews/url")
            .and_then(Value::as_str)
            .ok_or(AuthError::MissingField {
                step: "accountLogin",
                field: "webservices.ckdatabasews.url",
            })?
            .to_string();
        let account_id = value
            .pointer("/dsInfo/dsid")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(ServiceInfo {
            storage_base_url,
            account_id,
        })
    }

    fn with_web_origin(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("Origin", self.config.home_endpoint.as_str())
            .header("Referer", format!("{}/", self.config.home_endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use reminders_http::{MockHttpClient, RetryConfig};
    use reminders_storage::InMemoryBackend;

    const CK: &str = "https://p01-ckdatabasews.icloud.com:443";

    fn authenticator(mock: &MockHttpClient) -> Authenticator<MockHttpClient, InMemoryBackend> {
        Authenticator::new(
            AuthConfig::new().with_retry(RetryConfig::no_retry()),
            mock.clone(),
            InMemoryBackend::new(),
        )
    }

    fn account_login(url: &str) -> HttpResponse {
        HttpResponse::json_value(
            200,
            &json!({
                "dsInfo": {"dsid": "123"},
                "webservices": {"ckdatabasews": {"url": url}},
            }),
        )
    }

    #[test]
    fn service_exchange_reads_url_and_account() {
        let mock = MockHttpClient::new();
        mock.respond("/accountLogin", account_login(CK));
        let auth = authenticator(&mock);

        let info = auth.service_exchange("tok", Some("USA"), None).unwrap();
        assert_eq!(info.storage_base_url, CK);
        assert_eq!(info.account_id.as_deref(), Some("123"));

        let body = mock.requests()[0].json_body().unwrap();
        assert_eq!(body["dsWebAuthToken"], "tok");
        assert_eq!(body["extended_login"], true);
        assert_eq!(body["accountCountryCode"], "USA");
        assert!(body.get("dsPrsId").is_none());
    }

    #[test]
    fn service_exchange_requires_storage_url() {
        let mock = MockHttpClient::new();
        mock.respond(
            "/accountLogin",
            HttpResponse::json_value(200, &json!({"webservices": {}})),
        );
        let err = authenticator(&mock).service_exchange("tok", None, None).unwrap_err();
        assert!(matches!(err, AuthError::MissingField { .. }));
    }

    #[test]
    fn probe_posts_empty_object() {
        let mock = MockHttpClient::new();
        mock.respond("/zones/list", HttpResponse::json_value(200, &json!({"zones": []})));
        let auth = authenticator(&mock);

        assert!(auth.probe(CK));
        let request = &mock.requests()[0];
        assert_eq!(
            request.url,
            format!("{CK}/database/1/com.apple.reminders/production/private/zones/list")
        );
        assert_eq!(request.json_body().unwrap(), json!({}));
        assert_eq!(request.header_value("Origin"), Some("https://www.icloud.com"));
    }

    #[test]
    fn start_requires_200() {
        let mock = MockHttpClient::new();
        mock.respond("/authorize/signin", HttpResponse::new(503, ""));
        let mut headers = HandshakeHeaders::new();
        assert!(authenticator(&mock).start(&mut headers).is_err());
    }

    #[test]
    fn missing_code_fails_and_sets_failed_state() {
        let mock = MockHttpClient::new();
        mock.respond("/authorize/signin", HttpResponse::new(200, ""));
        mock.respond("/federate", HttpResponse::new(200, "{}"));
        mock.respond(
            "/signin/init",
            HttpResponse::json_value(
                200,
                &json!({"iteration": 10, "salt": "c2FsdA==", "protocol": "s2k", "b": "Ag==", "c": "c"}),
            ),
        );
        mock.respond("/signin/complete", HttpResponse::new(409, ""));

        let auth = authenticator(&mock);
        let err = auth
            .ensure_session(&StaticCredentials::new("me", "pw"), false)
            .unwrap_err();
        assert!(matches!(err, AuthError::Credentials(_)));
        assert!(auth.two_factor_required());
        assert_eq!(auth.state(), AuthState::Failed);
    }
}
