//! Handshake header discipline.
//!
//! The identity provider ties a sign-in together through values it hands
//! out in response headers and expects echoed verbatim on the next request.

use reminders_http::{HttpRequest, HttpResponse};

use crate::config::AuthConfig;

/// Response header carrying the identity provider session id.
pub const SESSION_ID_HEADER: &str = "X-Apple-ID-Session-Id";
/// Response header carrying the server nonce.
pub const NONCE_HEADER: &str = "scnt";
/// Response header carrying the auth attributes blob.
pub const AUTH_ATTRIBUTES_HEADER: &str = "X-Apple-Auth-Attributes";
/// Response header carrying the session token.
pub const SESSION_TOKEN_HEADER: &str = "X-Apple-Session-Token";
/// Response header carrying the account country.
pub const ACCOUNT_COUNTRY_HEADER: &str = "X-Apple-ID-Account-Country";
/// Response header carrying the trust token.
pub const TRUST_TOKEN_HEADER: &str = "X-Apple-TwoSV-Trust-Token";

const FD_CLIENT_FINGERPRINT: &str = ".ta44j1e3NlY5BNlY5BSs5uQ32SCVgdI.AqWJ4EKKw0fVD_DJhCizgzH_y3EjNklY_ia4WFL264HRe4FSr_JzC1zJ6rgNNlY5BNp55BNlan0Os5Apw.BS1";

/// Values echoed between handshake requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeHeaders {
    /// Client-chosen frame id, `auth-<uuid>`.
    pub client_id: String,
    /// Opaque attributes from the sign-in page.
    pub auth_attributes: Option<String>,
    /// Identity provider session id.
    pub session_id: Option<String>,
    /// Server nonce.
    pub server_nonce: Option<String>,
    /// Session token, once issued.
    pub session_token: Option<String>,
    /// Account country, once reported.
    pub account_country: Option<String>,
}

impl HandshakeHeaders {
    /// Starts a handshake with a fresh client id.
    pub fn new() -> Self {
        Self {
            client_id: format!("auth-{}", uuid::Uuid::new_v4()),
            ..Self::default()
        }
    }

    /// Adds the fixed client identity and the current echoed values.
    pub fn apply(&self, config: &AuthConfig, request: HttpRequest) -> HttpRequest {
        let client_info = format!(
            r#"{{"U":"{}","L":"en-US","Z":"GMT-04:00","V":"1.1","F":"{}"}}"#,
            config.user_agent, FD_CLIENT_FINGERPRINT
        );
        let mut request = request
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("Referer", "https://idmsa.apple.com/")
            .header("Origin", "https://idmsa.apple.com")
            .header("X-Apple-Widget-Key", config.widget_key.as_str())
            .header("X-Apple-I-Require-UE", "true")
            .header("User-Agent", config.user_agent.as_str())
            .header("X-Apple-Mandate-Security-Upgrade", "0")
            .header("X-Apple-Oauth-Client-Id", config.widget_key.as_str())
            .header("X-Apple-Oauth-Client-Type", "firstPartyAuth")
            .header("X-Apple-Oauth-Redirect-URI", config.home_endpoint.as_str())
            .header("X-Apple-Oauth-Require-Grant-Code", "true")
            .header("X-Apple-Oauth-Response-Mode", "web_message")
            .header("X-Apple-Oauth-Response-Type", "code")
            .header("X-Apple-Oauth-State", self.client_id.as_str())
            .header("X-Apple-Offer-Security-Upgrade", "1")
            .header("X-Apple-Frame-Id", self.client_id.as_str())
            .header("X-Apple-I-FD-Client-Info", client_info);

        if let Some(attributes) = &self.auth_attributes {
            request.set_header(AUTH_ATTRIBUTES_HEADER, attributes.as_str());
        }
        if let Some(session_id) = &self.session_id {
            request.set_header(SESSION_ID_HEADER, session_id.as_str());
        }
        if let Some(nonce) = &self.server_nonce {
            request.set_header(NONCE_HEADER, nonce.as_str());
        }
        request
    }

    /// Records the session id and nonce, keeping earlier values when the
    /// response omits them.
    pub fn capture_session(&mut self, response: &HttpResponse) {
        if let Some(id) = response.header(SESSION_ID_HEADER) {
            self.session_id = Some(id.to_string());
        }
        if let Some(nonce) = response.header(NONCE_HEADER) {
            self.server_nonce = Some(nonce.to_string());
        }
    }

    /// Records the session token and account country, if present.
    pub fn capture_tokens(&mut self, response: &HttpResponse) {
        if let Some(token) = response.header(SESSION_TOKEN_HEADER) {
            self.session_token = Some(token.to_string());
        }
        if let Some(country) = response.header(ACCOUNT_COUNTRY_HEADER) {
            self.account_country = Some(country.to_string());
        }
    }
}
