//! Authenticated session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hosts a persisted session's cookies are bound to, besides the storage
/// service itself.
pub const PROVIDER_HOSTS: [&str; 5] = [
    "https://www.icloud.com",
    "https://setup.icloud.com",
    "https://idmsa.apple.com",
    "https://appleid.apple.com",
    "https://www.apple.com",
];

/// [`PROVIDER_HOSTS`] plus `storage_base_url`, when set.
pub fn cookie_hosts(storage_base_url: &str) -> Vec<String> {
    let mut hosts: Vec<String> = PROVIDER_HOSTS.iter().map(|h| h.to_string()).collect();
    if !storage_base_url.is_empty() {
        hosts.push(storage_base_url.to_string());
    }
    hosts
}

/// A persisted HTTP cookie.
///
/// `expires` is a Unix timestamp in seconds; `0` marks a session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value, without surrounding quotes.
    pub value: String,
    /// Domain the cookie is scoped to. Empty for host-only cookies.
    #[serde(default)]
    pub domain: String,
    /// Path the cookie is scoped to.
    #[serde(default)]
    pub path: String,
    /// Expiry as Unix seconds, or `0` for a session cookie.
    #[serde(default)]
    pub expires: i64,
    /// Whether the cookie is only sent over HTTPS.
    #[serde(default)]
    pub secure: bool,
}

impl Cookie {
    /// Creates a session cookie scoped to `domain` and `/`.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            expires: 0,
            secure: false,
        }
    }

    /// Returns true if the cookie has an expiry in the past.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires != 0 && self.expires <= now
    }

    /// Identity used for deduplication.
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.name, &self.domain, &self.path)
    }
}

/// Everything needed to talk to the storage service without
/// re-authenticating.
///
/// Field names on disk stay compatible with existing session files; a legacy
/// `headers` map is accepted and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Base URL of the storage (CloudKit database) service.
    #[serde(rename = "ck_base_url", default)]
    pub storage_base_url: String,
    /// Long-lived session token used for the service exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Trust token that lets later sign-ins skip the one-time code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_token: Option<String>,
    /// Account country code reported by the identity provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_country: Option<String>,
    /// Identity provider session id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Server nonce echoed on every handshake request.
    #[serde(rename = "scnt", default, skip_serializing_if = "Option::is_none")]
    pub server_nonce: Option<String>,
    /// Opaque account identifier returned by the service exchange.
    #[serde(rename = "dsid", default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Cookies captured from the transport.
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    /// When the session was created or last refreshed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A session can be used for protocol calls once it knows where the
    /// storage service lives.
    pub fn is_usable(&self) -> bool {
        !self.storage_base_url.is_empty()
    }

    /// Looks up a cookie value by name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Stamps the creation time with the current instant.
    pub fn touch(&mut self) {
        self.created_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_session_is_not_usable() {
        assert!(!Session::default().is_usable());
    }

    #[test]
    fn session_with_base_url_is_usable() {
        let session = Session {
            storage_base_url: "https://p01-ckdatabasews.icloud.com:443".into(),
            ..Session::default()
        };
        assert!(session.is_usable());
    }

    #[test]
    fn reads_legacy_session_file() {
        let json = r#"{
            "ck_base_url": "https://p42-ckdatabasews.icloud.com:443",
            "session_token": "tok",
            "scnt": "nonce",
            "dsid": "12345",
            "cookies": [
                {"name": "X-APPLE-WEBAUTH-USER", "value": "v=1", "domain": ".icloud.com",
                 "path": "/", "expires": 0, "secure": true}
            ],
            "created_at": "2025-02-01T10:00:00+01:00",
            "headers": {"X-Apple-ID-Session-Id": "ignored"}
        }"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert!(session.is_usable());
        assert_eq!(session.server_nonce.as_deref(), Some("nonce"));
        assert_eq!(session.account_id.as_deref(), Some("12345"));
        assert_eq!(session.cookie("X-APPLE-WEBAUTH-USER"), Some("v=1"));
        assert!(session.created_at.is_some());
    }

    #[test]
    fn writes_compatible_keys() {
        let session = Session {
            storage_base_url: "https://example.test".into(),
            server_nonce: Some("n".into()),
            ..Session::default()
        };
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["ck_base_url"], "https://example.test");
        assert_eq!(value["scnt"], "n");
        assert!(value.get("trust_token").is_none());
        assert!(value["cookies"].as_array().unwrap().is_empty());
    }

    #[test]
    fn cookie_hosts_include_storage() {
        assert_eq!(cookie_hosts("").len(), 5);
        let hosts = cookie_hosts("https://p01-ckdatabasews.icloud.com:443");
        assert_eq!(hosts.len(), 6);
        assert_eq!(hosts[5], "https://p01-ckdatabasews.icloud.com:443");
    }

    #[test]
    fn cookie_expiry() {
        let mut cookie = Cookie::new("a", "b", ".icloud.com");
        assert!(!cookie.is_expired_at(i64::MAX));
        cookie.expires = 100;
        assert!(cookie.is_expired_at(100));
        assert!(!cookie.is_expired_at(99));
    }
}
