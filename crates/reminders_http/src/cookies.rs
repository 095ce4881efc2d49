//! Cookie jar.
//!
//! Implements the subset of RFC 6265 the identity provider and storage
//! service rely on: domain and host-only scoping, path prefixes, `Secure`,
//! `Expires`, and `Max-Age`.

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Url;

use reminders_protocol::Cookie;

/// A cookie plus whether it is bound to exactly one host.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredCookie {
    cookie: Cookie,
    host_only: bool,
}

impl StoredCookie {
    fn same_slot(&self, other: &StoredCookie) -> bool {
        self.cookie.key() == other.cookie.key() && self.host_only == other.host_only
    }

    fn matches(&self, url: &Url, now: i64) -> bool {
        if self.cookie.is_expired_at(now) {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let domain_ok = if self.host_only {
            host.eq_ignore_ascii_case(&self.cookie.domain)
        } else {
            domain_matches(host, &self.cookie.domain)
        };
        domain_ok
            && path_matches(url.path(), &self.cookie.path)
            && (!self.cookie.secure || url.scheme() == "https")
    }
}

/// In-memory cookie store shared by every request of one invocation.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<StoredCookie>,
}

impl CookieJar {
    /// An empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cookies, expired ones included.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns true if the jar holds nothing.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Drops every cookie.
    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Records one `Set-Cookie` header received from `url`.
    ///
    /// Cookies for a domain the host does not belong to are ignored. A
    /// cookie that is already expired removes any stored cookie in the same
    /// slot.
    pub fn store(&mut self, url: &str, set_cookie: &str) {
        let Ok(url) = Url::parse(url) else {
            return;
        };
        let Some(host) = url.host_str() else {
            return;
        };
        let now = Utc::now().timestamp();
        let Some((cookie, host_only)) = parse_set_cookie(set_cookie, host, url.path(), now) else {
            return;
        };
        let stored = StoredCookie { cookie, host_only };
        self.cookies.retain(|c| !c.same_slot(&stored));
        if !stored.cookie.is_expired_at(now) {
            self.cookies.push(stored);
        }
    }

    /// Loads persisted cookies.
    ///
    /// Cookies that carry a domain are stored once for that domain. Cookies
    /// saved without one are bound to every host in `hosts`, which must be
    /// absolute URLs.
    pub fn restore(&mut self, cookies: &[Cookie], hosts: &[String]) {
        let now = Utc::now().timestamp();
        for cookie in cookies {
            if cookie.is_expired_at(now) {
                continue;
            }
            let mut cookie = cookie.clone();
            cookie.value = unquote(&cookie.value).to_string();
            if cookie.path.is_empty() {
                cookie.path = "/".to_string();
            }
            if cookie.domain.is_empty() {
                for host in hosts.iter().filter_map(|h| host_of(h)) {
                    let mut bound = cookie.clone();
                    bound.domain = host;
                    self.insert(StoredCookie {
                        cookie: bound,
                        host_only: true,
                    });
                }
            } else {
                cookie.domain = cookie.domain.trim_start_matches('.').to_ascii_lowercase();
                self.insert(StoredCookie {
                    cookie,
                    host_only: false,
                });
            }
        }
    }

    fn insert(&mut self, stored: StoredCookie) {
        self.cookies.retain(|c| !c.same_slot(&stored));
        self.cookies.push(stored);
    }

    /// `Cookie` header value for a request to `url`, if any cookie applies.
    pub fn header_for(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        let now = Utc::now().timestamp();
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| c.matches(&url, now))
            .map(|c| format!("{}={}", c.cookie.name, c.cookie.value))
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// First unexpired cookie named `name`, value unquoted.
    pub fn find(&self, name: &str) -> Option<&str> {
        let now = Utc::now().timestamp();
        self.cookies
            .iter()
            .find(|c| c.cookie.name == name && !c.cookie.is_expired_at(now))
            .map(|c| unquote(&c.cookie.value))
    }

    /// Every unexpired cookie, deduplicated by (name, domain, path), in the
    /// order first stored.
    pub fn extract(&self) -> Vec<Cookie> {
        let now = Utc::now().timestamp();
        let mut result: Vec<Cookie> = Vec::new();
        for stored in &self.cookies {
            if stored.cookie.is_expired_at(now) {
                continue;
            }
            if result.iter().any(|c| c.key() == stored.cookie.key()) {
                continue;
            }
            result.push(stored.cookie.clone());
        }
        result
    }
}

/// Strips one pair of surrounding double quotes.
pub fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_ascii_lowercase)
}

fn domain_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    let request_path = if request_path.is_empty() { "/" } else { request_path };
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

/// Directory of the request path, per RFC 6265 section 5.1.4.
fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => request_path[..i].to_string(),
    }
}

fn parse_expires(value: &str) -> Option<i64> {
    if let Ok(t) = DateTime::parse_from_rfc2822(value) {
        return Some(t.timestamp());
    }
    NaiveDateTime::parse_from_str(value, "%a, %d-%b-%Y %H:%M:%S GMT")
        .ok()
        .map(|t| t.and_utc().timestamp())
}

fn parse_set_cookie(
    header: &str,
    host: &str,
    request_path: &str,
    now: i64,
) -> Option<(Cookie, bool)> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = Cookie {
        name: name.to_string(),
        value: unquote(value.trim()).to_string(),
        domain: String::new(),
        path: String::new(),
        expires: 0,
        secure: false,
    };
    let mut max_age: Option<i64> = None;

    for attr in parts {
        let (key, val) = match attr.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attr.trim(), ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "domain" => {
                cookie.domain = val.trim_start_matches('.').to_ascii_lowercase();
            }
            "path" if val.starts_with('/') => cookie.path = val.to_string(),
            "expires" => {
                if let Some(ts) = parse_expires(val) {
                    // A past date must still read as expired.
                    cookie.expires = ts.max(1);
                }
            }
            "max-age" => max_age = val.parse().ok(),
            "secure" => cookie.secure = true,
            _ => {}
        }
    }

    if let Some(secs) = max_age {
        cookie.expires = if secs <= 0 { 1 } else { now + secs };
    }
    if cookie.path.is_empty() {
        cookie.path = default_path(request_path);
    }

    let host_only = cookie.domain.is_empty();
    if host_only {
        cookie.domain = host.to_ascii_lowercase();
    } else if !domain_matches(host, &cookie.domain) {
        return None;
    }
    Some((cookie, host_only))
}
