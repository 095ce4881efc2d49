//! Cookie-aware, retrying request executor.

use parking_lot::RwLock;
use tracing::debug;

use reminders_protocol::Cookie;

use crate::client::{HttpClient, HttpRequest, HttpResponse};
use crate::cookies::CookieJar;
use crate::error::{is_retryable_status, HttpError, HttpResult};
use crate::retry::RetryConfig;

/// An [`HttpClient`] plus the cookie jar and retry policy shared by every
/// request of one invocation.
pub struct HttpSession<C: HttpClient> {
    client: C,
    jar: RwLock<CookieJar>,
    retry: RetryConfig,
}

impl<C: HttpClient> HttpSession<C> {
    /// Creates a session with an empty jar and the default retry policy.
    pub fn new(client: C) -> Self {
        Self {
            client,
            jar: RwLock::new(CookieJar::new()),
            retry: RetryConfig::default(),
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The retry policy.
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Sends `request`, attaching cookies and storing any the server sets.
    ///
    /// Transport failures and retryable statuses are retried. Any other
    /// status is returned as a response for the caller to interpret.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Transport`] or [`HttpError::Status`] once the
    /// retry budget is spent.
    pub fn send(&self, request: &HttpRequest) -> HttpResult<HttpResponse> {
        self.retry.run(
            |attempt| {
                let mut outgoing = request.clone();
                if let Some(cookie) = self.jar.read().header_for(&outgoing.url) {
                    outgoing.set_header("Cookie", cookie);
                }
                debug!(method = %outgoing.method, url = %outgoing.url, attempt, "sending request");

                let response = self.client.send(&outgoing)?;
                self.store_cookies(&outgoing.url, &response);
                debug!(status = response.status, "received response");

                if is_retryable_status(response.status) {
                    return Err(HttpError::status(response.status, &response.text()));
                }
                Ok(response)
            },
            HttpError::is_retryable,
        )
    }

    /// Like [`send`](Self::send) but also fails on any non-2xx status.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Status`] for non-success responses.
    pub fn expect_success(&self, request: &HttpRequest) -> HttpResult<HttpResponse> {
        let response = self.send(request)?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(HttpError::status(response.status, &response.text()))
        }
    }

    fn store_cookies(&self, url: &str, response: &HttpResponse) {
        let mut jar = self.jar.write();
        for set_cookie in response.header_all("Set-Cookie") {
            jar.store(url, set_cookie);
        }
    }

    /// Empties the jar.
    pub fn clear_cookies(&self) {
        self.jar.write().clear();
    }

    /// Loads persisted cookies; see [`CookieJar::restore`].
    pub fn restore_cookies(&self, cookies: &[Cookie], hosts: &[String]) {
        self.jar.write().restore(cookies, hosts);
    }

    /// Snapshot of every live cookie, for persistence.
    pub fn extract_cookies(&self) -> Vec<Cookie> {
        self.jar.read().extract()
    }

    /// Value of the first live cookie named `name`.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.jar.read().find(name).map(str::to_string)
    }
}

impl<C: HttpClient + std::fmt::Debug> std::fmt::Debug for HttpSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("client", &self.client)
            .field("cookies", &self.jar.read().len())
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHttpClient;
    use std::time::Duration;

    fn fast_retry() -> RetryConfig {
        RetryConfig::new(3).with_initial_delay(Duration::ZERO)
    }

    #[test]
    fn cookies_flow_between_requests() {
        let mock = MockHttpClient::new();
        mock.respond(
            "/first",
            HttpResponse::new(200, "").with_header("Set-Cookie", "a=1; Domain=icloud.com; Path=/"),
        );
        mock.respond("/second", HttpResponse::new(200, ""));

        let session = HttpSession::new(mock.clone());
        session.send(&HttpRequest::get("https://www.icloud.com/first")).unwrap();
        session.send(&HttpRequest::get("https://setup.icloud.com/second")).unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].header_value("Cookie"), None);
        assert_eq!(requests[1].header_value("Cookie"), Some("a=1"));
        assert_eq!(session.cookie("a").as_deref(), Some("1"));
    }

    #[test]
    fn retries_retryable_status_then_succeeds() {
        let mock = MockHttpClient::new();
        mock.respond("/x", HttpResponse::new(503, "busy"));
        mock.respond("/x", HttpResponse::new(200, "ok"));

        let session = HttpSession::new(mock.clone()).with_retry(fast_retry());
        let response = session.send(&HttpRequest::get("https://x.test/x")).unwrap();
        assert_eq!(response.text(), "ok");
        assert_eq!(mock.request_count(), 2);
    }

    #[test]
    fn client_errors_are_returned_without_retry() {
        let mock = MockHttpClient::new();
        mock.respond("/x", HttpResponse::new(409, "2fa"));

        let session = HttpSession::new(mock.clone()).with_retry(fast_retry());
        let response = session.send(&HttpRequest::get("https://x.test/x")).unwrap();
        assert_eq!(response.status, 409);
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn transport_failures_exhaust_budget() {
        let mock = MockHttpClient::new();
        for _ in 0..3 {
            mock.fail("/x", "connection reset");
        }

        let session = HttpSession::new(mock.clone()).with_retry(fast_retry());
        let err = session.send(&HttpRequest::get("https://x.test/x")).unwrap_err();
        assert!(matches!(err, HttpError::Transport { .. }));
        assert_eq!(mock.request_count(), 3);
    }

    #[test]
    fn expect_success_rejects_non_2xx() {
        let mock = MockHttpClient::new();
        mock.respond("/x", HttpResponse::new(401, "nope"));

        let session = HttpSession::new(mock).with_retry(RetryConfig::no_retry());
        let err = session
            .expect_success(&HttpRequest::get("https://x.test/x"))
            .unwrap_err();
        assert_eq!(err.status_code(), Some(401));
    }

    #[test]
    fn clear_and_restore() {
        let session = HttpSession::new(MockHttpClient::new());
        session.restore_cookies(&[Cookie::new("t", "v", ".icloud.com")], &[]);
        assert_eq!(session.extract_cookies().len(), 1);
        session.clear_cookies();
        assert!(session.extract_cookies().is_empty());
    }
}
