//! Scripted [`HttpClient`] for tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::{HttpClient, HttpRequest, HttpResponse};
use crate::error::{HttpError, HttpResult};

#[derive(Debug)]
struct Route {
    pattern: String,
    replies: VecDeque<HttpResult<HttpResponse>>,
}

#[derive(Debug, Default)]
struct MockState {
    routes: Vec<Route>,
    requests: Vec<HttpRequest>,
}

/// A client that answers from a script and records every request.
///
/// Routes match when their pattern is a substring of the request URL; the
/// first registered match wins. Replies queued on one route are served in
/// order and the last one repeats. Clones share the same script.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    state: Arc<Mutex<MockState>>,
}

impl MockHttpClient {
    /// An empty script. Every request fails until routes are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `response` for URLs containing `pattern`.
    pub fn respond(&self, pattern: &str, response: HttpResponse) {
        self.push(pattern, Ok(response));
    }

    /// Queues a transport failure for URLs containing `pattern`.
    pub fn fail(&self, pattern: &str, message: &str) {
        self.push(pattern, Err(HttpError::transport(message)));
    }

    fn push(&self, pattern: &str, reply: HttpResult<HttpResponse>) {
        let mut state = self.state.lock();
        if let Some(route) = state.routes.iter_mut().find(|r| r.pattern == pattern) {
            route.replies.push_back(reply);
        } else {
            state.routes.push(Route {
                pattern: pattern.to_string(),
                replies: VecDeque::from([reply]),
            });
        }
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    /// Requests whose URL contains `pattern`.
    pub fn requests_to(&self, pattern: &str) -> Vec<HttpRequest> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.url.contains(pattern))
            .cloned()
            .collect()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Forgets recorded requests, keeping the script.
    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }
}

impl HttpClient for MockHttpClient {
    fn send(&self, request: &HttpRequest) -> HttpResult<HttpResponse> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        let route = state
            .routes
            .iter_mut()
            .find(|r| request.url.contains(&r.pattern) && !r.replies.is_empty());
        match route {
            Some(route) if route.replies.len() > 1 => route
                .replies
                .pop_front()
                .unwrap_or_else(|| Err(HttpError::transport("script exhausted"))),
            Some(route) => route
                .replies
                .front()
                .cloned()
                .unwrap_or_else(|| Err(HttpError::transport("script exhausted"))),
            None => Err(HttpError::transport(format!(
                "no scripted response for {}",
                request.url
            ))),
        }
    }
}
