//! # Reminders HTTP
//!
//! Request plumbing shared by the authenticator and the protocol client.
//!
//! - [`HttpClient`] is the seam every network call goes through;
//!   [`ReqwestClient`] is the production implementation and
//!   [`MockHttpClient`] the scripted one used in tests.
//! - [`CookieJar`] keeps identity-provider and storage-service cookies.
//! - [`RetryConfig`] retries transport failures and throttling statuses with
//!   capped exponential backoff.
//! - [`HttpSession`] ties the three together.
//!
//! All calls are blocking.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod cookies;
mod error;
mod mock;
mod retry;
mod session;

pub use client::{HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestClient};
pub use cookies::{unquote, CookieJar};
pub use error::{is_retryable_status, HttpError, HttpResult, MAX_ERROR_BODY};
pub use mock::MockHttpClient;
pub use retry::RetryConfig;
pub use session::HttpSession;
