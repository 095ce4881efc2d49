//! # Reminders Auth
//!
//! Establishes an authenticated [`reminders_protocol::Session`] with the
//! identity provider and the storage service.
//!
//! [`Authenticator::ensure_session`] walks a small state machine:
//!
//! ```text
//! Idle -> SessionProbe -> Ready
//!                      -> RefreshAttempt -> Ready
//!                                        -> FullAuth
//! FullAuth -> Init -> Federate -> SrpExchange -> (AwaitCode -> Verify)
//!          -> TrustFetch -> ServiceExchange -> Ready
//! ```
//!
//! Any error ends in `Failed`. Credentials and one-time codes come from a
//! [`CredentialProvider`], consulted only when a full sign-in is needed.
//!
//! The password never leaves the process: [`srp`] proves knowledge of it
//! with SRP-6a over the RFC 5054 2048-bit group.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod authenticator;
mod config;
mod credentials;
mod error;
mod headers;
pub mod srp;

pub use authenticator::{AuthState, Authenticator, SESSION_TOKEN_COOKIE};
pub use config::{
    AuthConfig, AUTH_ENDPOINT, HOME_ENDPOINT, SETUP_ENDPOINT, USER_AGENT, WIDGET_KEY,
};
pub use credentials::{CredentialProvider, Credentials, StaticCredentials};
pub use error::{AuthError, AuthResult};
pub use headers::HandshakeHeaders;
