//! # Reminders Protocol
//!
//! Data types shared by the authenticator, the storage crates, and the sync
//! engine:
//! - [`Session`] and [`Cookie`], the persisted authentication state
//! - [`ReminderRecord`], [`ReminderList`], and the [`Reminder`] read view
//! - CloudKit request and response envelopes in [`cloudkit`]
//! - UTC date helpers in [`time`]
//!
//! This is a pure types crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cloudkit;
mod error;
mod record;
mod session;
pub mod time;

pub use cloudkit::{
    ChangesRequest, ChangesResponse, Endpoint, ModifyRequest, ModifyResponse, RawRecord,
    RecordFailure, RecordFields, RecordKind, RecordOperation, ZoneChanges, ZoneId,
    ZonesListResponse,
};
pub use error::{ProtocolError, ProtocolResult};
pub use record::{short_id, Priority, Reminder, ReminderList, ReminderRecord, UNKNOWN_LIST, UNTITLED};
pub use session::{cookie_hosts, Cookie, Session, PROVIDER_HOSTS};
