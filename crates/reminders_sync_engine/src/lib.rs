//! # Reminders Sync Engine
//!
//! Keeps a local cache of lists and reminders in step with the reminders
//! zone, and writes changes back.
//!
//! This crate provides:
//! - [`RecordTransport`], the three database calls, with an HTTP
//!   implementation and a scripted [`MockTransport`]
//! - Sync state machine (idle → discovering → fetching → synced)
//! - Cursor management and record folding
//! - [`Writer`], which guards every mutation with the record's change tag
//!
//! ## Key Invariants
//!
//! - The server is authoritative; folding only ever upserts or removes
//! - Folding a page twice equals folding it once
//! - The cursor advances only after a page has been folded
//! - A reminder without a change tag is never mutated
//! - Record-level rejections leave the cache untouched

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
pub mod folding;
mod http;
mod transport;
mod writer;

pub use config::SyncConfig;
pub use engine::{SyncCycleResult, SyncEngine, SyncState, SyncStats};
pub use error::{SyncError, SyncResult, WriteError, WriteResult};
pub use http::HttpRecordTransport;
pub use transport::{MockTransport, RecordTransport, TransportCall};
pub use writer::{NewReminder, ReminderEdit, Writer};
