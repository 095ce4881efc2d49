//! # Reminders Testkit
//!
//! Test utilities shared by the client crates.
//!
//! This crate provides:
//! - Builders for change records as the database returns them
//! - Canned change pages and modify responses
//! - Temporary configuration directories
//! - Property-based strategies for titles and change streams
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reminders_testkit::prelude::*;
//!
//! let page = change_page(
//!     vec![list_record("List/1", "Shopping"), ReminderFixture::new("Reminder/A", "Milk").build()],
//!     "token-1",
//!     false,
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
