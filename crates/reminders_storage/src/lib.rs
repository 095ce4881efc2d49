//! # Reminders Storage
//!
//! Persistence for the two documents the client keeps between runs:
//! the authenticated [`reminders_protocol::Session`] and the
//! [`RecordCache`] of reminders, lists, and the sync cursor.
//!
//! Both documents are pretty-printed JSON rewritten in full on every save.
//! There is no locking; concurrent invocations are not supported.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing
//! - [`FileBackend`] - For persistent storage
//!
//! ## Example
//!
//! ```rust
//! use reminders_storage::{CacheStore, InMemoryBackend};
//!
//! let store = CacheStore::new(InMemoryBackend::new());
//! let mut cache = store.load();
//! cache.lists.insert("List/A".into(), "Inbox".into());
//! store.save(&mut cache).unwrap();
//! assert_eq!(store.load().list_name("List/A"), Some("Inbox"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod cache;
mod error;
mod file;
mod memory;
mod paths;
mod session_store;

pub use backend::StorageBackend;
pub use cache::{CacheStore, RecordCache};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
pub use paths::{ConfigPaths, CONFIG_DIR_NAME};
pub use session_store::SessionStore;
