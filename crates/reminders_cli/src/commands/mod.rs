//! CLI command implementations.

pub mod add;
pub mod auth;
pub mod json;
pub mod list;
pub mod lists;
pub mod modify;
pub mod search;
pub mod sync;
