//! Key-value storage backends for bloodbridge.
//!
//! The record store persists each collection as one JSON string under a fixed
//! key. This module defines that capability ([`KeyValueBackend`]) and two
//! implementations:
//!
//! - [`MemoryBackend`]: an in-process map with an optional byte quota, used by
//!   tests and for throwaway sessions.
//! - [`SqliteBackend`]: a durable single-file `SQLite` database.

mod memory;
pub mod migrations;
pub mod schema;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::error::Result;

/// A string-keyed, string-valued storage capability.
///
/// Methods take `&self`; implementations provide their own interior
/// mutability. A failed `set` must leave the previous value in place.
pub trait KeyValueBackend {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails, e.g. when a quota is exceeded.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueBackend + ?Sized> KeyValueBackend for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

impl<T: KeyValueBackend + ?Sized> KeyValueBackend for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}
