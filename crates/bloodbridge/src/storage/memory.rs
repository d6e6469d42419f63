//! In-process key-value backend.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::trace;

use super::KeyValueBackend;
use crate::error::{Error, Result};

/// A `HashMap`-backed store with an optional size quota.
///
/// The quota counts key and value bytes across all entries, mirroring how
/// browser local storage budgets its space.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    /// Create an empty backend without a quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty backend that rejects writes beyond `quota_bytes`.
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes currently held.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn used_bytes(&self) -> Result<usize> {
        let entries = self.lock()?;
        Ok(Self::size_of(&entries))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::internal("memory backend lock poisoned"))
    }

    fn size_of(entries: &HashMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock()?;

        if let Some(quota) = self.quota_bytes {
            let previous = entries.get(key).map_or(0, |old| key.len() + old.len());
            let required = Self::size_of(&entries) - previous + key.len() + value.len();
            if required > quota {
                return Err(Error::QuotaExceeded {
                    key: key.to_string(),
                    required,
                    quota,
                });
            }
        }

        trace!("memory set {} ({} bytes)", key, value.len());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_used_bytes_counts_keys_and_values() {
        let backend = MemoryBackend::new();
        backend.set("ab", "cde").unwrap();
        backend.set("f", "g").unwrap();
        assert_eq!(backend.used_bytes().unwrap(), 7);
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let backend = MemoryBackend::with_quota(10);
        backend.set("k", "12345").unwrap();

        let err = backend.set("k2", "123456789").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(backend.get("k2").unwrap(), None);
        assert_eq!(backend.get("k").unwrap().as_deref(), Some("12345"));
    }

    #[test]
    fn test_quota_accounts_for_replaced_value() {
        let backend = MemoryBackend::with_quota(10);
        backend.set("k", "123456789").unwrap();
        // Replacing shrinks usage first, so this fits.
        backend.set("k", "987654321").unwrap();
        assert_eq!(backend.used_bytes().unwrap(), 10);
    }

    #[test]
    fn test_remove_frees_quota() {
        let backend = MemoryBackend::with_quota(6);
        backend.set("a", "12345").unwrap();
        assert!(backend.set("b", "1").is_err());

        backend.remove("a").unwrap();
        backend.set("b", "1").unwrap();
    }
}
