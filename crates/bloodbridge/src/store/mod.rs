//! The local record store.
//!
//! [`RecordStore`] keeps three independent collections (donor applications,
//! staff applications, emergency requests) in a [`KeyValueBackend`], one JSON
//! array per storage key. Every operation reads the whole collection, applies
//! its change in memory and writes the whole collection back.
//!
//! Queries never fail: a missing or corrupt collection reads as empty, and so
//! does one the backend cannot read. Mutations propagate backend errors (a
//! failed read or a quota failure) unchanged and leave the stored data alone.
//!
//! # Example
//!
//! ```
//! use bloodbridge::record::ApplicationStatus;
//! use bloodbridge::storage::MemoryBackend;
//! use bloodbridge::store::RecordStore;
//! use serde_json::json;
//!
//! let store = RecordStore::new(MemoryBackend::new());
//! let fields = json!({ "name": "Alice", "bloodGroup": "O+" });
//! let donor = store.donors().add(fields.as_object().cloned().unwrap_or_default())?;
//! assert_eq!(donor.status, ApplicationStatus::Pending);
//!
//! store.donors().update_status(&donor.id, ApplicationStatus::Approved)?;
//! assert_eq!(store.stats().approved_donors, 1);
//! # Ok::<(), bloodbridge::Error>(())
//! ```

mod dashboard;
mod export;
mod matching;
mod stats;

use std::marker::PhantomData;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::record::{Collection, Donors, Emergencies, Record, Staff};
use crate::storage::KeyValueBackend;

pub use export::ExportSnapshot;
pub use matching::{DonorMatch, DEFAULT_MATCH_RADIUS_KM};
pub use stats::StoreStats;

/// Record store over a key-value backend.
#[derive(Debug)]
pub struct RecordStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> RecordStore<B> {
    /// Create a store over `backend`.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The backend this store writes to.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Operations on the collection `C`.
    #[must_use]
    pub fn collection<C: Collection>(&self) -> CollectionStore<'_, B, C> {
        CollectionStore {
            backend: &self.backend,
            _collection: PhantomData,
        }
    }

    /// Donor applications.
    #[must_use]
    pub fn donors(&self) -> CollectionStore<'_, B, Donors> {
        self.collection()
    }

    /// Staff applications.
    #[must_use]
    pub fn staff(&self) -> CollectionStore<'_, B, Staff> {
        self.collection()
    }

    /// Emergency requests.
    #[must_use]
    pub fn emergencies(&self) -> CollectionStore<'_, B, Emergencies> {
        self.collection()
    }
}

/// Operations on one collection of a [`RecordStore`].
#[derive(Debug)]
pub struct CollectionStore<'a, B, C> {
    backend: &'a B,
    _collection: PhantomData<C>,
}

impl<B: KeyValueBackend, C: Collection> CollectionStore<'_, B, C> {
    /// Add a record built from `fields`.
    ///
    /// The store assigns a fresh UUID, the creation time and the collection's
    /// initial status; caller values for `id`, `createdAt` and `status` are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the collection cannot be read or
    /// written.
    pub fn add(&self, fields: Map<String, Value>) -> Result<Record<C::Status>> {
        let mut records = self.load()?;
        let record = Record::new(Uuid::new_v4().to_string(), C::INITIAL_STATUS, fields);
        records.push(record.clone());
        self.save(&records)?;
        info!("Added {} record {}", C::LABEL, record.id);
        Ok(record)
    }

    /// Every record, in insertion order.
    #[must_use]
    pub fn get_all(&self) -> Vec<Record<C::Status>> {
        self.load().unwrap_or_else(|e| {
            warn!("Reading {} failed, treating as empty: {}", C::KEY, e);
            Vec::new()
        })
    }

    /// Read the collection for a read-modify-write.
    ///
    /// A missing key or unreadable contents load as empty; a backend read
    /// error propagates so the caller never writes over data it could not see.
    fn load(&self) -> Result<Vec<Record<C::Status>>> {
        let Some(raw) = self.backend.get(C::KEY)? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Stored {} is unreadable, treating as empty: {}", C::KEY, e);
            Vec::new()
        }))
    }

    /// The record with `id`, if present.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Record<C::Status>> {
        self.get_all().into_iter().find(|r| r.id == id)
    }

    /// Set the status of the record with `id`.
    ///
    /// Returns `false`, without writing, if no record has that id.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the collection cannot be read or
    /// written.
    pub fn update_status(&self, id: &str, status: C::Status) -> Result<bool> {
        let mut records = self.load()?;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            debug!("No {} record {} to update", C::LABEL, id);
            return Ok(false);
        };
        record.status = status;
        self.save(&records)?;
        info!("Set {} record {} to {}", C::LABEL, id, status);
        Ok(true)
    }

    /// Delete the record with `id`.
    ///
    /// Returns `false` if no record had that id.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the collection cannot be read or
    /// written.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut records = self.load()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            debug!("No {} record {} to delete", C::LABEL, id);
            return Ok(false);
        }
        self.save(&records)?;
        info!("Deleted {} record {}", C::LABEL, id);
        Ok(true)
    }

    fn save(&self, records: &[Record<C::Status>]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.backend.set(C::KEY, &raw)
    }
}
