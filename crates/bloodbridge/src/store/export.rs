//! Read-only snapshot of every collection.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::RecordStore;
use crate::error::Result;
use crate::record::{DonorRecord, EmergencyRecord, StaffRecord};
use crate::storage::KeyValueBackend;

/// All three collections as of one moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    /// When the snapshot was taken.
    pub exported_at: DateTime<Utc>,
    /// Donor applications.
    pub blood_donors: Vec<DonorRecord>,
    /// Staff applications.
    pub hospital_staff: Vec<StaffRecord>,
    /// Emergency requests.
    pub emergency_requests: Vec<EmergencyRecord>,
}

impl<B: KeyValueBackend> RecordStore<B> {
    /// Snapshot every collection.
    #[must_use]
    pub fn export_all(&self) -> ExportSnapshot {
        ExportSnapshot {
            exported_at: Utc::now().trunc_subsecs(3),
            blood_donors: self.donors().get_all(),
            hospital_staff: self.staff().get_all(),
            emergency_requests: self.emergencies().get_all(),
        }
    }

    /// Snapshot every collection as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_all())?)
    }
}
