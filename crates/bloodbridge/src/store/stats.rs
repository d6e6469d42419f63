//! Aggregate counts over all collections.

use serde::{Deserialize, Serialize};

use super::RecordStore;
use crate::record::{ApplicationStatus, EmergencyStatus, Record};
use crate::storage::KeyValueBackend;

/// Record counts per collection and status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// All donor applications.
    pub total_donors: usize,
    /// Approved donor applications.
    pub approved_donors: usize,
    /// Donor applications awaiting review.
    pub pending_donors: usize,
    /// Rejected donor applications.
    pub rejected_donors: usize,
    /// All staff applications.
    pub total_staff: usize,
    /// Approved staff applications.
    pub approved_staff: usize,
    /// Staff applications awaiting review.
    pub pending_staff: usize,
    /// Rejected staff applications.
    pub rejected_staff: usize,
    /// All emergency requests.
    pub total_emergency: usize,
    /// Open emergency requests.
    pub active_emergency: usize,
    /// Closed emergency requests.
    pub resolved_emergency: usize,
}

fn count<S: PartialEq>(records: &[Record<S>], status: &S) -> usize {
    records.iter().filter(|r| r.status == *status).count()
}

impl<B: KeyValueBackend> RecordStore<B> {
    /// Count records by collection and status.
    ///
    /// Computed from full scans on every call.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let donors = self.donors().get_all();
        let staff = self.staff().get_all();
        let emergencies = self.emergencies().get_all();

        StoreStats {
            total_donors: donors.len(),
            approved_donors: count(&donors, &ApplicationStatus::Approved),
            pending_donors: count(&donors, &ApplicationStatus::Pending),
            rejected_donors: count(&donors, &ApplicationStatus::Rejected),
            total_staff: staff.len(),
            approved_staff: count(&staff, &ApplicationStatus::Approved),
            pending_staff: count(&staff, &ApplicationStatus::Pending),
            rejected_staff: count(&staff, &ApplicationStatus::Rejected),
            total_emergency: emergencies.len(),
            active_emergency: count(&emergencies, &EmergencyStatus::Active),
            resolved_emergency: count(&emergencies, &EmergencyStatus::Resolved),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use serde_json::{json, Map, Value};

    fn named(name: &str) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        fields
    }

    #[test]
    fn test_empty_store_all_zero() {
        let store = RecordStore::new(MemoryBackend::new());
        assert_eq!(store.stats(), StoreStats::default());
    }

    #[test]
    fn test_approved_donor_counted() {
        let store = RecordStore::new(MemoryBackend::new());
        let alice = store.donors().add(named("Alice")).unwrap();
        assert_eq!(alice.status, ApplicationStatus::Pending);

        store
            .donors()
            .update_status(&alice.id, ApplicationStatus::Approved)
            .unwrap();

        let stats = store.stats();
        assert_eq!(stats.approved_donors, 1);
        assert_eq!(stats.pending_donors, 0);
        assert_eq!(stats.total_donors, 1);
    }

    #[test]
    fn test_counts_match_filtering() {
        let store = RecordStore::new(MemoryBackend::new());
        let donors: Vec<_> = (0..6)
            .map(|i| store.donors().add(named(&format!("D{i}"))).unwrap())
            .collect();
        let staff: Vec<_> = (0..3)
            .map(|i| store.staff().add(named(&format!("S{i}"))).unwrap())
            .collect();
        let requests: Vec<_> = (0..4)
            .map(|_| store.emergencies().add(Map::new()).unwrap())
            .collect();

        store.donors().update_status(&donors[0].id, ApplicationStatus::Approved).unwrap();
        store.donors().update_status(&donors[1].id, ApplicationStatus::Approved).unwrap();
        store.donors().update_status(&donors[2].id, ApplicationStatus::Rejected).unwrap();
        store.staff().update_status(&staff[0].id, ApplicationStatus::Rejected).unwrap();
        store.emergencies().update_status(&requests[3].id, EmergencyStatus::Resolved).unwrap();
        store.donors().delete(&donors[5].id).unwrap();

        let stats = store.stats();
        let all_donors = store.donors().get_all();
        let all_staff = store.staff().get_all();
        let all_requests = store.emergencies().get_all();

        assert_eq!(stats.total_donors, all_donors.len());
        assert_eq!(stats.approved_donors, count(&all_donors, &ApplicationStatus::Approved));
        assert_eq!(stats.pending_donors, count(&all_donors, &ApplicationStatus::Pending));
        assert_eq!(stats.rejected_donors, count(&all_donors, &ApplicationStatus::Rejected));
        assert_eq!(stats.total_staff, all_staff.len());
        assert_eq!(stats.rejected_staff, count(&all_staff, &ApplicationStatus::Rejected));
        assert_eq!(stats.total_emergency, all_requests.len());
        assert_eq!(stats.active_emergency, count(&all_requests, &EmergencyStatus::Active));
        assert_eq!(stats.resolved_emergency, count(&all_requests, &EmergencyStatus::Resolved));

        assert_eq!(
            (stats.total_donors, stats.approved_donors, stats.pending_donors, stats.rejected_donors),
            (5, 2, 2, 1)
        );
        assert_eq!((stats.total_staff, stats.pending_staff), (3, 2));
        assert_eq!((stats.active_emergency, stats.resolved_emergency), (3, 1));
    }

    #[test]
    fn test_serialized_key_names() {
        let value = serde_json::to_value(StoreStats::default()).unwrap();
        for key in [
            "totalDonors",
            "approvedDonors",
            "pendingDonors",
            "rejectedDonors",
            "totalStaff",
            "approvedStaff",
            "pendingStaff",
            "rejectedStaff",
            "totalEmergency",
            "activeEmergency",
            "resolvedEmergency",
        ] {
            assert_eq!(value[key], 0, "missing {key}");
        }
    }
}
