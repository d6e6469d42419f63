//! Emergency requests relevant to one donor or one hospital.

use tracing::debug;

use super::RecordStore;
use crate::record::{EmergencyRecord, EmergencyStatus};
use crate::storage::KeyValueBackend;

/// Blood type on a request that accepts any donor.
pub(crate) const ANY_BLOOD_TYPE: &str = "Any";

impl<B: KeyValueBackend> RecordStore<B> {
    /// Active requests the donor `donor_id` could answer.
    ///
    /// A request is relevant when its `bloodType` equals the donor's
    /// `bloodGroup` or is `"Any"`. The donor's own status is not checked.
    /// Returns `None` for an unknown donor.
    #[must_use]
    pub fn requests_for_donor(&self, donor_id: &str) -> Option<Vec<EmergencyRecord>> {
        let donor = self.donors().get(donor_id)?;
        let group = donor.str_field("bloodGroup");

        let requests: Vec<_> = self
            .emergencies()
            .get_all()
            .into_iter()
            .filter(|r| r.status == EmergencyStatus::Active)
            .filter(|r| match r.str_field("bloodType") {
                Some(ANY_BLOOD_TYPE) => true,
                Some(blood_type) => group == Some(blood_type),
                None => false,
            })
            .collect();
        debug!("{} active requests for donor {}", requests.len(), donor_id);
        Some(requests)
    }

    /// Requests raised for `hospital_name`, in any status.
    ///
    /// Names compare case-insensitively.
    #[must_use]
    pub fn requests_for_hospital(&self, hospital_name: &str) -> Vec<EmergencyRecord> {
        let wanted = hospital_name.to_lowercase();
        self.emergencies()
            .get_all()
            .into_iter()
            .filter(|r| {
                r.str_field("hospitalName")
                    .is_some_and(|name| name.to_lowercase() == wanted)
            })
            .collect()
    }

    /// Requests raised for the hospital named on staff application `staff_id`.
    ///
    /// Returns `None` for an unknown applicant, and an empty list when the
    /// application names no hospital.
    #[must_use]
    pub fn requests_for_staff(&self, staff_id: &str) -> Option<Vec<EmergencyRecord>> {
        let staff = self.staff().get(staff_id)?;
        let Some(hospital) = staff.str_field("hospitalName") else {
            debug!("Staff application {} names no hospital", staff_id);
            return Some(Vec::new());
        };
        Some(self.requests_for_hospital(hospital))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use serde_json::{json, Map, Value};

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn raise(store: &RecordStore<MemoryBackend>, hospital: &str, blood_type: &str) -> String {
        store
            .emergencies()
            .add(obj(json!({ "hospitalName": hospital, "bloodType": blood_type })))
            .unwrap()
            .id
    }

    fn ids(records: &[EmergencyRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_donor_sees_own_group_and_any() {
        let store = RecordStore::new(MemoryBackend::new());
        let donor = store
            .donors()
            .add(obj(json!({ "name": "Asha", "bloodGroup": "O-" })))
            .unwrap();
        let same = raise(&store, "Ruby Hall", "O-");
        let any = raise(&store, "Sassoon", "Any");
        raise(&store, "Ruby Hall", "AB+");

        let requests = store.requests_for_donor(&donor.id).unwrap();
        assert_eq!(ids(&requests), vec![same.as_str(), any.as_str()]);
    }

    #[test]
    fn test_donor_skips_resolved_requests() {
        let store = RecordStore::new(MemoryBackend::new());
        let donor = store
            .donors()
            .add(obj(json!({ "bloodGroup": "B+" })))
            .unwrap();
        let done = raise(&store, "Ruby Hall", "B+");
        store
            .emergencies()
            .update_status(&done, EmergencyStatus::Resolved)
            .unwrap();

        assert!(store.requests_for_donor(&donor.id).unwrap().is_empty());
    }

    #[test]
    fn test_donor_without_group_sees_only_any() {
        let store = RecordStore::new(MemoryBackend::new());
        let donor = store.donors().add(Map::new()).unwrap();
        raise(&store, "Ruby Hall", "A+");
        let any = raise(&store, "Ruby Hall", "Any");

        let requests = store.requests_for_donor(&donor.id).unwrap();
        assert_eq!(ids(&requests), vec![any.as_str()]);
    }

    #[test]
    fn test_unknown_donor_is_none() {
        let store = RecordStore::new(MemoryBackend::new());
        raise(&store, "Ruby Hall", "Any");
        assert!(store.requests_for_donor("missing").is_none());
    }

    #[test]
    fn test_hospital_name_ignores_case() {
        let store = RecordStore::new(MemoryBackend::new());
        let first = raise(&store, "Ruby Hall Clinic", "A+");
        let second = raise(&store, "ruby hall clinic", "O+");
        raise(&store, "Sassoon General", "A+");
        store
            .emergencies()
            .update_status(&second, EmergencyStatus::Resolved)
            .unwrap();

        let requests = store.requests_for_hospital("RUBY HALL CLINIC");
        assert_eq!(ids(&requests), vec![first.as_str(), second.as_str()]);
    }

    #[test]
    fn test_staff_requests_follow_hospital_name() {
        let store = RecordStore::new(MemoryBackend::new());
        let staff = store
            .staff()
            .add(obj(json!({ "staffName": "Dr Rao", "hospitalName": "Sassoon General" })))
            .unwrap();
        let unnamed = store.staff().add(Map::new()).unwrap();
        let mine = raise(&store, "Sassoon General", "Any");
        raise(&store, "Ruby Hall", "Any");

        let requests = store.requests_for_staff(&staff.id).unwrap();
        assert_eq!(ids(&requests), vec![mine.as_str()]);
        assert!(store.requests_for_staff(&unnamed.id).unwrap().is_empty());
        assert!(store.requests_for_staff("missing").is_none());
    }
}
