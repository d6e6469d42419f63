//! Core record types for bloodbridge.
//!
//! Every stored record carries three store-managed attributes (`id`,
//! `createdAt`, `status`) next to an open set of caller-supplied fields. The
//! three collections share this shape and differ only in their storage key and
//! status set, which [`Collection`] ties together.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Field names reserved for store-managed attributes.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "createdAt", "status"];

/// Review status of a donor or staff application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    /// Awaiting review.
    Pending,
    /// Accepted by an administrator.
    Approved,
    /// Declined by an administrator.
    Rejected,
}

/// Lifecycle status of an emergency blood request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyStatus {
    /// Still looking for donors.
    Active,
    /// Closed.
    Resolved,
}

/// Shared behaviour of the per-collection status enums.
pub trait Status:
    'static
    + Copy
    + Eq
    + fmt::Debug
    + fmt::Display
    + FromStr<Err = Error>
    + Serialize
    + DeserializeOwned
{
    /// Every member of the status set, in lifecycle order.
    const ALL: &'static [Self];

    /// The status name as stored.
    fn as_str(&self) -> &'static str;
}

impl Status for ApplicationStatus {
    const ALL: &'static [Self] = &[Self::Pending, Self::Approved, Self::Rejected];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl Status for EmergencyStatus {
    const ALL: &'static [Self] = &[Self::Active, Self::Resolved];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EmergencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_status<S: Status>(value: &str, collection: &'static str) -> Result<S, Error> {
    let trimmed = value.trim();
    S::ALL
        .iter()
        .copied()
        .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
        .ok_or_else(|| Error::InvalidStatus {
            value: value.to_string(),
            collection,
            expected: S::ALL
                .iter()
                .map(Status::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

impl FromStr for ApplicationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s, "applications")
    }
}

impl FromStr for EmergencyStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s, "emergency requests")
    }
}

/// A stored record.
///
/// Serializes as one flat JSON object: the caller's fields sit next to the
/// store-managed `id`, `createdAt` and `status` keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<S> {
    /// Unique identifier assigned by the store.
    pub id: String,

    /// When the record was created. Never changes after creation.
    pub created_at: DateTime<Utc>,

    /// Current lifecycle status.
    pub status: S,

    /// Caller-supplied fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl<S: Status> Record<S> {
    /// Build a fresh record from caller fields.
    ///
    /// Reserved keys in `fields` are dropped so the injected attributes win.
    /// The creation timestamp is truncated to millisecond precision.
    #[must_use]
    pub fn new(id: String, status: S, mut fields: Map<String, Value>) -> Self {
        for key in RESERVED_FIELDS {
            fields.remove(key);
        }
        Self {
            id,
            created_at: Utc::now().trunc_subsecs(3),
            status,
            fields,
        }
    }

    /// Look up a caller field as a string.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Look up a caller field as a number.
    ///
    /// Numeric strings are accepted too, since form input often arrives as text.
    #[must_use]
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A short human-readable label for listings.
    #[must_use]
    pub fn display_name(&self) -> &str {
        ["name", "fullName", "staffName", "patientName", "hospitalName"]
            .iter()
            .find_map(|key| self.str_field(key))
            .unwrap_or("-")
    }
}

/// Binds a collection marker to its storage key and status set.
pub trait Collection {
    /// Status set for records in this collection.
    type Status: Status;

    /// Storage key holding the serialized collection.
    const KEY: &'static str;

    /// Human-readable collection name.
    const LABEL: &'static str;

    /// Status assigned by `add`.
    const INITIAL_STATUS: Self::Status;
}

/// Blood donor applications.
#[derive(Debug, Clone, Copy)]
pub struct Donors;

/// Hospital staff applications.
#[derive(Debug, Clone, Copy)]
pub struct Staff;

/// Emergency blood requests.
#[derive(Debug, Clone, Copy)]
pub struct Emergencies;

impl Collection for Donors {
    type Status = ApplicationStatus;
    const KEY: &'static str = "bb_blood_donors";
    const LABEL: &'static str = "blood donors";
    const INITIAL_STATUS: ApplicationStatus = ApplicationStatus::Pending;
}

impl Collection for Staff {
    type Status = ApplicationStatus;
    const KEY: &'static str = "bb_hospital_staff";
    const LABEL: &'static str = "hospital staff";
    const INITIAL_STATUS: ApplicationStatus = ApplicationStatus::Pending;
}

impl Collection for Emergencies {
    type Status = EmergencyStatus;
    const KEY: &'static str = "bb_emergency_requests";
    const LABEL: &'static str = "emergency requests";
    const INITIAL_STATUS: EmergencyStatus = EmergencyStatus::Active;
}

/// A donor application record.
pub type DonorRecord = Record<ApplicationStatus>;

/// A staff application record.
pub type StaffRecord = Record<ApplicationStatus>;

/// An emergency request record.
pub type EmergencyRecord = Record<EmergencyStatus>;
