//! `bloodbridge` - Local donor, staff and emergency records with a hospital locator
//!
//! This library provides the record store behind the BloodBridge blood-donation
//! workflow and the search for hospitals near a position.
//!
//! - [`store`]: donor applications, staff applications and emergency requests
//!   kept in a [`storage::KeyValueBackend`], with stats, export and donor matching.
//! - [`locator`]: nearby hospitals from Overpass, ranked by distance, with
//!   addresses from Nominatim.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod locator;
pub mod logging;
pub mod record;
pub mod storage;
pub mod store;

pub use config::{BackendKind, Config};
pub use error::{Error, Result};
pub use locator::{Hospital, HospitalLocator, LocatorError};
pub use logging::init_logging;
pub use record::{ApplicationStatus, EmergencyStatus, Record};
pub use store::{RecordStore, StoreStats};
