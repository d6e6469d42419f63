//! Error types for bloodbridge.
//!
//! This module defines the crate-wide error type. Hospital lookups have their
//! own [`LocatorError`](crate::locator::LocatorError), which converts into
//! [`Error::Locator`] when it crosses into the rest of the crate.

use std::path::PathBuf;
use thiserror::Error;

use crate::locator::LocatorError;

/// The main error type for bloodbridge operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A write would push the backend past its storage quota.
    #[error("storage quota exceeded writing '{key}': {required} bytes needed, quota is {quota}")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Total bytes the backend would hold after the write.
        required: usize,
        /// Configured quota in bytes.
        quota: usize,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Input Errors ===
    /// A status name is not part of the collection's status set.
    #[error("invalid status '{value}' for {collection} (expected one of: {expected})")]
    InvalidStatus {
        /// The rejected input.
        value: String,
        /// Label of the collection.
        collection: &'static str,
        /// Comma-separated list of accepted names.
        expected: String,
    },

    /// A record field argument could not be parsed.
    #[error("invalid field '{argument}': {message}")]
    InvalidField {
        /// The offending argument.
        argument: String,
        /// Description of the problem.
        message: String,
    },

    // === Locator Errors ===
    /// Hospital lookup failed.
    #[error(transparent)]
    Locator(#[from] LocatorError),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for bloodbridge operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an invalid field error.
    #[must_use]
    pub fn invalid_field(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a storage quota failure.
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_quota_exceeded_display() {
        let err = Error::QuotaExceeded {
            key: "bb_blood_donors".to_string(),
            required: 2048,
            quota: 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("bb_blood_donors"));
        assert!(msg.contains("2048"));
        assert!(msg.contains("1024"));
        assert!(err.is_quota_exceeded());
    }

    #[test]
    fn test_is_quota_exceeded_false_for_other_errors() {
        assert!(!Error::internal("x").is_quota_exceeded());
    }

    #[test]
    fn test_invalid_status_display() {
        let err = Error::InvalidStatus {
            value: "Done".to_string(),
            collection: "emergency requests",
            expected: "Active, Resolved".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Done"));
        assert!(msg.contains("emergency requests"));
        assert!(msg.contains("Active, Resolved"));
    }

    #[test]
    fn test_invalid_field_display() {
        let err = Error::invalid_field("nameAlice", "expected KEY=VALUE");
        assert_eq!(
            err.to_string(),
            "invalid field 'nameAlice': expected KEY=VALUE"
        );
    }

    #[test]
    fn test_from_locator_error() {
        let err: Error = LocatorError::geolocation("permission denied").into();
        assert!(matches!(err, Error::Locator(_)));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "radius_m must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("radius_m"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
