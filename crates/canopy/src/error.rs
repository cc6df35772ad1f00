//! Error types for canopy.
//!
//! This module defines all error types used throughout the canopy crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for canopy operations.
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

    // === Ingest Errors ===
    /// A dataset file could not be parsed.
    #[error("failed to ingest {path}: {message}")]
    Ingest {
        /// Path to the offending file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    /// The tree and road datasets use different coordinate systems.
    #[error("CRS mismatch: roads are {roads}, trees are {trees}; re-project before ingesting")]
    CrsMismatch {
        /// CRS of the road network.
        roads: String,
        /// CRS of the tree inventory.
        trees: String,
    },

    // === Dendrometry Errors ===
    /// A photogrammetric input was out of range.
    #[error("invalid measurement input: {message}")]
    Dendrometry {
        /// Description of the invalid input.
        message: String,
    },

    // === Routing Errors ===
    /// No path exists between the requested endpoints.
    #[error("no route found from segment {from} to segment {to}")]
    RouteNotFound {
        /// Segment id nearest the start point.
        from: i64,
        /// Segment id nearest the goal point.
        to: i64,
    },

    /// A referenced segment id is not in the network.
    #[error("unknown segment id: {0}")]
    UnknownSegment(i64),

    /// The road network is empty.
    #[error("road network is empty; ingest a road dataset first")]
    EmptyNetwork,

    /// Segments have not been scored yet.
    #[error("no environmental scores found; run `canopy score` first")]
    NotScored,

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

/// A specialized Result type for canopy operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new ingest error.
    #[must_use]
    pub fn ingest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Ingest {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new dendrometry error.
    #[must_use]
    pub fn dendrometry(message: impl Into<String>) -> Self {
        Self::Dendrometry {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a CRS mismatch.
    #[must_use]
    pub fn is_crs_mismatch(&self) -> bool {
        matches!(self, Self::CrsMismatch { .. })
    }

    /// Check if this error means routing failed to find a path.
    #[must_use]
    pub fn is_route_not_found(&self) -> bool {
        matches!(self, Self::RouteNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::EmptyNetwork;
        assert_eq!(
            err.to_string(),
            "road network is empty; ingest a road dataset first"
        );

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_crs_mismatch_display() {
        let err = Error::CrsMismatch {
            roads: "EPSG:32643".to_string(),
            trees: "EPSG:4326".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("EPSG:32643"));
        assert!(msg.contains("EPSG:4326"));
        assert!(err.is_crs_mismatch());
        assert!(!Error::EmptyNetwork.is_crs_mismatch());
    }

    #[test]
    fn test_route_not_found() {
        let err = Error::RouteNotFound { from: 3, to: 9 };
        assert!(err.is_route_not_found());
        assert!(err.to_string().contains("segment 3"));
        assert!(err.to_string().contains("segment 9"));
        assert!(!Error::EmptyNetwork.is_route_not_found());
    }

    #[test]
    fn test_ingest_error_display() {
        let err = Error::ingest("/data/trees.geojson", "missing botanical_name");
        let msg = err.to_string();
        assert!(msg.contains("/data/trees.geojson"));
        assert!(msg.contains("missing botanical_name"));
    }

    #[test]
    fn test_dendrometry_error_display() {
        let err = Error::dendrometry("focal length must be positive");
        assert!(err.to_string().contains("focal length"));
    }

    #[test]
    fn test_unknown_segment_display() {
        let err = Error::UnknownSegment(42);
        assert!(err.to_string().contains("42"));
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
            message: "buffer_meters must be positive".to_string(),
        };
        assert!(err.to_string().contains("buffer_meters"));
    }

    #[test]
    fn test_not_scored_display() {
        let err = Error::NotScored;
        assert!(err.to_string().contains("canopy score"));
    }
}
