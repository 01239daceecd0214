//! Layered error definitions
//!
//! Categorized by source: config / timesync / window / ingestion

use thiserror::Error;

use crate::StationId;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Time Sync Errors =====
    /// Accessor needing at least one packet called on an empty analysis
    #[error("time sync analysis for station '{station_id}' has no packets")]
    EmptyAnalysis { station_id: StationId },

    /// Station start time or sample rate changed between packets
    #[error("change in station start time or sample rate detected for station '{station_id}'")]
    InconsistentStation { station_id: StationId },

    /// Two arrays that must line up have different lengths
    #[error("{what} length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Exchange columns of unequal length
    #[error("time sync exchange columns have unequal lengths: {lengths:?}")]
    ExchangeShape { lengths: [usize; 6] },

    // ===== Window Errors =====
    /// Nothing could be loaded for the requested window
    #[error("no station data: {message}")]
    NoData { message: String },

    // ===== Ingestion Errors =====
    /// Station source failure
    #[error("ingestion error at '{location}': {message}")]
    Ingestion { location: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create empty analysis error
    pub fn empty_analysis(station_id: impl Into<StationId>) -> Self {
        Self::EmptyAnalysis {
            station_id: station_id.into(),
        }
    }

    /// Create inconsistent station error
    pub fn inconsistent_station(station_id: impl Into<StationId>) -> Self {
        Self::InconsistentStation {
            station_id: station_id.into(),
        }
    }

    /// Create length mismatch error
    pub fn length_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::LengthMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    /// Create no data error
    pub fn no_data(message: impl Into<String>) -> Self {
        Self::NoData {
            message: message.into(),
        }
    }

    /// Create ingestion error
    pub fn ingestion(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ingestion {
            location: location.into(),
            message: message.into(),
        }
    }
}
