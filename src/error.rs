//! Error types for the trip insights pipeline.

use thiserror::Error;

/// Errors surfaced by collaborators and by input validation.
///
/// The pure components (distance math, name normalization, filtering,
/// matching) never produce these on well-typed input. They come from the
/// location provider, the remote stores, or from rejected coordinates and
/// trip drafts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    #[error("Location provider unavailable")]
    UnsupportedCapability,

    #[error("Location access denied")]
    PermissionDenied,

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Malformed data: {message}")]
    MalformedData { message: String },

    #[error("No matching places found")]
    NoMatch,

    #[error("Invalid coordinate: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Trip rejected: {message}")]
    Rejected { message: String },
}

impl DashboardError {
    pub fn network(message: impl Into<String>) -> Self {
        DashboardError::Network {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        DashboardError::MalformedData {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DashboardError::Validation {
            message: message.into(),
        }
    }
}

#[cfg(feature = "http")]
impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::MalformedData {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::Network {
            message: err.to_string(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DashboardError::network("HTTP 503").to_string(),
            "Network error: HTTP 503"
        );
        assert_eq!(
            DashboardError::InvalidCoordinate { latitude: 90.0, longitude: 0.0 }.to_string(),
            "Invalid coordinate: (90, 0)"
        );
        assert_eq!(DashboardError::NoMatch.to_string(), "No matching places found");
    }
}
