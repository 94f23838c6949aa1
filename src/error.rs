//! Unified error handling for the route-navigator library.
//!
//! This module provides a consistent error type for all navigation
//! operations, with a variant per failure class so callers can react
//! differently to a routing outage (fall back), a denied location
//! permission (prompt the user) or invalid input (reject outright).

use std::fmt;

/// Unified error type for route-navigator operations.
#[derive(Debug, Clone)]
pub enum NavError {
    /// Input rejected before any network call (bad coordinates, empty query)
    InvalidInput { message: String },
    /// A route with fewer than 2 coordinates was given to the tracker
    InvalidRoute {
        point_count: usize,
        minimum_required: usize,
    },
    /// Routing engine unreachable or returned an unusable response
    RoutingUnavailable {
        message: String,
        status_code: Option<u16>,
    },
    /// Geocoding endpoint unreachable or returned an unusable response
    GeocodingUnavailable { message: String },
    /// Location permission was refused by the user
    PermissionDenied,
    /// The device location provider failed to deliver a fix
    LocationUnavailable { message: String },
    /// Entity-store write failed while saving a planned route
    PersistenceFailure { message: String },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::InvalidInput { message } => {
                write!(f, "Invalid input: {}", message)
            }
            NavError::InvalidRoute {
                point_count,
                minimum_required,
            } => {
                write!(
                    f,
                    "Route has {} coordinates, minimum {} required",
                    point_count, minimum_required
                )
            }
            NavError::RoutingUnavailable {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "Routing unavailable ({}): {}", code, message)
                } else {
                    write!(f, "Routing unavailable: {}", message)
                }
            }
            NavError::GeocodingUnavailable { message } => {
                write!(f, "Geocoding unavailable: {}", message)
            }
            NavError::PermissionDenied => {
                write!(f, "Location permission denied")
            }
            NavError::LocationUnavailable { message } => {
                write!(f, "Location unavailable: {}", message)
            }
            NavError::PersistenceFailure { message } => {
                write!(f, "Persistence failure: {}", message)
            }
            NavError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for NavError {}

/// Result type alias for route-navigator operations.
pub type Result<T> = std::result::Result<T, NavError>;

impl NavError {
    /// True when the caller can sensibly retry or fall back.
    ///
    /// `PermissionDenied` and `InvalidRoute` are fatal to the operation
    /// that raised them; everything else is recoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            NavError::PermissionDenied | NavError::InvalidRoute { .. }
        )
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        NavError::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn routing(message: impl Into<String>, status_code: Option<u16>) -> Self {
        NavError::RoutingUnavailable {
            message: message.into(),
            status_code,
        }
    }

    pub(crate) fn geocoding(message: impl Into<String>) -> Self {
        NavError::GeocodingUnavailable {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NavError::InvalidRoute {
            point_count: 1,
            minimum_required: 2,
        };
        assert!(err.to_string().contains("1 coordinates"));
        assert!(err.to_string().contains("minimum 2"));

        let err = NavError::routing("connect timed out", Some(500));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_recoverability() {
        assert!(!NavError::PermissionDenied.is_recoverable());
        assert!(!NavError::InvalidRoute {
            point_count: 0,
            minimum_required: 2
        }
        .is_recoverable());
        assert!(NavError::routing("down", None).is_recoverable());
        assert!(NavError::geocoding("down").is_recoverable());
    }
}
