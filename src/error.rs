// Error types for the coupon assigner.
//
// Every variant's `Display` is written to be shown to the operator as a single
// activity-log line.

use std::path::PathBuf;

use thiserror::Error;

/// Raw form input rejected before any network call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Valid coupon ID is required")]
    InvalidCouponId,

    #[error("No valid member IDs found")]
    NoValidMemberIds,
}

/// Failure of a single remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Transport failure, non-success status, or a login response without a token.
    #[error("Login failed: {0}")]
    Authentication(String),

    /// Transport failure or non-success status on an assignment endpoint.
    #[error("Assignment request failed: {0}")]
    Assignment(String),
}

/// Failure of the dispatcher. Wraps the error of the chosen endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Batch assignment failed: {0}")]
    BatchAssignment(#[source] ApiError),
}

/// Anything that can end one assignment attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// A config file was found but could not be used.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
