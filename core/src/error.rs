//! Error types for the recipe client.
//!
//! # Design
//! `ApiError` is the single shape every backend call fails with. It is
//! `Clone + PartialEq` because failed reads are stored in the query cache and
//! handed to every subscriber. Timeouts and connection failures are separate
//! variants so a caller can tell "backend unreachable" apart from "backend
//! answered with an error"; both report `is_unreachable()`.

use thiserror::Error;

/// Message carried by `ApiError::TimedOut`.
pub const TIMED_OUT_MESSAGE: &str = "Request timed out - is the backend running?";

/// Errors returned by `RecipeApi` and `RecipeClient` parse methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response arrived within the request timeout.
    #[error("{}", TIMED_OUT_MESSAGE)]
    TimedOut,

    /// The request never produced a response: connection refused, DNS
    /// failure, connection reset.
    #[error("could not reach the backend: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status. `message` is the response
    /// body, or `HTTP error <status>` when the body was empty.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl ApiError {
    /// Build a status error from a response body, falling back to a generic
    /// message when the body is empty.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = if body.is_empty() {
            format!("HTTP error {status}")
        } else {
            body.to_string()
        };
        ApiError::Status { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::TimedOut | ApiError::Transport(_))
    }
}

/// Errors from the image upload service client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Please select an image file")]
    NotAnImage,

    #[error("Image must be less than 10MB")]
    TooLarge { size: usize },

    /// The upload service answered with a non-2xx status.
    #[error("Upload failed")]
    Rejected { status: u16 },

    #[error("unexpected upload response: {0}")]
    Decode(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Validation failures of the recipe form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("title is required")]
    MissingTitle,

    #[error("description is required")]
    MissingDescription,
}

/// Returned when a select value names no known category or difficulty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value: {0}")]
pub struct UnknownVariant(pub String);

/// A configuration value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
