/*!
 * Error types for the doclingo application.
 *
 * This module contains custom error types for the different layers of the
 * translation pipeline, using the thiserror crate for ergonomic definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to the text-generation service
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }
}

/// Structural errors in a document's metadata block
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The metadata block is not valid YAML
    #[error("Malformed metadata block: {0}")]
    MalformedMetadata(String),

    /// The metadata block parsed, but is not a key/value mapping
    #[error("Metadata block is not a mapping")]
    NotAMapping,

    /// The translated metadata could not be written back out
    #[error("Failed to serialize metadata block: {0}")]
    Serialization(String),
}

/// Errors while discovering the set of files to process.
///
/// These are fatal to a changeset run: a partial file list cannot be trusted.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The git executable could not be started
    #[error("git executable not found: {0}")]
    GitNotFound(String),

    /// git ran but reported a failure
    #[error("git command failed ({status}): {stderr}")]
    GitFailed {
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The given path is not inside a git working tree
    #[error("Not a git repository: {0}")]
    NotARepository(String),

    /// The input directory for a full-tree scan could not be read
    #[error("Failed to scan directory {path}: {message}")]
    Scan {
        /// Directory being scanned
        path: String,
        /// Underlying error message
        message: String,
    },
}
