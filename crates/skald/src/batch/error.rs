/// Error types for the batch job client

use std::time::Duration;

use thiserror::Error;

/// Batch API errors
#[derive(Error, Debug)]
pub enum BatchError {
    /// The job configuration is unusable; detected before any network call
    #[error("Invalid job configuration: {0}")]
    Validation(String),

    /// The service does not know this job id (HTTP 404)
    #[error("Job {0} not found")]
    JobNotFound(String),

    /// The auth token was rejected (HTTP 401)
    #[error("Authentication failed: check the auth token")]
    Unauthorized {
        /// Response body, for diagnostics
        body: String,
    },

    /// The service rejected the request (HTTP 400)
    #[error("Bad request: {body}")]
    BadRequest {
        /// Response body, usually a JSON error description
        body: String,
    },

    /// Any other non-2xx response
    #[error("HTTP error {status}: {body}")]
    HttpStatus {
        /// Response status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The job did not reach a terminal status within the wait budget.
    /// The remote job keeps running; it is not cancelled.
    #[error("Job {job_id} did not complete within {waited:?}")]
    Timeout {
        /// The job being waited on
        job_id: String,
        /// The elapsed budget
        waited: Duration,
    },

    /// The job reached the `rejected` status
    #[error("Job {id} was rejected: {reason}")]
    JobRejected {
        /// The rejected job
        id: String,
        /// Error detail reported by the service
        reason: String,
    },

    /// Transport-level failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body could not be parsed
    #[error("Invalid response payload: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    /// Reading the local audio file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    /// HTTP status carried by this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            BatchError::JobNotFound(_) => Some(404),
            BatchError::Unauthorized { .. } => Some(401),
            BatchError::BadRequest { .. } => Some(400),
            BatchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for batch operations
pub type BatchResult<T> = Result<T, BatchError>;
