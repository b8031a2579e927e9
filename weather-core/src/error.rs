//! Failure types surfaced by the remote client and the location provider.

/// Why a single weather fetch did not produce a record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The service answered but could not resolve the location.
    #[error("City not found: {0}")]
    NotFound(String),

    #[error("Weather service rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// DNS, connect, timeout or body read failure.
    #[error("{0}")]
    Transport(String),

    #[error("Failed to parse weather response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    /// The provider answered without a fix.
    #[error("Unable to get location")]
    Unavailable,

    #[error("Location error: {0}")]
    Failed(String),
}
