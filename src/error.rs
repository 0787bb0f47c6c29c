//! Error types for rsfairplay.

use thiserror::Error;

/// Main error type for rsfairplay operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The certificate request completed with a non-success status.
    #[error("Certificate request failed with status {status}")]
    CertificateStatus { status: u16 },

    /// The license request completed with a non-success status.
    #[error("License request failed with status {status}")]
    LicenseStatus { status: u16 },

    /// The transport failed to deliver a response (connect error, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The environment rejected a license update.
    #[error("License update rejected: {0}")]
    UpdateRejected(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),

    /// HTTP client error.
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias for rsfairplay operations.
pub type Result<T> = std::result::Result<T, Error>;
