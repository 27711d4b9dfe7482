//! Top-level error aggregation.
//!
//! Each subsystem (signing, credentials, protocol encode/decode, dispatch)
//! defines its own `thiserror` enum; this module only stitches them together
//! into the one type the orchestrator hands back to callers, the way the
//! teacher's `S3Error: From<StorageError>` bridges storage errors into the
//! API layer.

use thiserror::Error;

use crate::credentials::CredentialsError;
use crate::protocol::DecodeError;
use crate::shape::ValidationError;
use crate::signer::SigningError;

/// Error surfaced by the dispatch orchestrator.
///
/// Every error from an inner subsystem is surfaced unmodified:
/// the orchestrator recovers nothing locally except the credential chain's
/// `NoProvider`, which the chain itself treats as "try next" before ever
/// reaching this type.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A service-reported error (client 4xx or server 5xx), already decoded
    /// and classified.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// Propagated from the caller-supplied `HttpTransport`.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// An HTTP transport failure, opaque to this core.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// Set when the transport detected the body it sent or received did not
    /// match its declared length.
    pub body_length_mismatch: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            body_length_mismatch: false,
        }
    }

    pub fn body_length_mismatch(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            body_length_mismatch: true,
        }
    }
}

/// A decoded and classified service error.
#[derive(Debug, Clone, Error)]
#[error("{kind:?} {code} ({status}): {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub code: String,
    pub message: String,
    pub status: u16,
    pub additional_fields: std::collections::HashMap<String, String>,
    /// The service-specific error type name, when `ServiceConfig`'s
    /// `error_code_map` recognized `code`.
    pub extended_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    Client,
    Server,
}

impl ServiceErrorKind {
    pub fn from_status(status: u16) -> Self {
        if (500..600).contains(&status) {
            ServiceErrorKind::Server
        } else {
            ServiceErrorKind::Client
        }
    }
}
