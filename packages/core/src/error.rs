//! Error types shared by every layer of the client.
//!
//! [`AdextError`] is the single failure type surfaced to callers. Each variant
//! is detected locally and returned synchronously; nothing is retried or
//! swallowed inside the library.

use std::error::Error;
use std::fmt;

use crate::api_error::ApiError;

/// Everything that can go wrong while building, sending, or casting a call.
#[derive(Debug, thiserror::Error)]
pub enum AdextError {
    /// An access token was supplied twice (explicitly and through the endpoint
    /// or params) with different values.
    #[error("access token mismatch: the request already carries a different access token")]
    CredentialMismatch,

    /// The request's HTTP verb is missing or is not GET, POST or DELETE.
    #[error("{0}")]
    InvalidMethod(String),

    /// The decoded body is not a mapping, so it cannot be cast at all.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A node was requested where edge-shaped data was found, or vice versa.
    #[error("wrong shape: {0}")]
    WrongShape(String),

    /// A subtype name that is not the base node or one of its known subtypes.
    #[error("invalid subtype: {0}")]
    InvalidSubtype(String),

    /// Pagination was requested on an edge whose originating request is not a GET.
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    /// The request has no access token to send.
    #[error("you must provide an access token")]
    MissingAccessToken,

    /// Configuration could not be assembled.
    #[error("configuration error: {0}")]
    Config(String),

    /// The persistence store failed.
    #[error("store error: {0}")]
    Store(String),

    /// The API answered with an `error` payload.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Network or I/O failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl AdextError {
    /// The API error carried by this failure, if the server reported one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            AdextError::Api(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Opaque failure raised by an HTTP transport.
///
/// Wraps whatever the underlying client produced; the source chain is kept so
/// callers can still downcast to the concrete error if they need to.
#[derive(Debug)]
pub struct TransportError(Box<dyn Error + Send + Sync + 'static>);

impl TransportError {
    pub fn new(e: impl Error + Send + Sync + 'static) -> Self {
        Self(Box::new(e))
    }

    /// Build a transport error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self(message.into())
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.0)
    }
}
