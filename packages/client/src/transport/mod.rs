//! The HTTP boundary.
//!
//! [`HttpTransport`] is the only thing the client needs from an HTTP stack:
//! one blocking round trip. Network failures come back as
//! [`TransportError`]; any HTTP status, including 4xx/5xx, is a successful
//! round trip whose body the envelope decodes.

pub mod blocking;
pub mod mock;

use std::time::Duration;

use adext::{Headers, HttpMethod, TransportError};

/// What came back from one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
}

/// Sends one request and waits for the reply.
pub trait HttpTransport: Send + Sync {
    fn send(
        &self,
        url: &str,
        method: HttpMethod,
        body: &str,
        headers: &Headers,
        timeout: Duration,
    ) -> Result<TransportReply, TransportError>;
}
