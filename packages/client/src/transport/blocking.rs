//! [`HttpTransport`] over `reqwest`'s blocking client.

use std::time::Duration;

use adext::{Headers, HttpMethod, TransportError};
use reqwest::blocking::Client;
use reqwest::Method;

use super::{HttpTransport, TransportReply};

/// The default transport.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, TLS roots, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(
        &self,
        url: &str,
        method: HttpMethod,
        body: &str,
        headers: &Headers,
        timeout: Duration,
    ) -> Result<TransportReply, TransportError> {
        let method = match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut req = self.client.request(method, url).timeout(timeout);
        for (name, value) in headers.iter() {
            req = req.header(name, value);
        }
        if !body.is_empty() {
            req = req.body(body.to_string());
        }

        let resp = req.send().map_err(TransportError::new)?;
        let status = resp.status().as_u16();
        let headers: Headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = resp.text().map_err(TransportError::new)?;

        Ok(TransportReply {
            status,
            headers,
            body,
        })
    }
}
