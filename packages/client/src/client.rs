//! The sender: turns a [`SignedRequest`] into one transport round trip and
//! wraps the reply in a [`RawResponse`].

use std::time::{Duration, Instant};

use adext::request::{append_params_to_url, query_params};
use adext::{AdextError, Headers, HttpMethod, Params, RawResponse, SignedRequest};
use tracing::{debug, trace, warn};

use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::counter::RequestCounter;
use crate::transport::HttpTransport;

/// Everything the transport needs for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCall {
    pub url: String,
    pub method: HttpMethod,
    pub body: String,
    pub headers: Headers,
}

/// Sends signed requests through an [`HttpTransport`].
pub struct AdextClient {
    transport: Box<dyn HttpTransport>,
    base_url: String,
    timeout: Duration,
    counter: RequestCounter,
}

impl AdextClient {
    pub fn new(transport: impl HttpTransport + 'static, base_url: impl Into<String>) -> Self {
        Self {
            transport: Box::new(transport),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            counter: RequestCounter::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Count round trips on `counter` instead of a private one.
    pub fn with_counter(mut self, counter: RequestCounter) -> Self {
        self.counter = counter;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn counter(&self) -> &RequestCounter {
        &self.counter
    }

    /// Absolute URL, method, form-encoded body and headers for `request`.
    pub fn prepare(&self, request: &SignedRequest) -> Result<PreparedCall, AdextError> {
        let method = request.validate_method()?;
        let url = format!("{}{}", self.base_url, request.url()?);
        let mut headers = request.headers();
        headers.insert("Content-Type", "application/x-www-form-urlencoded");
        Ok(PreparedCall {
            url,
            method,
            body: request.url_encoded_body(),
            headers,
        })
    }

    /// One round trip. Fails before sending when the request has no access
    /// token or no valid method; fails after when the API answered with an
    /// `error` payload.
    pub fn send_request(&self, request: &SignedRequest) -> Result<RawResponse, AdextError> {
        request.validate_access_token()?;
        let call = self.prepare(request)?;

        let count = self.counter.increment();
        debug!(
            method = %call.method,
            url = %redact_url(&call.url),
            headers = ?call.headers.redacted(),
            request_count = count,
            "sending request"
        );

        let started = Instant::now();
        let reply = self
            .transport
            .send(&call.url, call.method, &call.body, &call.headers, self.timeout)
            .map_err(|e| {
                warn!(method = %call.method, url = %redact_url(&call.url), error = %e, "transport failed");
                e
            })?;

        debug!(
            status = reply.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "received response"
        );
        trace!(bytes = reply.body.len(), "response body");

        let response = RawResponse::new(request.clone(), reply.status, reply.headers, reply.body);
        if let Some(err) = response.thrown_exception() {
            warn!(
                status = err.status(),
                code = ?err.code(),
                subcode = ?err.subcode(),
                category = %err.category(),
                "api error: {}",
                err.message()
            );
        }
        response.error_for_api()
    }
}

/// `url` with credential query values replaced, for logs.
pub fn redact_url(url: &str) -> String {
    let Some((path, _)) = url.split_once('?') else {
        return url.to_string();
    };
    let params: Params = query_params(url)
        .into_iter()
        .map(|(k, v)| {
            if k == "access_token" || k == "appsecret_proof" {
                (k, "REDACTED".to_string())
            } else {
                (k, v)
            }
        })
        .collect();
    append_params_to_url(path, &params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{mock, MockReply};
    use adext::App;

    fn request(method: HttpMethod) -> SignedRequest {
        SignedRequest::builder()
            .app(App::new("123", "foo_secret"))
            .access_token("foo_token")
            .method(method)
            .endpoint("/me")
            .param("fields", "id,name")
            .build()
            .unwrap()
    }

    #[test]
    fn get_sends_query_and_default_headers() {
        let (transport, handle) = mock().reply(MockReply::ok(r#"{"id":"1"}"#)).build();
        let client = AdextClient::new(transport, "https://adext.com/");
        let resp = client.send_request(&request(HttpMethod::Get)).unwrap();
        assert_eq!(resp.node(None).unwrap().id().as_deref(), Some("1"));

        let sent = &handle.recorded()[0];
        assert_eq!(sent.method, HttpMethod::Get);
        assert!(sent
            .url
            .starts_with("https://adext.com/v1.0/me?fields=id%2Cname&access_token=foo_token&appsecret_proof="));
        assert_eq!(sent.body, "");
        assert_eq!(sent.headers.get("Accept-Encoding"), Some("*"));
        assert_eq!(
            sent.headers.get("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(sent.timeout, Duration::from_secs(60));
        assert_eq!(client.counter().get(), 1);
        handle.finish();
    }

    #[test]
    fn post_sends_body() {
        let (transport, handle) = mock().reply(MockReply::ok(r#"{"id":"9"}"#)).build();
        let client = AdextClient::new(transport, "https://adext.com").with_timeout(Duration::from_secs(5));
        client.send_request(&request(HttpMethod::Post)).unwrap();
        let sent = &handle.recorded()[0];
        assert_eq!(sent.url, "https://adext.com/v1.0/me");
        assert!(sent.body.starts_with("fields=id%2Cname&access_token=foo_token&appsecret_proof="));
        assert_eq!(sent.timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_token_fails_before_sending() {
        let (transport, handle) = mock().build();
        let client = AdextClient::new(transport, "https://adext.com");
        let req = SignedRequest::builder()
            .method(HttpMethod::Get)
            .endpoint("/me")
            .build()
            .unwrap();
        assert!(matches!(client.send_request(&req), Err(AdextError::MissingAccessToken)));
        assert_eq!(handle.recorded_len(), 0);
        assert_eq!(client.counter().get(), 0);
    }

    #[test]
    fn invalid_method_fails_before_sending() {
        let (transport, handle) = mock().build();
        let client = AdextClient::new(transport, "https://adext.com");
        let req = SignedRequest::builder()
            .access_token("t")
            .method("PUT")
            .endpoint("/me")
            .build()
            .unwrap();
        assert!(matches!(client.send_request(&req), Err(AdextError::InvalidMethod(_))));
        assert_eq!(handle.recorded_len(), 0);
    }

    #[test]
    fn api_error_payload_is_raised() {
        let (transport, _handle) = mock()
            .reply(MockReply::status(
                400,
                r#"{"error":{"message":"Unsupported get request.","type":"GraphMethodException","code":100}}"#,
            ))
            .build();
        let client = AdextClient::new(transport, "https://adext.com");
        let err = client.send_request(&request(HttpMethod::Get)).unwrap_err();
        let api = err.api_error().unwrap();
        assert_eq!(api.status(), 400);
        assert_eq!(api.code(), Some(100));
        assert_eq!(api.message(), "Unsupported get request.");
    }

    #[test]
    fn transport_failure_propagates() {
        let (transport, _handle) = mock().reply(MockReply::fail("connection reset")).build();
        let client = AdextClient::new(transport, "https://adext.com");
        let err = client.send_request(&request(HttpMethod::Get)).unwrap_err();
        assert!(matches!(err, AdextError::Transport(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn injected_counter_is_shared() {
        let counter = RequestCounter::new();
        let (transport, _handle) = mock()
            .replies([MockReply::ok("{}"), MockReply::ok("{}")])
            .build();
        let client = AdextClient::new(transport, "https://adext.com").with_counter(counter.clone());
        client.send_request(&request(HttpMethod::Get)).unwrap();
        client.send_request(&request(HttpMethod::Get)).unwrap();
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn redact_url_hides_credentials() {
        assert_eq!(
            redact_url("https://adext.com/v1.0/me?fields=id&access_token=abc&appsecret_proof=def"),
            "https://adext.com/v1.0/me?fields=id&access_token=REDACTED&appsecret_proof=REDACTED"
        );
        assert_eq!(redact_url("https://adext.com/v1.0/me"), "https://adext.com/v1.0/me");
    }
}
