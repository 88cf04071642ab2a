//! Scripted transport for tests.
//!
//! Replies are queued up front and handed out in order; every call is
//! recorded so tests can assert on the exact URL, body and headers sent.
//!
//! ```rust,ignore
//! let (transport, handle) = mock()
//!     .reply(MockReply::ok(r#"{"id":"1"}"#))
//!     .build();
//! // ... drive a client with `transport` ...
//! assert_eq!(handle.recorded()[0].url, "https://adext.com/v1.0/me?...");
//! handle.finish();
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use adext::{Headers, HttpMethod, TransportError};

use super::{HttpTransport, TransportReply};

/// One call as the transport saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub method: HttpMethod,
    pub body: String,
    pub headers: Headers,
    pub timeout: Duration,
}

/// A queued outcome: a reply, or a transport failure with this message.
#[derive(Debug, Clone)]
pub enum MockReply {
    Reply(TransportReply),
    Fail(String),
}

impl MockReply {
    /// 200 with a JSON body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        let headers: Headers = [("Content-Type", "application/json")].into_iter().collect();
        MockReply::Reply(TransportReply {
            status,
            headers,
            body: body.into(),
        })
    }

    pub fn fail(message: impl Into<String>) -> Self {
        MockReply::Fail(message.into())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let MockReply::Reply(reply) = &mut self {
            reply.headers.insert(name, value);
        }
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    recorded: Mutex<Vec<RecordedRequest>>,
    replies: Mutex<VecDeque<MockReply>>,
}

/// The transport half; hand it to the client.
#[derive(Debug, Clone)]
pub struct MockTransport {
    st: Arc<MockState>,
}

/// The test half; inspects what was sent.
#[derive(Debug)]
pub struct MockHandle {
    st: Arc<MockState>,
}

#[derive(Debug, Default)]
pub struct MockBuilder {
    replies: Vec<MockReply>,
}

pub fn mock() -> MockBuilder {
    MockBuilder::default()
}

impl MockBuilder {
    pub fn reply(mut self, r: MockReply) -> Self {
        self.replies.push(r);
        self
    }

    pub fn replies(mut self, rs: impl IntoIterator<Item = MockReply>) -> Self {
        self.replies.extend(rs);
        self
    }

    pub fn build(self) -> (MockTransport, MockHandle) {
        let st = Arc::new(MockState {
            recorded: Mutex::new(Vec::new()),
            replies: Mutex::new(self.replies.into_iter().collect()),
        });
        (MockTransport { st: Arc::clone(&st) }, MockHandle { st })
    }
}

impl MockHandle {
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.st
            .recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn recorded_len(&self) -> usize {
        self.st
            .recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn remaining_replies(&self) -> usize {
        self.st
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Panics if any queued reply was never consumed.
    pub fn finish(self) {
        let left = self.remaining_replies();
        assert_eq!(left, 0, "mock transport finished with {left} unused replies");
    }
}

impl HttpTransport for MockTransport {
    fn send(
        &self,
        url: &str,
        method: HttpMethod,
        body: &str,
        headers: &Headers,
        timeout: Duration,
    ) -> Result<TransportReply, TransportError> {
        self.st
            .recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                url: url.to_string(),
                method,
                body: body.to_string(),
                headers: headers.clone(),
                timeout,
            });

        let next = self
            .st
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(MockReply::Reply(reply)) => Ok(reply),
            Some(MockReply::Fail(message)) => Err(TransportError::msg(message)),
            None => Err(TransportError::msg(format!(
                "mock transport has no reply queued for {method} {url}"
            ))),
        }
    }
}
