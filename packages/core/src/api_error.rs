//! Server-reported error payloads.
//!
//! Error responses carry a top-level `error` member:
//!
//! ```json
//! {"error": {"message": "...", "type": "OAuthException", "code": 190,
//!            "error_subcode": 463, "fbtrace_id": "Ab12"}}
//! ```
//!
//! The envelope builds an [`ApiError`] as soon as it sees that member; whether
//! it is raised is up to the caller.

use serde_json::{Map, Value};

/// Coarse grouping of API error codes.
///
/// | Category | Codes |
/// |----------|-------|
/// | `Authentication` | subcodes 458, 459, 460, 463, 464, 467; codes 100, 102, 190; any `OAuthException` |
/// | `Server` | 1, 2 |
/// | `Throttle` | 4, 17, 32, 341, 613 |
/// | `Client` | 506 (duplicate post) |
/// | `Authorization` | 10, 200–299 |
/// | `Other` | everything else |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Server,
    Throttle,
    Client,
    Authorization,
    Other,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Authentication => write!(f, "authentication"),
            ErrorCategory::Server => write!(f, "server"),
            ErrorCategory::Throttle => write!(f, "throttle"),
            ErrorCategory::Client => write!(f, "client"),
            ErrorCategory::Authorization => write!(f, "authorization"),
            ErrorCategory::Other => write!(f, "other"),
        }
    }
}

impl ErrorCategory {
    fn classify(code: Option<i64>, subcode: Option<i64>, error_type: Option<&str>) -> Self {
        if matches!(subcode, Some(458 | 459 | 460 | 463 | 464 | 467)) {
            return ErrorCategory::Authentication;
        }
        match code {
            Some(100 | 102 | 190) => ErrorCategory::Authentication,
            Some(1 | 2) => ErrorCategory::Server,
            Some(4 | 17 | 32 | 341 | 613) => ErrorCategory::Throttle,
            Some(506) => ErrorCategory::Client,
            Some(10) | Some(200..=299) => ErrorCategory::Authorization,
            _ if error_type == Some("OAuthException") => ErrorCategory::Authentication,
            _ => ErrorCategory::Other,
        }
    }
}

/// An error payload returned by the API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("api error (status {status}, {category}): {message}")]
pub struct ApiError {
    status: u16,
    message: String,
    error_type: Option<String>,
    code: Option<i64>,
    subcode: Option<i64>,
    trace_id: Option<String>,
    category: ErrorCategory,
    raw_body: String,
}

impl ApiError {
    /// Build from a decoded body whose `error` member is present.
    ///
    /// `error` may be an object (the usual case) or a bare string, which is
    /// taken as the message.
    pub fn from_decoded(status: u16, decoded: &Map<String, Value>, raw_body: &str) -> Self {
        let mut err = Self::from_message(status, "Unknown error from the API.");
        err.raw_body = raw_body.to_string();

        match decoded.get("error") {
            Some(Value::Object(obj)) => {
                if let Some(m) = obj.get("message").and_then(Value::as_str) {
                    err.message = m.to_string();
                }
                err.error_type = obj.get("type").and_then(Value::as_str).map(str::to_string);
                err.code = obj.get("code").and_then(as_code);
                err.subcode = obj.get("error_subcode").and_then(as_code);
                err.trace_id = obj
                    .get("fbtrace_id")
                    .or_else(|| obj.get("trace_id"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
            Some(Value::String(m)) => err.message = m.clone(),
            _ => {}
        }

        err.category = ErrorCategory::classify(err.code, err.subcode, err.error_type.as_deref());
        err
    }

    /// A bare error with only a status and message.
    pub fn from_message(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_type: None,
            code: None,
            subcode: None,
            trace_id: None,
            category: ErrorCategory::Other,
            raw_body: String::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error_type(&self) -> Option<&str> {
        self.error_type.as_deref()
    }

    pub fn code(&self) -> Option<i64> {
        self.code
    }

    pub fn subcode(&self) -> Option<i64> {
        self.subcode
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// The undecoded response body the error was read from.
    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }
}

/// Codes arrive as numbers, but some proxies stringify them.
fn as_code(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
