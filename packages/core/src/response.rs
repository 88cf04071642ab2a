//! The raw response envelope: one HTTP round trip, decoded once.
//!
//! Decoding never fails. The body is read as JSON when possible, with three
//! quirks of the API handled along the way:
//!
//! | Body | Decoded as |
//! |------|------------|
//! | JSON object | itself |
//! | JSON list | `{"0": .., "1": ..}` |
//! | bare number, or numeric JSON string | `{"id": "<text>"}` |
//! | not JSON (or JSON `null`) | `application/x-www-form-urlencoded` pairs |
//! | any other JSON scalar | `{}` |
//!
//! A decoded `error` member produces an [`ApiError`] straight away; it is
//! only raised when the caller asks for it.

use std::sync::Arc;

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::api_error::ApiError;
use crate::credentials::AccessToken;
use crate::edge::Edge;
use crate::error::AdextError;
use crate::factory::{index_keyed, NodeFactory};
use crate::headers::Headers;
use crate::kind::NodeKind;
use crate::node::{Node, NodeOrEdge};
use crate::request::SignedRequest;

/// Header carrying the entity-tag of the returned representation.
pub const ETAG_HEADER: &str = "ETag";

/// Header naming the API version that actually served the call.
pub const API_VERSION_HEADER: &str = "Adext-API-Version";

/// Status code, headers and body of one call, plus the request that made it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    request: Arc<SignedRequest>,
    status: u16,
    headers: Headers,
    body: String,
    decoded: Map<String, Value>,
    error: Option<ApiError>,
}

impl RawResponse {
    pub fn new(
        request: impl Into<Arc<SignedRequest>>,
        status: u16,
        headers: Headers,
        body: impl Into<String>,
    ) -> Self {
        let body = body.into();
        let decoded = decode_body(&body);
        let error = decoded
            .get("error")
            .is_some_and(|e| !e.is_null())
            .then(|| ApiError::from_decoded(status, &decoded, &body));
        Self {
            request: request.into(),
            status,
            headers,
            body,
            decoded,
            error,
        }
    }

    pub fn request(&self) -> &SignedRequest {
        &self.request
    }

    /// Shared handle on the request, for edges that outlive this envelope.
    pub fn request_handle(&self) -> Arc<SignedRequest> {
        Arc::clone(&self.request)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn decoded_body(&self) -> &Map<String, Value> {
        &self.decoded
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.request.access_token()
    }

    pub fn app_secret_proof(&self) -> Option<String> {
        self.request.app_secret_proof()
    }

    pub fn etag(&self) -> Option<&str> {
        self.headers.get(ETAG_HEADER)
    }

    pub fn api_version(&self) -> Option<&str> {
        self.headers.get(API_VERSION_HEADER)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The error built from the body's `error` member, if any. Not raised.
    pub fn thrown_exception(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    /// `Err` with the API error when the body carried one, else the envelope.
    pub fn error_for_api(self) -> Result<Self, AdextError> {
        match self.error {
            Some(err) => Err(AdextError::Api(err)),
            None => Ok(self),
        }
    }

    // ---- casting ----

    pub fn classify(&self, hint: Option<NodeKind>) -> Result<NodeOrEdge, AdextError> {
        NodeFactory::from_response(self).classify(hint)
    }

    pub fn node(&self, hint: Option<NodeKind>) -> Result<Node, AdextError> {
        NodeFactory::from_response(self).make_node(hint)
    }

    pub fn edge(&self, hint: Option<NodeKind>) -> Result<Edge, AdextError> {
        NodeFactory::from_response(self).make_edge(hint)
    }

    pub fn achievement(&self) -> Result<Node, AdextError> {
        self.node(Some(NodeKind::Achievement))
    }

    pub fn album(&self) -> Result<Node, AdextError> {
        self.node(Some(NodeKind::Album))
    }

    pub fn event(&self) -> Result<Node, AdextError> {
        self.node(Some(NodeKind::Event))
    }

    pub fn group(&self) -> Result<Node, AdextError> {
        self.node(Some(NodeKind::Group))
    }

    pub fn page(&self) -> Result<Node, AdextError> {
        self.node(Some(NodeKind::Page))
    }

    pub fn session_info(&self) -> Result<Node, AdextError> {
        self.node(Some(NodeKind::SessionInfo))
    }

    pub fn user(&self) -> Result<Node, AdextError> {
        self.node(Some(NodeKind::User))
    }
}

/// Decode a raw body into a mapping; see the module docs for the rules.
pub fn decode_body(body: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(Value::Array(items)) => index_keyed(&items),
        Ok(Value::Number(n)) => id_only(n.to_string()),
        Ok(Value::String(s)) if is_numeric(&s) => id_only(s),
        Ok(Value::Null) | Err(_) => decode_form(body),
        Ok(_) => Map::new(),
    }
}

fn id_only(id: String) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("id".into(), Value::String(id));
    map
}

fn decode_form(body: &str) -> Map<String, Value> {
    form_urlencoded::parse(body.trim().as_bytes())
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect()
}

/// Decimal or float text with optional sign and exponent, like `"12345"`
/// or `" -1.5e3"`.
fn is_numeric(s: &str) -> bool {
    let t = s.trim_start();
    !t.is_empty()
        && t.bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        && t.bytes().any(|b| b.is_ascii_digit())
        && t.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_error::ErrorCategory;
    use crate::request::HttpMethod;
    use serde_json::json;

    fn request() -> SignedRequest {
        SignedRequest::builder()
            .access_token("foo_token")
            .method(HttpMethod::Get)
            .endpoint("/me")
            .build()
            .unwrap()
    }

    fn response(body: &str) -> RawResponse {
        RawResponse::new(request(), 200, Headers::new(), body)
    }

    #[test]
    fn json_object_is_decoded() {
        let resp = response(r#"{"id":"123","name":"Foo"}"#);
        assert_eq!(resp.decoded_body().get("name"), Some(&json!("Foo")));
        assert!(!resp.is_error());
    }

    #[test]
    fn bare_numeric_bodies_become_id() {
        for body in ["12345", r#""12345""#] {
            let node = response(body).node(None).unwrap();
            assert_eq!(node.len(), 1);
            assert_eq!(node.get_str("id"), Some("12345"));
        }
    }

    #[test]
    fn form_encoded_body_is_decoded() {
        let resp = response("access_token=123_access_token&expires=5183999");
        assert_eq!(resp.decoded_body().get("access_token"), Some(&json!("123_access_token")));
        assert_eq!(resp.decoded_body().get("expires"), Some(&json!("5183999")));
    }

    #[test]
    fn other_scalars_and_empty_bodies_decode_to_empty() {
        assert!(response("true").decoded_body().is_empty());
        assert!(response(r#""hello""#).decoded_body().is_empty());
        assert!(response("").decoded_body().is_empty());
    }

    #[test]
    fn top_level_list_is_index_keyed() {
        let resp = response(r#"[{"id":"1"},{"id":"2"}]"#);
        let keys: Vec<&String> = resp.decoded_body().keys().collect();
        assert_eq!(keys, ["0", "1"]);
    }

    #[test]
    fn error_payload_is_built_but_not_raised() {
        let body = r#"{"error":{"message":"Foo error","type":"OAuthException","code":190,"error_subcode":463}}"#;
        let resp = RawResponse::new(request(), 401, Headers::new(), body);
        assert!(resp.is_error());
        let err = resp.thrown_exception().unwrap();
        assert_eq!(err.message(), "Foo error");
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert_eq!(resp.status(), 401);
        assert_eq!(resp.body(), body);

        match resp.error_for_api() {
            Err(AdextError::Api(e)) => assert_eq!(e.code(), Some(190)),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn null_error_member_is_not_an_error() {
        let resp = response(r#"{"id":"1","error":null}"#);
        assert!(!resp.is_error());
        assert!(resp.thrown_exception().is_none());
        assert!(resp.error_for_api().is_ok());
    }

    #[test]
    fn metadata_headers() {
        let headers: Headers = [("etag", "\"9d86b21aa74d74e574bbb35ba13524a52deb96e3\""), ("Adext-API-Version", "v1.0")]
            .into_iter()
            .collect();
        let resp = RawResponse::new(request(), 200, headers, "{}");
        assert_eq!(resp.etag(), Some("\"9d86b21aa74d74e574bbb35ba13524a52deb96e3\""));
        assert_eq!(resp.api_version(), Some("v1.0"));
    }

    #[test]
    fn credential_accessors_delegate_to_request() {
        let resp = response("{}");
        assert_eq!(resp.access_token().map(|t| t.value()), Some("foo_token"));
        assert_eq!(resp.app_secret_proof(), None);
    }

    #[test]
    fn typed_casts() {
        let resp = response(r#"{"id":"1","hometown":{"id":"2"}}"#);
        let user = resp.user().unwrap();
        assert_eq!(user.kind(), NodeKind::User);
        assert_eq!(user.get_node("hometown").unwrap().kind(), NodeKind::Page);
        assert_eq!(resp.page().unwrap().kind(), NodeKind::Page);
        assert!(resp.edge(None).is_err());
    }

    #[test]
    fn numeric_detection() {
        assert!(is_numeric("12345"));
        assert!(is_numeric(" -1.5e3"));
        assert!(!is_numeric("12a"));
        assert!(!is_numeric("inf"));
        assert!(!is_numeric("."));
        assert!(!is_numeric(""));
    }
}
