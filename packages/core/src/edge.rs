//! Edges: ordered, homogeneously typed collections with paging metadata.
//!
//! An [`Edge`] remembers the request that produced it, so it can derive the
//! request for the adjacent page on its own. Two addressing schemes share one
//! code path:
//!
//! - **cursor**: `paging.cursors.{before,after}` plus `paging.{previous,next}`
//! - **offset**: only `paging.{previous,next}` URLs
//!
//! Either way the follow-up is a clone of the originating request with the
//! endpoint swapped for the path and query of the paging URL. Scheme, host and
//! the API version segment of that URL are discarded.

use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::AdextError;
use crate::kind::NodeKind;
use crate::node::Node;
use crate::request::{HttpMethod, SignedRequest};

/// Which neighbouring page to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

impl Direction {
    /// Key under `paging` holding the page URL.
    pub fn paging_key(self) -> &'static str {
        match self {
            Direction::Next => "next",
            Direction::Previous => "previous",
        }
    }

    /// Key under `paging.cursors` holding the cursor.
    pub fn cursor_key(self) -> &'static str {
        match self {
            Direction::Next => "after",
            Direction::Previous => "before",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.paging_key())
    }
}

/// Parses `next`/`after` and `previous`/`before`.
impl std::str::FromStr for Direction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "next" | "after" => Ok(Direction::Next),
            "previous" | "before" => Ok(Direction::Previous),
            _ => Err(format!(
                "unknown direction {s:?}; expected one of: next, previous"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// An ordered list of [`Node`]s sharing one subtype, plus everything else the
/// collection object carried (`paging`, `summary`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    items: Vec<Node>,
    metadata: Map<String, Value>,
    parent_edge_endpoint: Option<String>,
    subclass_hint: Option<NodeKind>,
    request: Arc<SignedRequest>,
}

impl Edge {
    pub fn new(
        request: Arc<SignedRequest>,
        items: Vec<Node>,
        metadata: Map<String, Value>,
        parent_edge_endpoint: Option<String>,
        subclass_hint: Option<NodeKind>,
    ) -> Self {
        Self {
            items,
            metadata,
            parent_edge_endpoint,
            subclass_hint,
            request,
        }
    }

    pub fn items(&self) -> &[Node] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Everything in the source object except `data`.
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// `/{parent id}/{field}` when this edge was a field of a node with an id.
    pub fn parent_edge_endpoint(&self) -> Option<&str> {
        self.parent_edge_endpoint.as_deref()
    }

    /// The subtype the members were cast to; reuse it when casting more pages.
    pub fn subclass_hint(&self) -> Option<NodeKind> {
        self.subclass_hint
    }

    pub fn request(&self) -> &SignedRequest {
        &self.request
    }

    // ---- paging ----

    /// Raw cursor for `direction`, informational only.
    pub fn cursor(&self, direction: Direction) -> Option<&str> {
        self.paging()?
            .get("cursors")?
            .get(direction.cursor_key())?
            .as_str()
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor(Direction::Next)
    }

    pub fn previous_cursor(&self) -> Option<&str> {
        self.cursor(Direction::Previous)
    }

    /// Path and query of the paging URL for `direction`, or `None` at the end
    /// of the collection.
    ///
    /// Fails with [`AdextError::InvalidPagination`] when the originating
    /// request is not a GET, whether or not a URL exists.
    pub fn pagination_url(&self, direction: Direction) -> Result<Option<String>, AdextError> {
        self.validate_for_pagination()?;
        let url = self
            .paging()
            .and_then(|p| p.get(direction.paging_key()))
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty());
        Ok(url.map(base_endpoint))
    }

    pub fn validate_for_pagination(&self) -> Result<(), AdextError> {
        if self.request.method() == Some(HttpMethod::Get) {
            Ok(())
        } else {
            Err(AdextError::InvalidPagination(
                "You can only paginate on a GET request.".into(),
            ))
        }
    }

    /// The request for the adjacent page, or `None` when there is none.
    pub fn pagination_request(
        &self,
        direction: Direction,
    ) -> Result<Option<SignedRequest>, AdextError> {
        match self.pagination_url(direction)? {
            Some(url) => Ok(Some(self.request.with_endpoint(&url)?)),
            None => Ok(None),
        }
    }

    pub fn next_page_request(&self) -> Result<Option<SignedRequest>, AdextError> {
        self.pagination_request(Direction::Next)
    }

    pub fn previous_page_request(&self) -> Result<Option<SignedRequest>, AdextError> {
        self.pagination_request(Direction::Previous)
    }

    /// `summary.total_count`, present only when the request asked for a summary.
    pub fn total_count(&self) -> Option<u64> {
        self.metadata.get("summary")?.get("total_count")?.as_u64()
    }

    /// A new edge with `f` applied to every member; metadata, parent endpoint,
    /// hint and originating request are kept.
    pub fn map<F>(&self, f: F) -> Edge
    where
        F: FnMut(&Node) -> Node,
    {
        Edge {
            items: self.items.iter().map(f).collect(),
            metadata: self.metadata.clone(),
            parent_edge_endpoint: self.parent_edge_endpoint.clone(),
            subclass_hint: self.subclass_hint,
            request: Arc::clone(&self.request),
        }
    }

    /// `{"data": [...], ...metadata}`.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "data".into(),
            Value::Array(self.items.iter().map(Node::to_json).collect()),
        );
        for (k, v) in &self.metadata {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    fn paging(&self) -> Option<&Value> {
        self.metadata.get("paging")
    }
}

impl<'a> IntoIterator for &'a Edge {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for Edge {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl Serialize for Edge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Reduce a paging URL to `/path?query`, dropping scheme, host and a leading
/// `/vX.Y` version segment.
///
/// ```text
/// https://adext.com/v1.0/998/friends?after=QVFI  ->  /998/friends?after=QVFI
/// /v2.3/me/photos?limit=5                        ->  /me/photos?limit=5
/// ```
pub fn base_endpoint(url: &str) -> String {
    let path_and_query = match url::Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(q) => format!("{}?{q}", parsed.path()),
            None => parsed.path().to_string(),
        },
        // relative: already a path
        Err(_) => url.to_string(),
    };

    let (path, query) = match path_and_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_and_query.as_str(), None),
    };
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.first().is_some_and(|s| is_version_segment(s)) {
        segments.remove(0);
    }

    let mut out = format!("/{}", segments.join("/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    out
}

/// `v1`, `v2.5`, `v10.0`.
fn is_version_segment(segment: &str) -> bool {
    let Some(rest) = segment.strip_prefix('v') else {
        return false;
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match rest.split_once('.') {
        Some((major, minor)) => digits(major) && digits(minor),
        None => digits(rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Field;
    use indexmap::IndexMap;
    use serde_json::json;

    fn request(method: HttpMethod) -> Arc<SignedRequest> {
        Arc::new(
            SignedRequest::builder()
                .access_token("foo_token")
                .method(method)
                .endpoint("/1337/photos")
                .param("foo", "bar")
                .build()
                .unwrap(),
        )
    }

    fn node(id: &str) -> Node {
        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), Field::Scalar(json!(id)));
        Node::new(NodeKind::Node, fields)
    }

    fn meta(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn paged(method: HttpMethod) -> Edge {
        Edge::new(
            request(method),
            vec![node("1"), node("2")],
            meta(json!({
                "paging": {
                    "cursors": {"after": "bar_after_cursor", "before": "bar_before_cursor"},
                    "previous": "https://adext.com/v7.12/998899/photos?pretty=0&limit=25&before=foo_before_cursor",
                    "next": "https://adext.com/v7.12/998899/photos?pretty=0&limit=25&after=foo_after_cursor"
                },
                "summary": {"total_count": 42}
            })),
            None,
            Some(NodeKind::Picture),
        )
    }

    #[test]
    fn cursors_come_from_paging_metadata() {
        let edge = paged(HttpMethod::Get);
        assert_eq!(edge.next_cursor(), Some("bar_after_cursor"));
        assert_eq!(edge.previous_cursor(), Some("bar_before_cursor"));
        assert_eq!(edge.cursor(Direction::Next), edge.next_cursor());
    }

    #[test]
    fn pagination_url_strips_host_and_version() {
        let edge = paged(HttpMethod::Get);
        assert_eq!(
            edge.pagination_url(Direction::Next).unwrap().as_deref(),
            Some("/998899/photos?pretty=0&limit=25&after=foo_after_cursor")
        );
        assert_eq!(
            edge.pagination_url(Direction::Previous).unwrap().as_deref(),
            Some("/998899/photos?pretty=0&limit=25&before=foo_before_cursor")
        );
    }

    #[test]
    fn pagination_request_clones_and_retargets() {
        let edge = paged(HttpMethod::Get);
        let next = edge.next_page_request().unwrap().unwrap();
        assert_eq!(next.endpoint(), "/998899/photos?pretty=0&limit=25&after=foo_after_cursor");
        assert_eq!(next.method(), Some(HttpMethod::Get));
        assert_eq!(next.access_token().map(|t| t.value()), Some("foo_token"));
        assert_eq!(next.params().get("foo").map(String::as_str), Some("bar"));
        assert_eq!(edge.request().endpoint(), "/1337/photos");

        let prev = edge.previous_page_request().unwrap().unwrap();
        assert!(prev.endpoint().ends_with("before=foo_before_cursor"));
    }

    #[test]
    fn pagination_on_post_request_is_invalid() {
        let edge = paged(HttpMethod::Post);
        assert!(matches!(
            edge.next_page_request(),
            Err(AdextError::InvalidPagination(ref m)) if m == "You can only paginate on a GET request."
        ));
    }

    #[test]
    fn missing_paging_url_means_no_further_page() {
        let edge = Edge::new(
            request(HttpMethod::Get),
            vec![node("1")],
            meta(json!({"paging": {"cursors": {"before": "b"}}})),
            None,
            None,
        );
        assert_eq!(edge.next_page_request().unwrap(), None);
        assert_eq!(edge.next_cursor(), None);
        assert_eq!(edge.previous_cursor(), Some("b"));
        assert_eq!(edge.total_count(), None);
    }

    #[test]
    fn total_count_reads_summary() {
        assert_eq!(paged(HttpMethod::Get).total_count(), Some(42));
    }

    #[test]
    fn map_preserves_context() {
        let edge = Edge::new(
            request(HttpMethod::Get),
            vec![node("1"), node("2")],
            meta(json!({"paging": {"next": "/v1.0/1/friends?after=x"}})),
            Some("/1/friends".into()),
            Some(NodeKind::User),
        );
        let mapped = edge.map(|n| {
            let mut fields = IndexMap::new();
            fields.insert("id".to_string(), Field::Scalar(json!(format!("x{}", n.id().unwrap()))));
            Node::new(n.kind(), fields)
        });
        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped.get(1).and_then(Node::id).as_deref(), Some("x2"));
        assert_eq!(mapped.metadata(), edge.metadata());
        assert_eq!(mapped.parent_edge_endpoint(), Some("/1/friends"));
        assert_eq!(mapped.subclass_hint(), Some(NodeKind::User));
        assert_eq!(mapped.request(), edge.request());
    }

    #[test]
    fn base_endpoint_variants() {
        assert_eq!(base_endpoint("https://adext.com/v1.0/me/friends?after=A"), "/me/friends?after=A");
        assert_eq!(base_endpoint("https://adext.com/me/friends"), "/me/friends");
        assert_eq!(base_endpoint("/v2/me?x=1"), "/me?x=1");
        assert_eq!(base_endpoint("me/videos?offset=50"), "/me/videos?offset=50");
        assert_eq!(base_endpoint("/vanity/feed"), "/vanity/feed");
    }

    #[test]
    fn to_json_puts_data_first() {
        let edge = paged(HttpMethod::Get);
        let json = edge.to_json();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["data", "paging", "summary"]);
        assert_eq!(json["data"][1]["id"], "2");
    }

    #[test]
    fn direction_parsing() {
        assert_eq!("after".parse::<Direction>().unwrap(), Direction::Next);
        assert_eq!("previous".parse::<Direction>().unwrap(), Direction::Previous);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
