//! The casting engine: decoded JSON in, typed [`Node`]s and [`Edge`]s out.
//!
//! The wire format carries no discriminator, so a single predicate,
//! [`is_edge_shaped`], decides at every level whether a `data` member is a
//! list of nodes or a node wrapped once more:
//!
//! 1. A mapping with a non-null `data` member whose value is edge-shaped
//!    becomes an [`Edge`]; every other key becomes edge metadata.
//! 2. A mapping whose `data` is a non-edge-shaped mapping is unwrapped and its
//!    contents become the node body.
//! 3. Anything else becomes a [`Node`]. Nested mappings (and lists) recurse
//!    with the subtype from the parent kind's field map, or untyped when the
//!    map has no entry; scalars pass through, date fields become timestamps.
//!
//! An edge reached as field `f` of a node with id `p` records `/p/f` as its
//! parent endpoint.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::edge::Edge;
use crate::error::AdextError;
use crate::kind::NodeKind;
use crate::node::{Field, Node, NodeOrEdge};
use crate::request::SignedRequest;
use crate::response::RawResponse;

/// True for lists, for the empty mapping, and for mappings whose keys are
/// exactly `"0"`, `"1"`, ... `"n-1"` in that order.
///
/// The empty mapping is ambiguous: an empty node and an empty edge look the
/// same on the wire. [`NodeFactory::make_node`] and
/// [`NodeFactory::make_edge`] let the caller say which was meant.
pub fn is_edge_shaped(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(map) => map
            .keys()
            .enumerate()
            .all(|(i, k)| *k == i.to_string()),
        _ => false,
    }
}

/// Builds nodes and edges from one decoded body.
///
/// Every edge produced keeps a handle on `request`, the request whose
/// response is being cast, so it can page later.
pub struct NodeFactory<'a> {
    decoded: &'a Map<String, Value>,
    request: Arc<SignedRequest>,
}

impl<'a> NodeFactory<'a> {
    pub fn new(decoded: &'a Map<String, Value>, request: Arc<SignedRequest>) -> Self {
        Self { decoded, request }
    }

    pub fn from_response(response: &'a RawResponse) -> Self {
        Self::new(response.decoded_body(), response.request_handle())
    }

    /// Cast the body to whichever of node or edge its shape says.
    pub fn classify(&self, hint: Option<NodeKind>) -> Result<NodeOrEdge, AdextError> {
        self.cast_as_node_or_edge(self.decoded, hint, None, None)
    }

    /// Cast the body as a node. Fails with [`AdextError::WrongShape`] when its
    /// `data` member is edge-shaped.
    pub fn make_node(&self, hint: Option<NodeKind>) -> Result<Node, AdextError> {
        if data_member(self.decoded).is_some_and(is_edge_shaped) {
            return Err(AdextError::WrongShape(
                "the response looks like an edge; use make_edge instead".into(),
            ));
        }
        match self.classify(hint)? {
            NodeOrEdge::Node(node) => Ok(node),
            NodeOrEdge::Edge(_) => Err(AdextError::WrongShape(
                "the response was cast to an edge".into(),
            )),
        }
    }

    /// Cast the body as an edge. Fails with [`AdextError::WrongShape`] unless
    /// it has an edge-shaped `data` member.
    pub fn make_edge(&self, hint: Option<NodeKind>) -> Result<Edge, AdextError> {
        if !data_member(self.decoded).is_some_and(is_edge_shaped) {
            return Err(AdextError::WrongShape(
                "the response does not look like an edge; use make_node instead".into(),
            ));
        }
        match self.classify(hint)? {
            NodeOrEdge::Edge(edge) => Ok(edge),
            NodeOrEdge::Node(_) => Err(AdextError::WrongShape(
                "the response was cast to a node".into(),
            )),
        }
    }

    pub fn make_achievement(&self) -> Result<Node, AdextError> {
        self.make_node(Some(NodeKind::Achievement))
    }

    pub fn make_album(&self) -> Result<Node, AdextError> {
        self.make_node(Some(NodeKind::Album))
    }

    pub fn make_event(&self) -> Result<Node, AdextError> {
        self.make_node(Some(NodeKind::Event))
    }

    pub fn make_group(&self) -> Result<Node, AdextError> {
        self.make_node(Some(NodeKind::Group))
    }

    pub fn make_page(&self) -> Result<Node, AdextError> {
        self.make_node(Some(NodeKind::Page))
    }

    pub fn make_session_info(&self) -> Result<Node, AdextError> {
        self.make_node(Some(NodeKind::SessionInfo))
    }

    pub fn make_user(&self) -> Result<Node, AdextError> {
        self.make_node(Some(NodeKind::User))
    }

    // ---- recursion ----

    fn cast_as_node_or_edge(
        &self,
        data: &Map<String, Value>,
        hint: Option<NodeKind>,
        parent_key: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<NodeOrEdge, AdextError> {
        match data_member(data) {
            Some(inner) if is_edge_shaped(inner) => self
                .make_edge_from(data, inner, hint, parent_key, parent_id)
                .map(NodeOrEdge::Edge),
            Some(Value::Object(inner)) => self.make_node_from(inner, hint).map(NodeOrEdge::Node),
            _ => self.make_node_from(data, hint).map(NodeOrEdge::Node),
        }
    }

    fn make_node_from(
        &self,
        data: &Map<String, Value>,
        hint: Option<NodeKind>,
    ) -> Result<Node, AdextError> {
        let kind = hint.unwrap_or_default();
        let parent_id = data.get("id").and_then(id_text);

        let mut fields = IndexMap::with_capacity(data.len());
        for (key, value) in data {
            let field = match as_mapping(value) {
                Some(nested) => {
                    self.cast_as_node_or_edge(
                        &nested,
                        kind.field_kind(key),
                        Some(key.as_str()),
                        parent_id.as_deref(),
                    )?
                    .into()
                }
                None => Field::from_scalar(key, value),
            };
            fields.insert(key.clone(), field);
        }
        Ok(Node::new(kind, fields))
    }

    fn make_edge_from(
        &self,
        data: &Map<String, Value>,
        list: &Value,
        hint: Option<NodeKind>,
        parent_key: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Edge, AdextError> {
        let members: Vec<&Value> = match list {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => map.values().collect(),
            _ => Vec::new(),
        };

        let mut items = Vec::with_capacity(members.len());
        for (i, member) in members.into_iter().enumerate() {
            let Some(body) = as_mapping(member) else {
                return Err(AdextError::ShapeMismatch(format!(
                    "edge member {i} is not a mapping"
                )));
            };
            items.push(self.make_node_from(&body, hint)?);
        }

        let metadata: Map<String, Value> = data
            .iter()
            .filter(|(k, _)| k.as_str() != "data")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let parent_edge_endpoint = match (parent_id, parent_key) {
            (Some(id), Some(key)) if !id.is_empty() && !key.is_empty() => {
                Some(format!("/{id}/{key}"))
            }
            _ => None,
        };

        Ok(Edge::new(
            Arc::clone(&self.request),
            items,
            metadata,
            parent_edge_endpoint,
            hint,
        ))
    }
}

/// Classify an arbitrary JSON value. Objects and lists are accepted (a list
/// is read as an index-keyed mapping); anything else fails with
/// [`AdextError::ShapeMismatch`].
pub fn classify_value(
    value: &Value,
    hint: Option<NodeKind>,
    request: Arc<SignedRequest>,
) -> Result<NodeOrEdge, AdextError> {
    let Some(body) = as_mapping(value) else {
        return Err(AdextError::ShapeMismatch(
            "unable to get the response as a mapping".into(),
        ));
    };
    NodeFactory::new(&body, request).classify(hint)
}

/// `data`, unless absent or `null`.
fn data_member(map: &Map<String, Value>) -> Option<&Value> {
    map.get("data").filter(|v| !v.is_null())
}

/// Objects as-is, lists as `"0".."n-1"` keyed mappings, scalars `None`.
fn as_mapping(value: &Value) -> Option<std::borrow::Cow<'_, Map<String, Value>>> {
    use std::borrow::Cow;
    match value {
        Value::Object(map) => Some(Cow::Borrowed(map)),
        Value::Array(items) => Some(Cow::Owned(index_keyed(items))),
        _ => None,
    }
}

pub(crate) fn index_keyed(items: &[Value]) -> Map<String, Value> {
    items
        .iter()
        .enumerate()
        .map(|(i, v)| (i.to_string(), v.clone()))
        .collect()
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::HttpMethod;
    use serde_json::json;

    fn request() -> Arc<SignedRequest> {
        Arc::new(
            SignedRequest::builder()
                .access_token("foo_token")
                .method(HttpMethod::Get)
                .endpoint("/me")
                .build()
                .unwrap(),
        )
    }

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn keyed_by(keys: impl IntoIterator<Item = usize>) -> Value {
        Value::Object(
            keys.into_iter()
                .map(|k| (k.to_string(), json!({"id": k.to_string()})))
                .collect(),
        )
    }

    #[test]
    fn sequential_index_keys_are_edge_shaped() {
        for n in 0..=12usize {
            let list = Value::Array((0..n).map(|i| json!({"id": i.to_string()})).collect());
            assert!(is_edge_shaped(&list), "list of {n}");
            assert!(is_edge_shaped(&keyed_by(0..n)), "keys 0..{n}");

            // Same key set, out of order.
            if n >= 2 {
                assert!(!is_edge_shaped(&keyed_by((0..n).rev())), "reversed 0..{n}");
            }
            // Shifted by one, so `0` is missing.
            if n >= 1 {
                assert!(!is_edge_shaped(&keyed_by(1..=n)), "keys 1..={n}");
            }
        }
    }

    #[test]
    fn other_key_sets_are_not_edge_shaped() {
        assert!(!is_edge_shaped(&json!({"1": "a"})));
        assert!(!is_edge_shaped(&json!({"0": "a", "2": "b"})));
        assert!(!is_edge_shaped(&json!({"1": "a", "0": "b"})));
        assert!(!is_edge_shaped(&json!({"00": "a"})));
        assert!(!is_edge_shaped(&json!({"id": "1"})));
        assert!(!is_edge_shaped(&json!("0")));
        assert!(!is_edge_shaped(&Value::Null));
    }

    #[test]
    fn data_list_becomes_edge_with_cursor() {
        let decoded = body(json!({
            "data": [{"id": "1"}, {"id": "2"}],
            "paging": {"cursors": {"after": "X"}}
        }));
        let edge = NodeFactory::new(&decoded, request()).make_edge(None).unwrap();
        assert_eq!(edge.len(), 2);
        assert_eq!(edge.get(0).and_then(Node::id).as_deref(), Some("1"));
        assert_eq!(edge.get(1).and_then(Node::id).as_deref(), Some("2"));
        assert_eq!(edge.next_cursor(), Some("X"));
        assert!(edge.metadata().contains_key("paging"));
        assert!(!edge.metadata().contains_key("data"));
        assert_eq!(edge.parent_edge_endpoint(), None);
    }

    #[test]
    fn nested_edge_records_parent_endpoint() {
        let decoded = body(json!({"id": "1", "name": "Ann", "friends": {"data": [{"id": "2"}]}}));
        let node = NodeFactory::new(&decoded, request()).make_node(None).unwrap();
        assert_eq!(node.keys().collect::<Vec<_>>(), ["id", "name", "friends"]);
        let friends = node.get_edge("friends").unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends.parent_edge_endpoint(), Some("/1/friends"));
        assert_eq!(friends.request().endpoint(), "/me");
    }

    #[test]
    fn nested_edge_without_parent_id_has_no_endpoint() {
        let decoded = body(json!({"name": "Ann", "friends": {"data": []}}));
        let node = NodeFactory::new(&decoded, request()).make_node(None).unwrap();
        let friends = node.get_edge("friends").unwrap();
        assert!(friends.is_empty());
        assert_eq!(friends.parent_edge_endpoint(), None);
    }

    #[test]
    fn numeric_parent_id_is_formatted() {
        let decoded = body(json!({"id": 7, "photos": {"data": [{"id": 8}]}}));
        let node = NodeFactory::new(&decoded, request()).make_node(None).unwrap();
        assert_eq!(node.get_edge("photos").unwrap().parent_edge_endpoint(), Some("/7/photos"));
    }

    #[test]
    fn make_node_rejects_edge_shaped_data() {
        let decoded = body(json!({"data": [{"id": "1"}]}));
        let err = NodeFactory::new(&decoded, request()).make_node(None).unwrap_err();
        assert!(matches!(err, AdextError::WrongShape(_)));

        let decoded = body(json!({"data": {}}));
        let err = NodeFactory::new(&decoded, request()).make_node(None).unwrap_err();
        assert!(matches!(err, AdextError::WrongShape(_)));
    }

    #[test]
    fn make_edge_rejects_bodies_without_list_data() {
        for decoded in [
            body(json!({"id": "1"})),
            body(json!({"data": {"id": "1"}})),
            body(json!({"data": null})),
            body(json!({})),
        ] {
            let err = NodeFactory::new(&decoded, request()).make_edge(None).unwrap_err();
            assert!(matches!(err, AdextError::WrongShape(_)));
        }
    }

    #[test]
    fn empty_body_is_an_empty_node_when_asked_for_one() {
        let decoded = Map::new();
        let node = NodeFactory::new(&decoded, request()).make_node(None).unwrap();
        assert!(node.is_empty());
    }

    #[test]
    fn single_node_under_data_is_unwrapped() {
        let decoded = body(json!({"data": {"id": "9", "name": "Wrapped"}}));
        let node = NodeFactory::new(&decoded, request()).make_user().unwrap();
        assert_eq!(node.kind(), NodeKind::User);
        assert_eq!(node.id().as_deref(), Some("9"));
        assert!(!node.contains_key("data"));
    }

    #[test]
    fn scalar_data_stays_a_field() {
        let decoded = body(json!({"data": "plain", "id": "1"}));
        let node = NodeFactory::new(&decoded, request()).make_node(None).unwrap();
        assert_eq!(node.get_str("data"), Some("plain"));
    }

    #[test]
    fn hint_types_edge_members_and_is_kept() {
        let decoded = body(json!({"data": [{"id": "1"}]}));
        let edge = NodeFactory::new(&decoded, request())
            .make_edge(Some(NodeKind::Page))
            .unwrap();
        assert_eq!(edge.subclass_hint(), Some(NodeKind::Page));
        assert!(edge.iter().all(|n| n.kind() == NodeKind::Page));
    }

    #[test]
    fn only_the_field_map_types_children() {
        let decoded = body(json!({
            "id": "1",
            "hometown": {"id": "2", "name": "Springfield"},
            "significant_other": {"id": "3"},
            "friends": {"data": [{"id": "4"}]},
            "misc": {"a": 1}
        }));
        let user = NodeFactory::new(&decoded, request()).make_user().unwrap();
        assert_eq!(user.get_node("hometown").unwrap().kind(), NodeKind::Page);
        assert_eq!(user.get_node("significant_other").unwrap().kind(), NodeKind::User);
        let friends = user.get_edge("friends").unwrap();
        assert_eq!(friends.subclass_hint(), None);
        assert_eq!(friends.get(0).unwrap().kind(), NodeKind::Node);
        assert_eq!(user.get_node("misc").unwrap().kind(), NodeKind::Node);
    }

    #[test]
    fn unmapped_edge_under_typed_node_keeps_members_untyped() {
        let decoded = body(json!({
            "id": "1",
            "photos": {"data": [{"id": "9", "album": {"id": "5"}}]}
        }));
        let user = NodeFactory::new(&decoded, request()).make_user().unwrap();
        let photos = user.get_edge("photos").unwrap();
        assert_eq!(photos.subclass_hint(), None);
        let photo = photos.get(0).unwrap();
        assert_eq!(photo.kind(), NodeKind::Node);
        assert_eq!(photo.get_node("album").unwrap().kind(), NodeKind::Node);
        assert_eq!(photos.parent_edge_endpoint(), Some("/1/photos"));
    }

    #[test]
    fn untyped_children_stay_base_nodes() {
        let decoded = body(json!({"id": "1", "from": {"id": "2"}}));
        let node = NodeFactory::new(&decoded, request()).make_node(None).unwrap();
        assert_eq!(node.get_node("from").unwrap().kind(), NodeKind::Node);

        let album = NodeFactory::new(&decoded, request()).make_album().unwrap();
        assert_eq!(album.get_node("from").unwrap().kind(), NodeKind::User);
    }

    #[test]
    fn deep_nesting_threads_parent_ids() {
        let decoded = body(json!({
            "data": [{
                "id": "10",
                "comments": {
                    "data": [{"id": "11", "likes": {"data": [{"id": "12"}]}}],
                    "summary": {"total_count": 1}
                }
            }]
        }));
        let edge = NodeFactory::new(&decoded, request()).make_edge(None).unwrap();
        let comments = edge.get(0).unwrap().get_edge("comments").unwrap();
        assert_eq!(comments.parent_edge_endpoint(), Some("/10/comments"));
        assert_eq!(comments.total_count(), Some(1));
        let likes = comments.get(0).unwrap().get_edge("likes").unwrap();
        assert_eq!(likes.parent_edge_endpoint(), Some("/11/likes"));
    }

    #[test]
    fn nested_lists_without_data_become_index_keyed_nodes() {
        let decoded = body(json!({"id": "1", "tags": ["a", "b"]}));
        let node = NodeFactory::new(&decoded, request()).make_node(None).unwrap();
        let tags = node.get_node("tags").unwrap();
        assert_eq!(tags.get_str("0"), Some("a"));
        assert_eq!(tags.get_str("1"), Some("b"));
    }

    #[test]
    fn dates_inside_nodes_are_cast() {
        let decoded = body(json!({"id": "1", "created_time": "2016-01-01T00:00:00+0000"}));
        let node = NodeFactory::new(&decoded, request()).make_node(None).unwrap();
        assert_eq!(node.get_timestamp("created_time").unwrap().timestamp(), 1_451_606_400);
    }

    #[test]
    fn scalar_edge_member_is_a_shape_mismatch() {
        let decoded = body(json!({"data": ["a"]}));
        let err = NodeFactory::new(&decoded, request()).make_edge(None).unwrap_err();
        assert!(matches!(err, AdextError::ShapeMismatch(_)));
    }

    #[test]
    fn index_keyed_object_data_is_an_edge() {
        let decoded = body(json!({"data": {"0": {"id": "a"}, "1": {"id": "b"}}}));
        let edge = NodeFactory::new(&decoded, request()).make_edge(None).unwrap();
        assert_eq!(edge.len(), 2);
    }

    #[test]
    fn classify_value_rejects_scalars() {
        assert!(matches!(
            classify_value(&json!("x"), None, request()),
            Err(AdextError::ShapeMismatch(_))
        ));
        let classified = classify_value(&json!({"data": []}), None, request()).unwrap();
        assert!(classified.is_edge());
        let classified = classify_value(&json!([{"id": "1"}]), None, request()).unwrap();
        assert_eq!(classified.as_node().unwrap().get_node("0").unwrap().id().as_deref(), Some("1"));
    }
}
