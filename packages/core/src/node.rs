//! Typed entities produced by the casting engine.
//!
//! A [`Node`] is an ordered field mapping tagged with its [`NodeKind`]. Each
//! [`Field`] is a primitive, a timestamp, a nested node, or a nested
//! [`Edge`]. Nodes are built once by the factory and never mutated.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::edge::Edge;
use crate::kind::NodeKind;

/// Field names whose values are cast to timestamps when they parse as one.
pub const DATE_FIELDS: [&str; 9] = [
    "created_time",
    "updated_time",
    "start_time",
    "stop_time",
    "end_time",
    "backdated_time",
    "issued_at",
    "expires_at",
    "publish_time",
];

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// One value inside a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// `null`, boolean, number or string, exactly as decoded.
    Scalar(Value),
    Timestamp(DateTime<FixedOffset>),
    Node(Node),
    Edge(Edge),
}

impl Field {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Scalar(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Field::Scalar(v) => v.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Scalar(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Field::Scalar(v) => v.as_bool(),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Field::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Field::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Field::Edge(e) => Some(e),
            _ => None,
        }
    }

    /// Back to plain JSON; timestamps become RFC 3339 strings.
    pub fn to_json(&self) -> Value {
        match self {
            Field::Scalar(v) => v.clone(),
            Field::Timestamp(t) => Value::String(t.to_rfc3339()),
            Field::Node(n) => n.to_json(),
            Field::Edge(e) => e.to_json(),
        }
    }

    /// Cast a scalar found under `key`: date fields become timestamps when
    /// they parse, everything else passes through.
    pub(crate) fn from_scalar(key: &str, value: &Value) -> Field {
        if DATE_FIELDS.contains(&key) {
            if let Some(t) = parse_timestamp(value) {
                return Field::Timestamp(t);
            }
        }
        Field::Scalar(value.clone())
    }
}

impl From<NodeOrEdge> for Field {
    fn from(v: NodeOrEdge) -> Self {
        match v {
            NodeOrEdge::Node(n) => Field::Node(n),
            NodeOrEdge::Edge(e) => Field::Edge(e),
        }
    }
}

/// ISO-8601 date-times (with `+00:00` or `+0000` offsets), bare dates, and
/// integer unix times.
fn parse_timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
            .ok()
            .or_else(|| {
                let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
                let midnight = date.and_hms_opt(0, 0, 0)?;
                Some(Utc.from_utc_datetime(&midnight).fixed_offset())
            }),
        Value::Number(n) => {
            let secs = n.as_i64()?;
            Some(DateTime::<Utc>::from_timestamp(secs, 0)?.fixed_offset())
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A single entity: ordered fields plus the subtype it was cast to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    kind: NodeKind,
    fields: IndexMap<String, Field>,
}

impl Node {
    pub fn new(kind: NodeKind, fields: IndexMap<String, Field>) -> Self {
        Self { kind, fields }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// The `id` field as text; numeric ids are formatted.
    pub fn id(&self) -> Option<String> {
        match self.fields.get("id")? {
            Field::Scalar(Value::String(s)) => Some(s.clone()),
            Field::Scalar(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Field::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Field::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Field::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Field::as_bool)
    }

    pub fn get_timestamp(&self, key: &str) -> Option<DateTime<FixedOffset>> {
        self.get(key).and_then(Field::as_timestamp)
    }

    pub fn get_node(&self, key: &str) -> Option<&Node> {
        self.get(key).and_then(Field::as_node)
    }

    pub fn get_edge(&self, key: &str) -> Option<&Edge> {
        self.get(key).and_then(Field::as_edge)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// NodeOrEdge
// ---------------------------------------------------------------------------

/// The result of classifying a document.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOrEdge {
    Node(Node),
    Edge(Edge),
}

impl NodeOrEdge {
    pub fn is_edge(&self) -> bool {
        matches!(self, NodeOrEdge::Edge(_))
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            NodeOrEdge::Node(n) => Some(n),
            NodeOrEdge::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            NodeOrEdge::Edge(e) => Some(e),
            NodeOrEdge::Node(_) => None,
        }
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            NodeOrEdge::Node(n) => Some(n),
            NodeOrEdge::Edge(_) => None,
        }
    }

    pub fn into_edge(self) -> Option<Edge> {
        match self {
            NodeOrEdge::Edge(e) => Some(e),
            NodeOrEdge::Node(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            NodeOrEdge::Node(n) => n.to_json(),
            NodeOrEdge::Edge(e) => e.to_json(),
        }
    }
}

impl Serialize for NodeOrEdge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
