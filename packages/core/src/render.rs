//! Human-readable text rendering of [`Node`]s and [`Edge`]s.
//!
//! The output is stable plain text for terminals and logs. It is not a wire
//! format; use the `Serialize` impls when JSON is needed.

use serde_json::Value;

use crate::edge::Edge;
use crate::node::{Field, Node};

/// Render a node with one field per line, nesting indented by two spaces.
///
/// ```text
/// [User] 1
///   name: "Ann"
///   hometown: [Page] 2
///     name: "Springfield"
///   friends: edge, 1 item  endpoint: /1/friends
///     - [Node] 4
/// ```
pub fn render_node(node: &Node) -> String {
    let mut out = String::new();
    push_node(&mut out, node, 0);
    out
}

/// Render an edge: a summary line, paging info, then every member.
///
/// ```text
/// Edge  2 items (Page)  total: 42
/// ──────────────────────────────
/// next cursor: QVFI...  next page: yes  previous page: no
///
/// - [Page] 1
///     name: "Ann"
/// - [Page] 2
/// ```
pub fn render_edge(edge: &Edge) -> String {
    let header = format!("Edge  {}{}", edge_summary(edge), total_suffix(edge));
    let rule = "─".repeat(header.chars().count());
    let mut out = format!("{header}\n{rule}\n");

    let paging = edge.metadata().get("paging");
    let has = |key: &str| paging.and_then(|p| p.get(key)).is_some();
    let mut line = Vec::new();
    if let Some(c) = edge.next_cursor() {
        line.push(format!("next cursor: {}", truncate(c, 24)));
    }
    if let Some(c) = edge.previous_cursor() {
        line.push(format!("previous cursor: {}", truncate(c, 24)));
    }
    line.push(format!("next page: {}", yes_no(has("next"))));
    line.push(format!("previous page: {}", yes_no(has("previous"))));
    out.push_str(&line.join("  "));
    out.push('\n');

    if !edge.is_empty() {
        out.push('\n');
    }
    for member in edge {
        out.push_str("- ");
        push_node(&mut out, member, 1);
    }
    out
}

// --- helpers -----------------------------------------------------------------

fn push_node(out: &mut String, node: &Node, depth: usize) {
    out.push_str(&format!("[{}]", node.kind()));
    if let Some(id) = node.id() {
        out.push_str(&format!(" {id}"));
    }
    out.push('\n');

    let pad = "  ".repeat(depth + 1);
    for (key, field) in node.iter() {
        if key == "id" {
            continue;
        }
        out.push_str(&pad);
        out.push_str(key);
        out.push_str(": ");
        match field {
            Field::Scalar(v) => {
                out.push_str(&scalar_text(v));
                out.push('\n');
            }
            Field::Timestamp(t) => {
                out.push_str(&t.to_rfc3339());
                out.push('\n');
            }
            Field::Node(n) => push_node(out, n, depth + 1),
            Field::Edge(e) => {
                out.push_str(&format!("edge, {}", edge_summary(e)));
                if let Some(endpoint) = e.parent_edge_endpoint() {
                    out.push_str(&format!("  endpoint: {endpoint}"));
                }
                out.push('\n');
                for member in e {
                    out.push_str(&pad);
                    out.push_str("  - ");
                    push_node(out, member, depth + 2);
                }
            }
        }
    }
}

fn edge_summary(edge: &Edge) -> String {
    let n = edge.len();
    let kind = edge
        .subclass_hint()
        .map(|k| format!(" ({k})"))
        .unwrap_or_default();
    format!("{n} item{}{kind}", if n == 1 { "" } else { "s" })
}

fn total_suffix(edge: &Edge) -> String {
    edge.total_count()
        .map(|t| format!("  total: {t}"))
        .unwrap_or_default()
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => format!("\"{}\"", truncate(s, 72)),
        other => other.to_string(),
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

fn truncate(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::NodeFactory;
    use crate::kind::NodeKind;
    use crate::request::{HttpMethod, SignedRequest};
    use serde_json::json;
    use std::sync::Arc;

    fn request() -> Arc<SignedRequest> {
        Arc::new(
            SignedRequest::builder()
                .method(HttpMethod::Get)
                .endpoint("/me")
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn node_rendering_nests_fields() {
        let decoded = json!({
            "id": "1",
            "name": "Ann",
            "hometown": {"id": "2", "name": "Springfield"},
            "friends": {"data": [{"id": "4"}]}
        });
        let decoded = decoded.as_object().unwrap();
        let user = NodeFactory::new(decoded, request())
            .make_node(Some(NodeKind::User))
            .unwrap();
        let text = render_node(&user);
        assert_eq!(
            text,
            "[User] 1\n  name: \"Ann\"\n  hometown: [Page] 2\n    name: \"Springfield\"\n  friends: edge, 1 item  endpoint: /1/friends\n    - [Node] 4\n"
        );
    }

    #[test]
    fn edge_rendering_has_header_and_paging() {
        let decoded = json!({
            "data": [{"id": "1"}, {"id": "2"}],
            "paging": {"cursors": {"after": "X"}, "next": "https://adext.com/v1.0/me/x?after=X"},
            "summary": {"total_count": 42}
        });
        let decoded = decoded.as_object().unwrap();
        let edge = NodeFactory::new(decoded, request()).make_edge(None).unwrap();
        let text = render_edge(&edge);
        assert!(text.starts_with("Edge  2 items  total: 42\n"));
        assert!(text.contains("next cursor: X  next page: yes  previous page: no\n"));
        assert!(text.contains("- [Node] 1\n- [Node] 2\n"));
    }

    #[test]
    fn truncates_long_strings() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
