//! Ordered, case-insensitive header mapping used on both sides of a call.

use indexmap::IndexMap;

/// HTTP headers in insertion order.
///
/// Lookups ignore ASCII case; inserting a name that already exists (in any
/// case) replaces the old entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(IndexMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if let Some(existing) = self.find_key(&name) {
            self.0.shift_remove(&existing);
        }
        self.0.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Overlay `other` on top of `self`; entries in `other` win.
    pub fn merge(&mut self, other: &Headers) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Header pairs safe to log: credential-like values are replaced.
    pub fn redacted(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(k, v)| {
                let shown = if is_sensitive_header_name(k) { "<redacted>" } else { v };
                (k.to_string(), shown.to_string())
            })
            .collect()
    }

    fn find_key(&self, name: &str) -> Option<String> {
        self.0.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

fn is_sensitive_header_name(name: &str) -> bool {
    let n = name.to_ascii_lowercase();
    matches!(n.as_str(), "authorization" | "proxy-authorization" | "cookie" | "set-cookie")
        || n.contains("token")
        || n.contains("secret")
        || n.contains("api-key")
        || n.ends_with("-key")
}
