//! The closed set of node subtypes and their per-field subtype maps.
//!
//! A subtype decides two things when a node is cast: the [`NodeKind`] tag the
//! node carries, and which subtype each of its nested fields is cast to.
//!
//! | Subtype | Field map |
//! |---------|-----------|
//! | `Node` | (none) |
//! | `Achievement` | `from` → User, `application` → Application |
//! | `Album` | `from` → User, `place` → Page |
//! | `Application` | (none) |
//! | `CoverPhoto` | (none) |
//! | `Event` | `cover` → CoverPhoto, `place` → Page, `picture` → Picture, `parent_group` → Group |
//! | `Group` | `cover` → CoverPhoto, `venue` → Location |
//! | `Location` | (none) |
//! | `Page` | `best_page` → Page, `global_brand_parent_page` → Page, `location` → Location, `cover` → CoverPhoto, `picture` → Picture |
//! | `Picture` | (none) |
//! | `SessionInfo` | (none) |
//! | `User` | `hometown` → Page, `location` → Page, `significant_other` → User, `picture` → Picture |

use serde::{Deserialize, Serialize};

use crate::error::AdextError;

/// A node subtype. `Node` is the untyped base every other kind refines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    Node,
    Achievement,
    Album,
    Application,
    CoverPhoto,
    Event,
    Group,
    Location,
    Page,
    Picture,
    SessionInfo,
    User,
}

impl NodeKind {
    pub const ALL: [NodeKind; 12] = [
        NodeKind::Node,
        NodeKind::Achievement,
        NodeKind::Album,
        NodeKind::Application,
        NodeKind::CoverPhoto,
        NodeKind::Event,
        NodeKind::Group,
        NodeKind::Location,
        NodeKind::Page,
        NodeKind::Picture,
        NodeKind::SessionInfo,
        NodeKind::User,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Node => "Node",
            NodeKind::Achievement => "Achievement",
            NodeKind::Album => "Album",
            NodeKind::Application => "Application",
            NodeKind::CoverPhoto => "CoverPhoto",
            NodeKind::Event => "Event",
            NodeKind::Group => "Group",
            NodeKind::Location => "Location",
            NodeKind::Page => "Page",
            NodeKind::Picture => "Picture",
            NodeKind::SessionInfo => "SessionInfo",
            NodeKind::User => "User",
        }
    }

    /// The subtype this kind declares for `field`, if any.
    pub fn field_kind(self, field: &str) -> Option<NodeKind> {
        use NodeKind::*;
        let mapped = match (self, field) {
            (Achievement, "from") => User,
            (Achievement, "application") => Application,
            (Album, "from") => User,
            (Album, "place") => Page,
            (Event, "cover") => CoverPhoto,
            (Event, "place") => Page,
            (Event, "picture") => Picture,
            (Event, "parent_group") => Group,
            (Group, "cover") => CoverPhoto,
            (Group, "venue") => Location,
            (Page, "best_page") => Page,
            (Page, "global_brand_parent_page") => Page,
            (Page, "location") => Location,
            (Page, "cover") => CoverPhoto,
            (Page, "picture") => Picture,
            (User, "hometown") => Page,
            (User, "location") => Page,
            (User, "significant_other") => User,
            (User, "picture") => Picture,
            _ => return None,
        };
        Some(mapped)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses a subtype name.
///
/// Matching ignores case, `_` and `-`, an `Adext` prefix, and any leading
/// namespace path (`Adext\AdextNodes\AdextUser`, `nodes::User`). Unknown
/// names fail with [`AdextError::InvalidSubtype`].
impl std::str::FromStr for NodeKind {
    type Err = AdextError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let last = s
            .rsplit(|c| c == '\\' || c == ':' || c == '.')
            .next()
            .unwrap_or(s);
        let mut normalized: String = last
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if normalized.len() > "adext".len() && normalized.starts_with("adext") {
            normalized.replace_range(.."adext".len(), "");
        }
        NodeKind::ALL
            .into_iter()
            .find(|k| k.name().to_ascii_lowercase() == normalized)
            .ok_or_else(|| {
                AdextError::InvalidSubtype(format!(
                    "the given subtype {s:?} is not valid; cannot cast to a type that is not a Node subtype"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_prefixed_and_namespaced_names() {
        assert_eq!("User".parse::<NodeKind>().unwrap(), NodeKind::User);
        assert_eq!("user".parse::<NodeKind>().unwrap(), NodeKind::User);
        assert_eq!("AdextUser".parse::<NodeKind>().unwrap(), NodeKind::User);
        assert_eq!(
            "\\Adext\\AdextNodes\\AdextSessionInfo".parse::<NodeKind>().unwrap(),
            NodeKind::SessionInfo
        );
        assert_eq!("cover_photo".parse::<NodeKind>().unwrap(), NodeKind::CoverPhoto);
        assert_eq!("AdextNode".parse::<NodeKind>().unwrap(), NodeKind::Node);
    }

    #[test]
    fn unknown_name_is_invalid_subtype() {
        let err = "Photo".parse::<NodeKind>().unwrap_err();
        assert!(matches!(err, AdextError::InvalidSubtype(_)));
        assert!("Adext".parse::<NodeKind>().is_err());
        assert!("".parse::<NodeKind>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.to_string().parse::<NodeKind>().unwrap(), kind);
        }
    }

    #[test]
    fn field_maps() {
        assert_eq!(NodeKind::User.field_kind("hometown"), Some(NodeKind::Page));
        assert_eq!(NodeKind::Page.field_kind("location"), Some(NodeKind::Location));
        assert_eq!(NodeKind::User.field_kind("friends"), None);
        assert_eq!(NodeKind::Node.field_kind("from"), None);
    }
}
