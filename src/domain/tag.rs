//! Tag: a user-scoped label applied to tasks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tag owned by a user. `(owner, name)` is unique. Deleting a tag cascades
/// to remove all task-tag links; deleting a user cascades to remove their
/// tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub owner: Uuid,
    pub name: String,
    /// Hex color in `#RRGGBB` form.
    pub color: String,
}

impl Tag {
    /// Validate a `#RRGGBB` hex color string.
    pub fn is_valid_color(color: &str) -> bool {
        let bytes = color.as_bytes();
        bytes.len() == 7 && bytes[0] == b'#' && bytes[1..].iter().all(|b| b.is_ascii_hexdigit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_hex_color() {
        assert!(Tag::is_valid_color("#1A2B3C"));
        assert!(Tag::is_valid_color("#000000"));
    }

    #[test]
    fn rejects_malformed_hex_color() {
        assert!(!Tag::is_valid_color("1A2B3C"));
        assert!(!Tag::is_valid_color("#1A2B3"));
        assert!(!Tag::is_valid_color("#GGGGGG"));
        assert!(!Tag::is_valid_color("red"));
    }
}
