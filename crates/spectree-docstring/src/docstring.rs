//! Docstring text units
//!
//! A [`Docstring`] is an immutable natural-language specification of one
//! function. Its identity is derived from its content, never assigned.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Immutable docstring text with a precomputed content hash
///
/// Cloning shares the underlying text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Docstring {
    text: Arc<str>,
    id: ContentHash,
}

impl Docstring {
    /// Create a docstring, hashing its exact bytes
    #[must_use]
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let id = ContentHash::of_text(&text);
        Self { text, id }
    }

    /// Content-derived node id
    #[inline]
    #[must_use]
    pub fn id(&self) -> ContentHash {
        self.id
    }

    /// The docstring text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the text is empty or whitespace only
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl Display for Docstring {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<String> for Docstring {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for Docstring {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl AsRef<str> for Docstring {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl Serialize for Docstring {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Docstring {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_id() {
        let a = Docstring::new("Returns the current date.");
        let b = Docstring::from("Returns the current date.".to_string());
        assert_eq!(a.id(), b.id());
        assert_eq!(a, b);
    }

    #[test]
    fn near_duplicates_are_distinct() {
        let a = Docstring::new("Returns the current date.");
        let b = Docstring::new("Returns the current date");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn blank_detection() {
        assert!(Docstring::new("  \n\t").is_blank());
        assert!(!Docstring::new(" x ").is_blank());
    }

    #[test]
    fn deserializes_from_json_string_array() {
        let children: Vec<Docstring> =
            serde_json::from_str(r#"["first", "second\nline"]"#).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].text(), "second\nline");
        assert_eq!(children[0].id(), ContentHash::of_text("first"));
    }
}
