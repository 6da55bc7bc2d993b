//! Content hashing for docstring identity
//!
//! Provides [`ContentHash`], the 32-byte Blake3 digest used as a node id
//! in the registry. Its hex form is also the on-disk file and directory
//! name for the node.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content hash (Blake3)
///
/// Computed over the exact bytes of a docstring. Copy, ordered, and cheap to
/// use as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create hash from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| HashError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Compute the Blake3 hash of a docstring's text
    #[inline]
    #[must_use]
    pub fn of_text(text: &str) -> Self {
        Self::new(*blake3::hash(text.as_bytes()).as_bytes())
    }

    /// Short string representation (first 16 hex chars), used in logs
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8; 32]> for ContentHash {
    fn as_ref(&self) -> &[u8; 32] {
        &self.0
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing content hashes
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_slice_rejects_wrong_length() {
        let result = ContentHash::from_slice(&[1u8; 31]);
        assert!(matches!(
            result,
            Err(HashError::InvalidLength { expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn display_and_parse() {
        let hash = ContentHash::of_text("Reverses the characters of a string.");
        let s = hash.to_string();
        assert_eq!(s.len(), 64);
        let parsed: ContentHash = s.parse().unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn short_is_display_prefix() {
        let hash = ContentHash::of_text("test");
        let short = hash.short();
        assert_eq!(short.len(), 16);
        assert!(hash.to_string().starts_with(&short));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("not-hex".parse::<ContentHash>().is_err());
        assert!("abcd".parse::<ContentHash>().is_err());
    }

    #[test]
    fn serde_uses_hex_string() {
        let hash = ContentHash::of_text("test");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
        let decoded: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, decoded);
    }

    #[test]
    fn whitespace_is_significant() {
        assert_ne!(ContentHash::of_text("a"), ContentHash::of_text("a "));
        assert_ne!(ContentHash::of_text("a"), ContentHash::of_text("a\n"));
    }

    proptest! {
        #[test]
        fn hashing_is_deterministic(text in ".*") {
            prop_assert_eq!(ContentHash::of_text(&text), ContentHash::of_text(&text));
        }

        #[test]
        fn distinct_texts_get_distinct_hashes(a in ".*", b in ".*") {
            prop_assert_eq!(a == b, ContentHash::of_text(&a) == ContentHash::of_text(&b));
        }
    }
}
