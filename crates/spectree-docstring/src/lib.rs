//! Spectree Docstring
//!
//! Content-addressed text units for the decomposition registry.
//!
//! # Core Concepts
//!
//! - [`Docstring`]: immutable specification text, the payload of a graph node
//! - [`ContentHash`]: 32-byte Blake3 hash of the exact text bytes, the node id
//!
//! # Example
//!
//! ```rust
//! use spectree_docstring::{ContentHash, Docstring};
//!
//! let doc = Docstring::new("Reverses the characters of a string.");
//! assert_eq!(doc.id(), ContentHash::of_text(doc.text()));
//! assert_eq!(doc.id().short().len(), 16);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod docstring;
mod hash;

pub use docstring::Docstring;
pub use hash::{ContentHash, HashError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
