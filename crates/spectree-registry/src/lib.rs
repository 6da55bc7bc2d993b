//! Spectree Registry
//!
//! The on-disk, content-addressed store behind recursive decomposition.
//!
//! # Architecture
//!
//! ```text
//! <root>/docstrings/<hash>.txt               stored text, one node per file
//! <root>/dependencies/<hash>/<child_hash>    empty marker per edge
//! <root>/dependents/<hash>/<parent_hash>     empty marker per edge
//!                  ↑___________↓
//!                    TextCache (content-addressed, in-process)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use spectree_docstring::Docstring;
//! use spectree_registry::Registry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::open("/var/lib/spectree").await?;
//! let parent = registry.put(&Docstring::new("Summarizes a web page.")).await?;
//! let child = registry.put(&Docstring::new("Fetches a URL.")).await?;
//! registry.add_dependency(&parent, &child).await?;
//!
//! let graph = registry.dependency_graph(&parent).await?;
//! assert_eq!(graph.len(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cache;
pub mod error;
pub mod graph;
pub mod layout;
pub mod registry;

pub use cache::{CacheStats, TextCache};
pub use error::{RegistryError, RegistryResult};
pub use graph::DependencyGraph;
pub use layout::RegistryLayout;
pub use registry::{Registry, RegistryConfig};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
