//! Spectree Core
//!
//! Recursive decomposition of a task into a graph of docstrings:
//! - Asks a completion backend for a root docstring
//! - Expands each docstring into children, concurrently
//! - Folds near-duplicates into canonical nodes via a judged comparison
//! - Deepens pass by pass until the stored graph stops changing
//!
//! # Example
//!
//! ```rust,ignore
//! use spectree_core::{DecomposeConfig, Decomposer, LexicalIndex};
//! use spectree_registry::Registry;
//! use std::sync::Arc;
//!
//! # async fn example(backend: Arc<dyn spectree_core::CompletionBackend>) -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::open("/var/lib/spectree").await?;
//! let neighbors = Arc::new(LexicalIndex::new(registry.clone()));
//! let decomposer = Decomposer::new(DecomposeConfig::new(), registry, backend, neighbors)?;
//!
//! let report = decomposer.decompose("reverse a string", 3).await?;
//! println!("{} nodes after {} passes", report.graph.len(), report.passes);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod neighbors;
pub mod prompts;
pub mod resolver;

pub use config::{CompletionOptions, DecomposeConfig};
pub use driver::{DecompositionReport, Decomposer};
pub use engine::{DepthPass, ExpansionEngine};
pub use error::{DecomposeError, DecomposeResult, GatewayError};
pub use gateway::{parse_structured, strip_code_fence, CompletionBackend, CompletionGateway, NeighborIndex};
pub use neighbors::{LexicalIndex, ScoredNeighbor};
pub use resolver::{Resolution, SimilarityResolver, Verdict};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Spectree Core
    pub use crate::{
        CompletionBackend, DecomposeConfig, DecomposeError, Decomposer, DecompositionReport,
        LexicalIndex, NeighborIndex,
    };
    pub use spectree_docstring::{ContentHash, Docstring};
    pub use spectree_registry::{DependencyGraph, Registry};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
