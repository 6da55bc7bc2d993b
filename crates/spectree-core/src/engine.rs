//! Recursive expansion engine
//!
//! Expands one docstring into children, resolves each child against what
//! is already stored, and recurses concurrently. Each node moves through:
//!
//! ```text
//! visited? ──yes──▶ return id
//!    │ no
//! depth bound? ──yes──▶ return id (leaf)
//!    │ no
//! resolve ──DuplicateOfParent──▶ prune, return none
//!    │    ──DuplicateOfExisting──▶ merge into canonical node
//!    │ Novel
//! persist ─▶ generate children ─▶ expand children concurrently ─▶ link
//! ```
//!
//! The visited set belongs to one [`DepthPass`]; it is never process-wide,
//! so concurrent decompositions do not interfere.

use crate::error::DecomposeResult;
use crate::gateway::CompletionGateway;
use crate::prompts;
use crate::resolver::{Resolution, SimilarityResolver};
use dashmap::DashSet;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use spectree_docstring::{ContentHash, Docstring};
use spectree_registry::Registry;
use std::sync::Arc;

/// Traversal state for one depth pass
#[derive(Debug)]
pub struct DepthPass {
    task: Arc<str>,
    max_depth: usize,
    visited: DashSet<ContentHash>,
}

impl DepthPass {
    /// Fresh pass over `task` bounded at `max_depth`
    pub fn new(task: impl Into<Arc<str>>, max_depth: usize) -> Self {
        Self {
            task: task.into(),
            max_depth,
            visited: DashSet::new(),
        }
    }

    /// The original task text
    #[inline]
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Depth at which nodes stop expanding
    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of distinct nodes entered so far
    #[inline]
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Whether `id` was entered during this pass
    #[inline]
    pub fn has_visited(&self, id: &ContentHash) -> bool {
        self.visited.contains(id)
    }

    /// Mark `id` visited; false if it already was
    fn enter(&self, id: ContentHash) -> bool {
        self.visited.insert(id)
    }
}

/// Expansion engine over a registry, gateway and resolver
#[derive(Debug, Clone)]
pub struct ExpansionEngine {
    registry: Registry,
    gateway: CompletionGateway,
    resolver: SimilarityResolver,
}

impl ExpansionEngine {
    /// Create engine
    pub fn new(registry: Registry, gateway: CompletionGateway, resolver: SimilarityResolver) -> Self {
        Self {
            registry,
            gateway,
            resolver,
        }
    }

    /// Registry the engine writes to
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Expand `docstring` found under `parent` at `depth`
    ///
    /// Returns the id the caller should link to, or `None` when the node
    /// turned out to restate its parent and was pruned.
    ///
    /// # Errors
    /// - `DecomposeError::Registry` on storage failures, including a missing
    ///   edge marker while rewiring
    /// - `DecomposeError::Gateway` or `RepairExhausted` from the backend
    pub fn expand<'a>(
        &'a self,
        pass: &'a DepthPass,
        docstring: Docstring,
        parent: Option<ContentHash>,
        depth: usize,
    ) -> BoxFuture<'a, DecomposeResult<Option<ContentHash>>> {
        async move {
            let id = docstring.id();

            if !pass.enter(id) {
                return Ok(Some(id));
            }
            if depth >= pass.max_depth() {
                return Ok(Some(id));
            }

            match self.resolver.find_duplicate(&docstring, parent).await? {
                Resolution::Novel => {}
                Resolution::DuplicateOfParent => {
                    tracing::info!("Pruning {}: restates its parent", id.short());
                    self.registry.prune_node(&id).await?;
                    return Ok(None);
                }
                Resolution::DuplicateOfExisting(existing) => {
                    let existing_id = existing.id();
                    let stored = self.registry.contains(&existing_id).await?;
                    tracing::info!("Merging {} into {}", id.short(), existing_id.short());
                    self.registry.merge_node(&id, &existing_id).await?;

                    if stored {
                        return Ok(Some(existing_id));
                    }
                    return self.expand(pass, existing, parent, depth).await;
                }
            }

            self.registry.put(&docstring).await?;
            if let Some(parent) = parent {
                self.registry.add_dependent(&id, &parent).await?;
            }

            tracing::info!("Generating child docstrings for {}", id.short());
            let prompt = prompts::children(pass.task(), docstring.text());
            let children: Vec<String> = self.gateway.generate_structured(&prompt).await?;

            let expansions = children
                .into_iter()
                .map(Docstring::new)
                .filter(|child| !child.is_blank())
                .map(|child| self.expand(pass, child, Some(id), depth + 1));
            let child_ids = try_join_all(expansions).await?;

            for child in child_ids.into_iter().flatten() {
                if child == id {
                    continue;
                }
                self.registry.add_dependency(&id, &child).await?;
            }

            Ok(Some(id))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockCompletionBackend, MockNeighborIndex};
    use tempfile::TempDir;

    async fn engine(backend: MockCompletionBackend) -> (TempDir, ExpansionEngine) {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).await.unwrap();
        let mut neighbors = MockNeighborIndex::new();
        neighbors.expect_nearest().returning(|_, _| Ok(Vec::new()));

        let gateway = CompletionGateway::new(Arc::new(backend));
        let resolver = SimilarityResolver::new(Arc::new(neighbors), gateway.clone(), 5);
        (dir, ExpansionEngine::new(registry, gateway, resolver))
    }

    #[tokio::test]
    async fn depth_zero_touches_nothing() {
        let mut backend = MockCompletionBackend::new();
        backend.expect_complete().never();
        let (_dir, engine) = engine(backend).await;

        let root = Docstring::new("Reverses a string.");
        let pass = DepthPass::new("reverse a string", 0);
        let id = engine.expand(&pass, root.clone(), None, 0).await.unwrap();

        assert_eq!(id, Some(root.id()));
        assert!(engine.registry().ids().await.unwrap().is_empty());
        assert!(pass.has_visited(&root.id()));
    }

    #[tokio::test]
    async fn revisits_return_immediately() {
        let mut backend = MockCompletionBackend::new();
        backend.expect_complete().never();
        let (_dir, engine) = engine(backend).await;

        let root = Docstring::new("Reverses a string.");
        let pass = DepthPass::new("reverse a string", 3);
        pass.enter(root.id());

        let id = engine.expand(&pass, root.clone(), None, 0).await.unwrap();
        assert_eq!(id, Some(root.id()));
        assert!(!engine.registry().contains(&root.id()).await.unwrap());
    }

    #[tokio::test]
    async fn children_are_linked_and_blank_ones_skipped() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .times(1)
            .returning(|_, _| Ok(r#"["Splits text.", "   ", "Joins text."]"#.to_string()));
        let (_dir, engine) = engine(backend).await;

        let root = Docstring::new("Reverses words.");
        let pass = DepthPass::new("reverse words", 1);
        engine.expand(&pass, root.clone(), None, 0).await.unwrap();

        let registry = engine.registry();
        let children = registry.dependencies(&root.id()).await.unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.contains(&ContentHash::of_text("Splits text.")));
        assert!(children.contains(&ContentHash::of_text("Joins text.")));
        assert_eq!(pass.visited_count(), 3);
    }

    #[tokio::test]
    async fn child_equal_to_itself_is_not_linked() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .times(1)
            .returning(|_, _| Ok(r#"["Reverses words."]"#.to_string()));
        let (_dir, engine) = engine(backend).await;

        let root = Docstring::new("Reverses words.");
        let pass = DepthPass::new("reverse words", 2);
        engine.expand(&pass, root.clone(), None, 0).await.unwrap();

        assert!(engine.registry().dependencies(&root.id()).await.unwrap().is_empty());
    }
}
