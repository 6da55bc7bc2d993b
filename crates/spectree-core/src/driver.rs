//! Iterative deepening driver
//!
//! Obtains the root docstring once, then re-expands it with depth bounds
//! 0, 1, 2, ... up to the configured maximum. After each pass the graph
//! reachable from the root is materialized; two equal consecutive graphs
//! mean the decomposition has converged.

use crate::config::DecomposeConfig;
use crate::engine::{DepthPass, ExpansionEngine};
use crate::error::{DecomposeError, DecomposeResult};
use crate::gateway::{CompletionBackend, CompletionGateway, NeighborIndex};
use crate::prompts;
use crate::resolver::SimilarityResolver;
use serde::Serialize;
use spectree_docstring::{ContentHash, Docstring};
use spectree_registry::{DependencyGraph, Registry};
use std::sync::Arc;
use tracing::Instrument;
use ulid::Ulid;

/// Result of one decomposition
#[derive(Debug, Clone, Serialize)]
pub struct DecompositionReport {
    /// Id of the root docstring
    pub root: ContentHash,
    /// Depth passes actually run
    pub passes: usize,
    /// Whether the last two passes produced the same graph
    pub converged: bool,
    /// Graph reachable from the root after the last pass
    pub graph: DependencyGraph,
}

/// Top-level decomposition entry point
#[derive(Debug, Clone)]
pub struct Decomposer {
    config: DecomposeConfig,
    gateway: CompletionGateway,
    engine: ExpansionEngine,
}

impl Decomposer {
    /// Wire a decomposer from its collaborators
    ///
    /// # Errors
    /// - `DecomposeError::InvalidConfig` if `config` fails validation
    pub fn new(
        config: DecomposeConfig,
        registry: Registry,
        backend: Arc<dyn CompletionBackend>,
        neighbors: Arc<dyn NeighborIndex>,
    ) -> DecomposeResult<Self> {
        config.validate()?;

        let gateway = CompletionGateway::new(backend)
            .with_options(config.completion.clone())
            .with_max_attempts(config.repair_cap());
        let resolver = SimilarityResolver::new(neighbors, gateway.clone(), config.neighbor_count);
        let engine = ExpansionEngine::new(registry, gateway.clone(), resolver);

        Ok(Self {
            config,
            gateway,
            engine,
        })
    }

    /// Configuration in use
    #[inline]
    pub fn config(&self) -> &DecomposeConfig {
        &self.config
    }

    /// Registry written by this decomposer
    #[inline]
    pub fn registry(&self) -> &Registry {
        self.engine.registry()
    }

    /// Decompose `task` with the configured depth bound
    ///
    /// # Errors
    /// See [`Decomposer::decompose`].
    pub async fn run(&self, task: &str) -> DecomposeResult<DecompositionReport> {
        self.decompose(task, self.config.max_depth).await
    }

    /// Decompose `task`, deepening up to `max_depth`
    ///
    /// # Errors
    /// - `DecomposeError::EmptyRoot` if the backend returns a blank root
    /// - any registry or gateway failure from the expansion passes
    pub async fn decompose(&self, task: &str, max_depth: usize) -> DecomposeResult<DecompositionReport> {
        let run = Ulid::new();
        let span = tracing::info_span!("decompose", %run, max_depth);

        async move {
            let text = self.gateway.generate_text(&prompts::root(task)).await?;
            let root = Docstring::new(text.trim());
            if root.is_blank() {
                return Err(DecomposeError::EmptyRoot);
            }
            tracing::info!("Root docstring {}", root.id().short());

            let mut previous: Option<DependencyGraph> = None;
            let mut passes = 0;
            let mut converged = false;
            let mut last = (root.id(), None);

            for depth in 0..=max_depth {
                let (id, graph) = self
                    .pass(task, &root, depth)
                    .instrument(tracing::info_span!("pass", depth))
                    .await?;
                passes += 1;

                // Pass 0 never expands, so its graph is not a comparison base
                converged = depth > 1 && previous.as_ref() == Some(&graph);
                if depth > 0 {
                    previous = Some(graph.clone());
                }
                last = (id, Some(graph));

                if converged && self.config.stop_on_fixed_point {
                    tracing::info!("Converged after {} passes", passes);
                    break;
                }
            }

            let (root_id, graph) = match last {
                (id, Some(graph)) => (id, graph),
                (id, None) => (id, self.registry().dependency_graph(&id).await?),
            };
            if !converged {
                tracing::info!("Finished {} passes without reaching a fixed point", passes);
            }

            Ok(DecompositionReport {
                root: root_id,
                passes,
                converged,
                graph,
            })
        }
        .instrument(span)
        .await
    }

    /// One depth pass with a fresh visited set
    ///
    /// The returned id differs from the root's own when the root was merged
    /// into an equivalent stored node.
    async fn pass(
        &self,
        task: &str,
        root: &Docstring,
        depth: usize,
    ) -> DecomposeResult<(ContentHash, DependencyGraph)> {
        let pass = DepthPass::new(task, depth);
        let id = self
            .engine
            .expand(&pass, root.clone(), None, 0)
            .await?
            .unwrap_or_else(|| root.id());
        tracing::debug!("Pass visited {} nodes", pass.visited_count());

        let graph = self.registry().dependency_graph(&id).await?;
        Ok((id, graph))
    }
}
