//! Similarity resolution
//!
//! Decides whether a freshly generated docstring is a new function, a
//! restatement of its own parent, or a duplicate of something already
//! stored. Selection is delegated to a single judged verdict over all
//! neighbors at once; there is no numeric similarity threshold.

use crate::error::DecomposeResult;
use crate::gateway::{CompletionGateway, NeighborIndex};
use crate::prompts;
use serde_json::Value;
use spectree_docstring::{ContentHash, Docstring};
use std::sync::Arc;

/// Outcome of resolving one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No neighbor is judged to be the same function
    Novel,
    /// The matching neighbor is the candidate's immediate parent
    DuplicateOfParent,
    /// The matching neighbor is another node; it becomes canonical
    DuplicateOfExisting(Docstring),
}

/// Judged comparison, interpreted conservatively
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Neighbor at this index is the same function
    Same(usize),
    /// Explicitly different
    Different,
    /// Non-boolean verdict or unusable index
    Ambiguous,
}

impl Verdict {
    /// Interpret a comparison response against `neighbor_count` entries
    ///
    /// Only a JSON `true` under `"same function"` together with an in-range
    /// integer under `"most similar"` counts as a match.
    #[must_use]
    pub fn interpret(response: &Value, neighbor_count: usize) -> Self {
        match response.get("same function") {
            Some(Value::Bool(true)) => {}
            Some(Value::Bool(false)) => return Self::Different,
            _ => return Self::Ambiguous,
        }

        match response
            .get("most similar")
            .and_then(Value::as_u64)
            .and_then(|i| usize::try_from(i).ok())
        {
            Some(index) if index < neighbor_count => Self::Same(index),
            _ => Self::Ambiguous,
        }
    }
}

/// Resolver over a neighbor index and the completion gateway
#[derive(Clone)]
pub struct SimilarityResolver {
    neighbors: Arc<dyn NeighborIndex>,
    gateway: CompletionGateway,
    neighbor_count: usize,
}

impl SimilarityResolver {
    /// Create a resolver fetching `neighbor_count` neighbors per candidate
    pub fn new(neighbors: Arc<dyn NeighborIndex>, gateway: CompletionGateway, neighbor_count: usize) -> Self {
        Self {
            neighbors,
            gateway,
            neighbor_count,
        }
    }

    /// Resolve `candidate` generated under `parent`
    ///
    /// # Errors
    /// - `DecomposeError::Gateway` if the neighbor search or completion fails
    /// - `DecomposeError::RepairExhausted` if the verdict never parses
    pub async fn find_duplicate(
        &self,
        candidate: &Docstring,
        parent: Option<ContentHash>,
    ) -> DecomposeResult<Resolution> {
        let mut similar = self
            .neighbors
            .nearest(candidate.text(), self.neighbor_count)
            .await?;
        similar.retain(|text| text.as_str() != candidate.text());

        if similar.is_empty() {
            return Ok(Resolution::Novel);
        }

        let prompt = prompts::comparison(candidate.text(), &similar);
        let response: Value = self.gateway.generate_structured(&prompt).await?;

        let index = match Verdict::interpret(&response, similar.len()) {
            Verdict::Same(index) => index,
            Verdict::Different => return Ok(Resolution::Novel),
            Verdict::Ambiguous => {
                tracing::warn!(
                    "Ambiguous verdict for {}, treating as novel: {}",
                    candidate.id().short(),
                    response
                );
                return Ok(Resolution::Novel);
            }
        };

        let existing = Docstring::new(similar.swap_remove(index));
        if Some(existing.id()) == parent {
            tracing::debug!("{} restates its parent", candidate.id().short());
            Ok(Resolution::DuplicateOfParent)
        } else {
            tracing::debug!(
                "{} duplicates {}",
                candidate.id().short(),
                existing.id().short()
            );
            Ok(Resolution::DuplicateOfExisting(existing))
        }
    }
}

impl std::fmt::Debug for SimilarityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityResolver")
            .field("gateway", &self.gateway)
            .field("neighbor_count", &self.neighbor_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockCompletionBackend, MockNeighborIndex};
    use serde_json::json;

    fn neighbors(texts: &'static [&'static str]) -> MockNeighborIndex {
        let mut index = MockNeighborIndex::new();
        index
            .expect_nearest()
            .returning(move |_, _| Ok(texts.iter().map(|t| t.to_string()).collect()));
        index
    }

    fn judge(response: &'static str) -> CompletionGateway {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .returning(move |_, _| Ok(response.to_string()));
        CompletionGateway::new(Arc::new(backend))
    }

    fn silent_judge() -> CompletionGateway {
        let mut backend = MockCompletionBackend::new();
        backend.expect_complete().never();
        CompletionGateway::new(Arc::new(backend))
    }

    #[test]
    fn verdict_interpretation() {
        assert_eq!(
            Verdict::interpret(&json!({"most similar": 1, "same function": true}), 2),
            Verdict::Same(1)
        );
        assert_eq!(
            Verdict::interpret(&json!({"most similar": 0, "same function": false}), 2),
            Verdict::Different
        );
        assert_eq!(
            Verdict::interpret(&json!({"most similar": 0, "same function": "unknown"}), 2),
            Verdict::Ambiguous
        );
        assert_eq!(
            Verdict::interpret(&json!({"most similar": 2, "same function": true}), 2),
            Verdict::Ambiguous
        );
        assert_eq!(
            Verdict::interpret(&json!({"most similar": -1, "same function": true}), 2),
            Verdict::Ambiguous
        );
        assert_eq!(
            Verdict::interpret(&json!({"most similar": "0", "same function": true}), 2),
            Verdict::Ambiguous
        );
        assert_eq!(Verdict::interpret(&json!([true]), 2), Verdict::Ambiguous);
    }

    #[tokio::test]
    async fn identical_neighbors_are_ignored() {
        let resolver = SimilarityResolver::new(
            Arc::new(neighbors(&["Reverses a string."])),
            silent_judge(),
            5,
        );
        let outcome = resolver
            .find_duplicate(&Docstring::new("Reverses a string."), None)
            .await
            .unwrap();
        assert_eq!(outcome, Resolution::Novel);
    }

    #[tokio::test]
    async fn no_neighbors_is_novel() {
        let resolver = SimilarityResolver::new(Arc::new(neighbors(&[])), silent_judge(), 5);
        let outcome = resolver.find_duplicate(&Docstring::new("x"), None).await.unwrap();
        assert_eq!(outcome, Resolution::Novel);
    }

    #[tokio::test]
    async fn match_on_parent() {
        let parent = Docstring::new("Parses a date.");
        let resolver = SimilarityResolver::new(
            Arc::new(neighbors(&["Formats a date.", "Parses a date."])),
            judge(r#"{"think step by step": "...", "most similar": 1, "same function": true, "explanation": ""}"#),
            5,
        );
        let outcome = resolver
            .find_duplicate(&Docstring::new("Parses a date string."), Some(parent.id()))
            .await
            .unwrap();
        assert_eq!(outcome, Resolution::DuplicateOfParent);
    }

    #[tokio::test]
    async fn match_on_other_node() {
        let resolver = SimilarityResolver::new(
            Arc::new(neighbors(&["Parses a date string.", "Formats a date."])),
            judge(r#"{"most similar": 1, "same function": true}"#),
            5,
        );
        let outcome = resolver
            .find_duplicate(
                &Docstring::new("Formats a date as text."),
                Some(ContentHash::of_text("unrelated parent")),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Resolution::DuplicateOfExisting(Docstring::new("Formats a date."))
        );
    }

    #[tokio::test]
    async fn index_counts_only_remaining_neighbors() {
        // The identical entry is dropped before indexing, so index 1 is out of range
        let resolver = SimilarityResolver::new(
            Arc::new(neighbors(&["Formats a date.", "Formats a date as text."])),
            judge(r#"{"most similar": 1, "same function": true}"#),
            5,
        );
        let outcome = resolver
            .find_duplicate(&Docstring::new("Formats a date as text."), None)
            .await
            .unwrap();
        assert_eq!(outcome, Resolution::Novel);
    }

    #[tokio::test]
    async fn asks_for_configured_neighbor_count() {
        let mut index = MockNeighborIndex::new();
        index
            .expect_nearest()
            .withf(|_, k| *k == 3)
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        let resolver = SimilarityResolver::new(Arc::new(index), silent_judge(), 3);
        resolver.find_duplicate(&Docstring::new("x"), None).await.unwrap();
    }
}
