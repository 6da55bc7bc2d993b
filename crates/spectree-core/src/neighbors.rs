//! Lexical neighbor index
//!
//! A [`NeighborIndex`] over the registry itself, scoring stored texts by
//! word-set Jaccard similarity. It stands in for an embedding service when
//! none is configured and backs the `similar` inspection command.

use crate::error::GatewayError;
use crate::gateway::NeighborIndex;
use async_trait::async_trait;
use spectree_docstring::ContentHash;
use spectree_registry::Registry;
use std::collections::BTreeSet;

/// Word-overlap nearest neighbors over every stored docstring
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    registry: Registry,
}

/// One scored neighbor
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredNeighbor {
    pub id: ContentHash,
    pub text: String,
    pub score: f64,
}

impl LexicalIndex {
    /// Create an index reading from `registry`
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Scored neighbors of `text`, best first, ties broken by id
    ///
    /// Texts sharing no word with `text` are left out.
    ///
    /// # Errors
    /// - `GatewayError::Neighbors` if the registry cannot be read
    pub async fn scored(&self, text: &str, k: usize) -> Result<Vec<ScoredNeighbor>, GatewayError> {
        let query = words(text);
        let ids = self
            .registry
            .ids()
            .await
            .map_err(|e| GatewayError::Neighbors(e.to_string()))?;

        let mut scored = Vec::new();
        for id in ids {
            let docstring = match self.registry.get(&id).await {
                Ok(docstring) => docstring,
                // Removed by a concurrent merge since listing
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(GatewayError::Neighbors(e.to_string())),
            };
            let score = jaccard(&query, &words(docstring.text()));
            if score > 0.0 {
                scored.push(ScoredNeighbor {
                    id,
                    text: docstring.text().to_string(),
                    score,
                });
            }
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        scored.truncate(k);
        Ok(scored)
    }
}

#[async_trait]
impl NeighborIndex for LexicalIndex {
    async fn nearest(&self, text: &str, k: usize) -> Result<Vec<String>, GatewayError> {
        Ok(self
            .scored(text, k)
            .await?
            .into_iter()
            .map(|neighbor| neighbor.text)
            .collect())
    }
}

fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectree_docstring::Docstring;
    use tempfile::TempDir;

    #[test]
    fn word_sets_ignore_case_and_punctuation() {
        let w = words("Reverses a STRING, returns the string.");
        assert_eq!(w.len(), 5);
        assert!(w.contains("string"));
        assert_eq!(jaccard(&words("a b"), &words("b c")), 1.0 / 3.0);
        assert_eq!(jaccard(&words(""), &words("")), 0.0);
    }

    #[tokio::test]
    async fn ranks_by_overlap_and_drops_disjoint() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).await.unwrap();
        for text in [
            "Reverses the characters of a string.",
            "Reverses the order of a list.",
            "Sends an email.",
        ] {
            registry.put(&Docstring::new(text)).await.unwrap();
        }

        let index = LexicalIndex::new(registry);
        let nearest = index.nearest("Reverses a string.", 5).await.unwrap();
        assert_eq!(
            nearest,
            vec![
                "Reverses the characters of a string.".to_string(),
                "Reverses the order of a list.".to_string(),
            ]
        );

        let top = index.nearest("Reverses a string.", 1).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn equal_scores_order_by_id() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).await.unwrap();
        let a = Docstring::new("alpha beta");
        let b = Docstring::new("alpha gamma");
        registry.put(&a).await.unwrap();
        registry.put(&b).await.unwrap();

        let scored = LexicalIndex::new(registry).scored("alpha", 5).await.unwrap();
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].score, scored[1].score);
        assert!(scored[0].id < scored[1].id);
    }
}
