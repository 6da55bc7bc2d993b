//! Materialized dependency graphs
//!
//! A [`DependencyGraph`] is a snapshot of every node reachable from a root
//! over dependency markers. Two snapshots compare equal exactly when they
//! have the same root and the same edges.

use serde::Serialize;
use serde_json::{Map, Value};
use spectree_docstring::ContentHash;
use std::collections::{BTreeMap, BTreeSet};

/// Reachable dependency structure below one root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    root: ContentHash,
    edges: BTreeMap<ContentHash, BTreeSet<ContentHash>>,
}

impl DependencyGraph {
    pub(crate) fn new(root: ContentHash, edges: BTreeMap<ContentHash, BTreeSet<ContentHash>>) -> Self {
        Self { root, edges }
    }

    /// Root node id
    #[inline]
    #[must_use]
    pub fn root(&self) -> ContentHash {
        self.root
    }

    /// Number of reachable nodes, root included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes (never true for a materialized graph)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Total number of dependency edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Children of a reachable node
    #[inline]
    #[must_use]
    pub fn children(&self, id: &ContentHash) -> Option<&BTreeSet<ContentHash>> {
        self.edges.get(id)
    }

    /// Whether `id` is reachable from the root
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &ContentHash) -> bool {
        self.edges.contains_key(id)
    }

    /// Reachable node ids in order
    pub fn nodes(&self) -> impl Iterator<Item = ContentHash> + '_ {
        self.edges.keys().copied()
    }

    /// Nested `{ id: [subtree, ...] }` rendering
    ///
    /// Shared children appear under every parent, so the output is not
    /// memoized and can grow exponentially on stacked diamonds. Use the graph
    /// itself for anything but display. A node already on the current path
    /// is rendered with no children to cut cycles.
    #[must_use]
    pub fn to_tree(&self) -> Value {
        let mut path = BTreeSet::new();
        self.subtree(self.root, &mut path)
    }

    fn subtree(&self, id: ContentHash, path: &mut BTreeSet<ContentHash>) -> Value {
        let children = if path.insert(id) {
            let rendered = self
                .edges
                .get(&id)
                .into_iter()
                .flatten()
                .map(|child| self.subtree(*child, path))
                .collect();
            path.remove(&id);
            rendered
        } else {
            Vec::new()
        };

        let mut node = Map::new();
        node.insert(id.to_string(), Value::Array(children));
        Value::Object(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph(root: ContentHash, edges: Vec<(ContentHash, Vec<ContentHash>)>) -> DependencyGraph {
        let edges = edges
            .into_iter()
            .map(|(id, children)| (id, children.into_iter().collect()))
            .collect();
        DependencyGraph::new(root, edges)
    }

    #[test]
    fn structural_equality() {
        let [a, b] = ["a", "b"].map(ContentHash::of_text);
        let g1 = graph(a, vec![(a, vec![b]), (b, vec![])]);
        let g2 = graph(a, vec![(b, vec![]), (a, vec![b])]);
        let g3 = graph(a, vec![(a, vec![])]);

        assert_eq!(g1, g2);
        assert_ne!(g1, g3);
    }

    #[test]
    fn tree_of_single_node() {
        let a = ContentHash::of_text("a");
        let g = graph(a, vec![(a, vec![])]);
        assert_eq!(g.to_tree(), json!({ a.to_string(): [] }));
        assert_eq!(g.len(), 1);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn tree_repeats_shared_children_and_cuts_cycles() {
        let [a, b, c, d] = ["a", "b", "c", "d"].map(ContentHash::of_text);
        let g = graph(a, vec![(a, vec![b, c]), (b, vec![d]), (c, vec![d]), (d, vec![a])]);

        let tree = g.to_tree();
        let leaf_d = json!({ d.to_string(): [ { a.to_string(): [] } ] });
        let mut expected_children = vec![
            (b, json!({ b.to_string(): [leaf_d.clone()] })),
            (c, json!({ c.to_string(): [leaf_d] })),
        ];
        expected_children.sort_by_key(|(id, _)| *id);
        let expected = json!({
            a.to_string(): expected_children.into_iter().map(|(_, v)| v).collect::<Vec<_>>()
        });
        assert_eq!(tree, expected);
    }
}
