//! Testing utilities for Spectree workspace
//!
//! Scripted collaborators for the decomposition engine and registry fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use spectree_core::prompts::{
    CHILDREN_HEADING, COMPARISON_HEADING, COMPARISON_SEPARATOR, REPAIR_HEADING, ROOT_HEADING,
};
use spectree_core::{CompletionBackend, CompletionOptions, GatewayError, NeighborIndex};
use spectree_registry::Registry;
use std::collections::{HashMap, VecDeque};
use tempfile::TempDir;

/// Completion backend answering by prompt kind
///
/// - root prompts get the configured root text
/// - children prompts get the children registered for the parent text, or `[]`
/// - comparison prompts get the verdict registered for the base text, or a
///   "different function" verdict
///
/// Raw responses queued with [`ScriptedBackend::push_raw`] take priority
/// over all of the above. Every prompt is recorded.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    root: String,
    children: HashMap<String, Vec<String>>,
    verdicts: HashMap<String, String>,
    raw: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Children returned when expanding `parent`
    #[must_use]
    pub fn with_children(mut self, parent: &str, children: &[&str]) -> Self {
        self.children.insert(
            parent.to_string(),
            children.iter().map(|c| (*c).to_string()).collect(),
        );
        self
    }

    /// Judge `base` to be the same function as the neighbor at `index`
    #[must_use]
    pub fn with_match(mut self, base: &str, index: usize) -> Self {
        let verdict = json!({
            "think step by step": "same inputs and outputs",
            "most similar": index,
            "same function": true,
            "explanation": "scripted"
        });
        self.verdicts.insert(base.to_string(), verdict.to_string());
        self
    }

    /// Queue a raw response for the next call, whatever the prompt
    pub fn push_raw(&self, response: impl Into<String>) {
        self.raw.lock().push_back(response.into());
    }

    /// Every prompt received so far, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Number of prompts of one kind, by heading
    pub fn count(&self, heading: &str) -> usize {
        self.prompts
            .lock()
            .iter()
            .filter(|p| strip_repair(p).starts_with(heading))
            .count()
    }

    /// Number of children prompts received
    pub fn expansions(&self) -> usize {
        self.count(CHILDREN_HEADING)
    }

    /// Number of comparison prompts received
    pub fn comparisons(&self) -> usize {
        self.count(COMPARISON_HEADING)
    }

    fn respond(&self, prompt: &str) -> String {
        if let Some(raw) = self.raw.lock().pop_front() {
            return raw;
        }

        let prompt = strip_repair(prompt);
        if prompt.starts_with(ROOT_HEADING) {
            return self.root.clone();
        }
        if prompt.starts_with(CHILDREN_HEADING) {
            let children = children_parent(prompt)
                .and_then(|p| self.children.get(p))
                .cloned()
                .unwrap_or_default();
            return json!(children).to_string();
        }
        if prompt.starts_with(COMPARISON_HEADING) {
            let base = section(prompt, "## Base docstring\n\n", "\n\n## Similar docstrings");
            if let Some(verdict) = base.and_then(|b| self.verdicts.get(b)) {
                return verdict.clone();
            }
            return json!({"most similar": 0, "same function": false}).to_string();
        }
        String::new()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, prompt: &str, _options: &CompletionOptions) -> Result<String, GatewayError> {
        self.prompts.lock().push(prompt.to_string());
        Ok(self.respond(prompt))
    }
}

/// Neighbor index returning fixed lists keyed by query text
#[derive(Debug, Default, Clone)]
pub struct StaticNeighbors {
    by_text: HashMap<String, Vec<String>>,
}

impl StaticNeighbors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Neighbors returned when querying `text`
    #[must_use]
    pub fn with(mut self, text: &str, neighbors: &[&str]) -> Self {
        self.by_text.insert(
            text.to_string(),
            neighbors.iter().map(|n| (*n).to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl NeighborIndex for StaticNeighbors {
    async fn nearest(&self, text: &str, k: usize) -> Result<Vec<String>, GatewayError> {
        Ok(self
            .by_text
            .get(text)
            .map(|n| n.iter().take(k).cloned().collect())
            .unwrap_or_default())
    }
}

/// Neighbor index backed by a closure
pub struct FnNeighbors<F>(pub F);

#[async_trait]
impl<F> NeighborIndex for FnNeighbors<F>
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    async fn nearest(&self, text: &str, k: usize) -> Result<Vec<String>, GatewayError> {
        Ok((self.0)(text).into_iter().take(k).collect())
    }
}

/// Registry in a fresh temp directory; keep the guard alive
pub async fn temp_registry() -> (TempDir, Registry) {
    let dir = TempDir::new().unwrap();
    let registry = Registry::open(dir.path()).await.unwrap();
    (dir, registry)
}

/// Parent docstring of a children prompt, `None` for other prompts
pub fn children_parent(prompt: &str) -> Option<&str> {
    let prompt = strip_repair(prompt);
    if !prompt.starts_with(CHILDREN_HEADING) {
        return None;
    }
    section(prompt, "## Your parent docstring\n\n", "\n\n## The original task")
}

/// Indexed entries of a comparison prompt, in order
pub fn comparison_entries(prompt: &str) -> Vec<String> {
    section(strip_repair(prompt), "## Similar docstrings\n\n", "\n\n## Required JSON format")
        .map(|list| {
            list.split(COMPARISON_SEPARATOR)
                .filter_map(|entry| entry.split_once('\n').map(|(_, text)| text.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn strip_repair(prompt: &str) -> &str {
    if !prompt.starts_with(REPAIR_HEADING) {
        return prompt;
    }
    [ROOT_HEADING, CHILDREN_HEADING, COMPARISON_HEADING]
        .iter()
        .filter_map(|heading| prompt.find(heading))
        .min()
        .map_or(prompt, |start| &prompt[start..])
}

fn section<'a>(prompt: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = prompt.find(start)? + start.len();
    let len = prompt[from..].find(end)?;
    Some(&prompt[from..from + len])
}
