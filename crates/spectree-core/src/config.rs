//! Decomposition configuration
//!
//! Loadable from TOML; every field has a default so a partial file works.
//!
//! ```toml
//! max_depth = 4
//! neighbor_count = 5
//! max_repair_attempts = 8
//!
//! [completion]
//! model = "gpt-4"
//! max_tokens = 2048
//! temperature = 0.0
//! ```

use crate::error::{DecomposeError, DecomposeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Decoding options passed to the completion backend on every call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionOptions {
    /// Backend model name
    pub model: String,
    /// Response token limit
    pub max_tokens: u32,
    /// Sampling temperature; graph construction wants 0
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            max_tokens: 2048,
            temperature: 0.0,
        }
    }
}

/// Decomposition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecomposeConfig {
    /// Deepest depth pass the driver runs
    pub max_depth: usize,
    /// Nearest neighbors fetched per candidate
    pub neighbor_count: usize,
    /// Completion calls allowed per structured request; 0 means no cap
    pub max_repair_attempts: u32,
    /// Stop deepening once two passes yield the same graph
    pub stop_on_fixed_point: bool,
    /// Backend decoding options
    pub completion: CompletionOptions,
}

impl DecomposeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max depth
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// With neighbor count
    #[inline]
    #[must_use]
    pub fn with_neighbor_count(mut self, k: usize) -> Self {
        self.neighbor_count = k;
        self
    }

    /// With repair attempt cap (0 disables the cap)
    #[inline]
    #[must_use]
    pub fn with_max_repair_attempts(mut self, attempts: u32) -> Self {
        self.max_repair_attempts = attempts;
        self
    }

    /// With fixed-point early stop toggled
    #[inline]
    #[must_use]
    pub fn with_stop_on_fixed_point(mut self, stop: bool) -> Self {
        self.stop_on_fixed_point = stop;
        self
    }

    /// With completion options
    #[inline]
    #[must_use]
    pub fn with_completion(mut self, completion: CompletionOptions) -> Self {
        self.completion = completion;
        self
    }

    /// Repair cap as an option, `None` when unbounded
    #[inline]
    #[must_use]
    pub fn repair_cap(&self) -> Option<u32> {
        (self.max_repair_attempts > 0).then_some(self.max_repair_attempts)
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// - `DecomposeError::InvalidConfig` on syntax errors or invalid values
    pub fn from_toml_str(text: &str) -> DecomposeResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| DecomposeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// - `DecomposeError::ConfigRead` if the file cannot be read
    /// - `DecomposeError::InvalidConfig` on syntax errors or invalid values
    pub fn load(path: impl AsRef<Path>) -> DecomposeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DecomposeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// - `DecomposeError::InvalidConfig` naming the offending field
    pub fn validate(&self) -> DecomposeResult<()> {
        if self.neighbor_count == 0 {
            return Err(DecomposeError::InvalidConfig(
                "neighbor_count must be at least 1".to_string(),
            ));
        }
        if self.completion.max_tokens == 0 {
            return Err(DecomposeError::InvalidConfig(
                "completion.max_tokens must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            neighbor_count: 5,
            max_repair_attempts: 8,
            stop_on_fixed_point: true,
            completion: CompletionOptions::default(),
        }
    }
}
