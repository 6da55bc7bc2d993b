//! Completion gateway
//!
//! The engine talks to two external collaborators through narrow traits:
//! a text-generation backend and a nearest-neighbor index. The gateway wraps
//! the backend with the structured call-and-repair loop: an unparseable
//! response is fed back to the backend together with the parse error until
//! valid JSON of the requested shape arrives or the attempt cap is reached.

use crate::config::CompletionOptions;
use crate::error::{DecomposeError, DecomposeResult, GatewayError};
use crate::prompts;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Text-generation backend
///
/// Implementations own transport, authentication and timeouts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete `prompt` and return the raw response text
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, GatewayError>;
}

/// Nearest-neighbor search over previously stored docstrings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NeighborIndex: Send + Sync {
    /// Up to `k` stored texts closest to `text`, closest first
    async fn nearest(&self, text: &str, k: usize) -> Result<Vec<String>, GatewayError>;
}

/// Backend wrapper with structured parsing and repair
#[derive(Clone)]
pub struct CompletionGateway {
    backend: Arc<dyn CompletionBackend>,
    options: CompletionOptions,
    max_attempts: Option<u32>,
}

impl CompletionGateway {
    /// Create a gateway with default options and no attempt cap
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            options: CompletionOptions::default(),
            max_attempts: None,
        }
    }

    /// With decoding options
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// With an attempt cap for structured calls; `None` retries forever
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Decoding options sent with every call
    #[inline]
    pub fn options(&self) -> &CompletionOptions {
        &self.options
    }

    /// Single free-text completion
    ///
    /// # Errors
    /// - `DecomposeError::Gateway` if the backend fails
    pub async fn generate_text(&self, prompt: &str) -> DecomposeResult<String> {
        Ok(self.backend.complete(prompt, &self.options).await?)
    }

    /// Completion parsed as `T`, repairing malformed responses
    ///
    /// Each failed parse prepends a repair block with the parse error and
    /// the offending response to the original prompt.
    ///
    /// # Errors
    /// - `DecomposeError::Gateway` if the backend fails
    /// - `DecomposeError::RepairExhausted` once the attempt cap is reached
    pub async fn generate_structured<T: DeserializeOwned>(&self, prompt: &str) -> DecomposeResult<T> {
        let mut preamble = String::new();
        let mut attempts: u32 = 0;

        loop {
            let request = if preamble.is_empty() {
                prompt.to_string()
            } else {
                format!("{preamble}{prompt}")
            };
            let response = self.backend.complete(&request, &self.options).await?;
            attempts += 1;

            match parse_structured::<T>(&response) {
                Ok(value) => {
                    if attempts > 1 {
                        tracing::debug!("Structured response parsed after {} attempts", attempts);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    let error = e.to_string();
                    tracing::warn!("Malformed structured response (attempt {}): {}", attempts, error);

                    if self.max_attempts.is_some_and(|cap| attempts >= cap) {
                        return Err(DecomposeError::RepairExhausted {
                            attempts,
                            last_error: error,
                        });
                    }
                    preamble = prompts::repair_preamble(&error, &response);
                }
            }
        }
    }
}

impl std::fmt::Debug for CompletionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionGateway")
            .field("options", &self.options)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Parse a response as JSON after trimming and removing a code fence
///
/// # Errors
/// Returns the JSON error when the cleaned text is not a valid `T`.
pub fn parse_structured<T: DeserializeOwned>(response: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fence(response))
}

/// Strip a surrounding Markdown code fence, with or without a language tag
#[must_use]
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line
    match body.split_once('\n') {
        Some((info, inner)) if !info.trim_start().starts_with(['[', '{']) => inner.trim(),
        _ => body.trim(),
    }
}
