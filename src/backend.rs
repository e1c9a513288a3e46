//! Inference backend: token counting and length-bounded summarisation.
//!
//! The pipeline talks to the model only through [`SummaryBackend`]. Token
//! counting is part of the same trait (via [`TokenCounter`]) so the chunker,
//! the length windows and the capacity check all measure text with one
//! tokenizer. Passing a different counter to the chunker than the one the
//! summariser uses would silently break the token budget.
//!
//! [`LlmBackend`] is the shipped implementation: any `edgequake-llm` chat
//! provider for the text, tiktoken `cl100k_base` for the counts.

use crate::config::SummaryConfig;
use crate::error::{BackendError, SummaryError};
use crate::prompts::{summarize_request, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Measures text in backend tokens.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// A summarisation model shared read-only by every tier-1 worker.
///
/// Implementations take `&self` only; the pipeline holds one instance in an
/// `Arc` for the lifetime of the process.
#[async_trait]
pub trait SummaryBackend: TokenCounter {
    /// Largest input, in tokens, the model accepts in one call.
    fn max_input_tokens(&self) -> usize;

    /// Summarise `text` into roughly `window.min..=window.max` tokens.
    async fn summarize(&self, text: &str, window: LengthWindow) -> Result<String, BackendError>;
}

/// Target output length for one summarisation call, in tokens.
///
/// Always satisfies `min >= 1` and `max >= min + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthWindow {
    pub min: usize,
    pub max: usize,
}

impl LengthWindow {
    /// Window proportional to `input_tokens`:
    /// `min = max(⌊T·min_ratio⌋, 1)`, `max = max(⌊T·max_ratio⌋, min + 1)`.
    pub fn proportional(input_tokens: usize, min_ratio: f64, max_ratio: f64) -> Self {
        let scaled = |ratio: f64| (input_tokens as f64 * ratio).floor() as usize;
        let min = scaled(min_ratio).max(1);
        let max = scaled(max_ratio).max(min + 1);
        Self { min, max }
    }
}

// ── LLM-backed implementation ────────────────────────────────────────────

/// Name of the tiktoken encoding used for every count.
pub const TOKENIZER_NAME: &str = "cl100k_base";

/// Chat-completion summariser over an `edgequake-llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
    bpe: CoreBPE,
    max_input_tokens: usize,
    temperature: f32,
    system_prompt: String,
}

impl LlmBackend {
    /// Wrap an already-resolved provider.
    ///
    /// Fails only if the tokenizer cannot be loaded; without it no chunk
    /// budget can be enforced.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &SummaryConfig) -> Result<Self, SummaryError> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| SummaryError::TokenizerLoad {
            name: TOKENIZER_NAME.to_string(),
            detail: e.to_string(),
        })?;

        Ok(Self {
            provider,
            bpe,
            max_input_tokens: config.max_input_tokens,
            temperature: config.temperature,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        })
    }

    /// Resolve the provider from `config` and load the tokenizer.
    pub fn from_config(config: &SummaryConfig) -> Result<Self, SummaryError> {
        let provider = resolve_provider(config)?;
        Self::new(provider, config)
    }
}

impl TokenCounter for LlmBackend {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

#[async_trait]
impl SummaryBackend for LlmBackend {
    fn max_input_tokens(&self) -> usize {
        self.max_input_tokens
    }

    async fn summarize(&self, text: &str, window: LengthWindow) -> Result<String, BackendError> {
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(summarize_request(text, window.min, window.max)),
        ];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(window.max),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BackendError::Call(e.to_string()))?;

        debug!(
            "Backend call: {} input tokens, {} output tokens (window {}..={})",
            response.prompt_tokens, response.completion_tokens, window.min, window.max
        );

        let summary = response.content.trim();
        if summary.is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(summary.to_string())
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, SummaryError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SummaryError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI key present** (`OPENAI_API_KEY`).
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &SummaryConfig) -> Result<Arc<dyn LLMProvider>, SummaryError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SummaryError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
