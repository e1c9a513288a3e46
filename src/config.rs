//! Configuration types for document summarisation.
//!
//! All pipeline behaviour is controlled through [`SummaryConfig`], built via
//! its [`SummaryConfigBuilder`]. Loading values from files, flags or the
//! environment is the caller's job; the library only receives resolved
//! values.

use crate::error::SummaryError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Placeholder returned for the whole document when the second tier fails.
pub const DEFAULT_FAILURE_SENTINEL: &str = "Summary could not be generated.";

/// Configuration for a summarisation run.
///
/// Built via [`SummaryConfig::builder()`] or using [`SummaryConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfsum::SummaryConfig;
///
/// let config = SummaryConfig::builder()
///     .token_budget(800)
///     .concurrency(4)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// Maximum tokens per chunk, measured with the backend tokenizer. Default: 1024.
    ///
    /// A single sentence longer than this still becomes its own chunk.
    pub token_budget: usize,

    /// Output length ratios for both summarisation tiers.
    pub ratios: LengthRatios,

    /// Attempts and delay for each tier-1 chunk.
    pub retry: RetryPolicy,

    /// Number of chunks summarised concurrently. Default: available parallelism.
    pub concurrency: usize,

    /// How tier-1 results are ordered before joining. Default: [`CollectionOrder::Indexed`].
    pub collection_order: CollectionOrder,

    /// Text returned for the document when the second tier fails.
    pub failure_sentinel: String,

    /// Largest input the backend accepts, in tokens. Default: 1024.
    ///
    /// The joined tier-1 text is condensed again only when it exceeds this.
    pub max_input_tokens: usize,

    /// LLM model identifier, e.g. "gpt-4.1-nano".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the LLM completion. Default: 0.0.
    pub temperature: f32,

    /// Custom system prompt. If None, uses built-in default.
    pub system_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Directory where the normalised prose of each document is saved. Default: None.
    pub cleaned_text_dir: Option<PathBuf>,

    /// Strip non-ASCII characters before rendering. Default: false.
    pub ascii_only: bool,

    /// Optional per-chunk progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            token_budget: 1024,
            ratios: LengthRatios::default(),
            retry: RetryPolicy::default(),
            concurrency: default_concurrency(),
            collection_order: CollectionOrder::default(),
            failure_sentinel: DEFAULT_FAILURE_SENTINEL.to_string(),
            max_input_tokens: 1024,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            system_prompt: None,
            password: None,
            cleaned_text_dir: None,
            ascii_only: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("token_budget", &self.token_budget)
            .field("ratios", &self.ratios)
            .field("retry", &self.retry)
            .field("concurrency", &self.concurrency)
            .field("collection_order", &self.collection_order)
            .field("max_input_tokens", &self.max_input_tokens)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("cleaned_text_dir", &self.cleaned_text_dir)
            .field("ascii_only", &self.ascii_only)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Host parallelism, falling back to 4 when it cannot be queried.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Builder for [`SummaryConfig`].
#[derive(Debug)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    pub fn token_budget(mut self, tokens: usize) -> Self {
        self.config.token_budget = tokens;
        self
    }

    pub fn ratios(mut self, ratios: LengthRatios) -> Self {
        self.config.ratios = ratios;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry.delay = delay;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn collection_order(mut self, order: CollectionOrder) -> Self {
        self.config.collection_order = order;
        self
    }

    pub fn failure_sentinel(mut self, text: impl Into<String>) -> Self {
        self.config.failure_sentinel = text.into();
        self
    }

    pub fn max_input_tokens(mut self, n: usize) -> Self {
        self.config.max_input_tokens = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn cleaned_text_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cleaned_text_dir = Some(dir.into());
        self
    }

    pub fn ascii_only(mut self, v: bool) -> Self {
        self.config.ascii_only = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, SummaryError> {
        let c = &self.config;
        if c.token_budget == 0 {
            return Err(SummaryError::InvalidConfig(
                "Token budget must be ≥ 1".into(),
            ));
        }
        if c.max_input_tokens == 0 {
            return Err(SummaryError::InvalidConfig(
                "Backend input capacity must be ≥ 1".into(),
            ));
        }
        if c.retry.max_attempts == 0 {
            return Err(SummaryError::InvalidConfig(
                "Retry attempts must be ≥ 1".into(),
            ));
        }
        c.ratios.validate()?;
        Ok(self.config)
    }
}

// ── Value types ──────────────────────────────────────────────────────────

/// Output-length ratios relative to the input token count.
///
/// Tier 1 uses `first_*` against each chunk; tier 2 uses `second_*`
/// against the joined tier-1 text. All values lie in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthRatios {
    pub first_min: f64,
    pub first_max: f64,
    pub second_min: f64,
    pub second_max: f64,
}

impl Default for LengthRatios {
    fn default() -> Self {
        Self {
            first_min: 0.25,
            first_max: 0.45,
            second_min: 0.60,
            second_max: 0.80,
        }
    }
}

impl LengthRatios {
    fn validate(&self) -> Result<(), SummaryError> {
        let named = [
            ("first_min", self.first_min),
            ("first_max", self.first_max),
            ("second_min", self.second_min),
            ("second_max", self.second_max),
        ];
        for (name, value) in named {
            if !(value > 0.0 && value <= 1.0) {
                return Err(SummaryError::InvalidConfig(format!(
                    "Ratio {name} must be in (0, 1], got {value}"
                )));
            }
        }
        if self.first_min > self.first_max {
            return Err(SummaryError::InvalidConfig(format!(
                "first_min ({}) exceeds first_max ({})",
                self.first_min, self.first_max
            )));
        }
        if self.second_min > self.second_max {
            return Err(SummaryError::InvalidConfig(format!(
                "second_min ({}) exceeds second_max ({})",
                self.second_min, self.second_max
            )));
        }
        Ok(())
    }
}

/// Bounded retry for a single chunk: `max_attempts` calls in total with a
/// fixed `delay` between consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Same attempt count, no waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Order in which tier-1 summaries are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionOrder {
    /// One slot per chunk, joined by chunk index after all tasks finish. (default)
    #[default]
    Indexed,
    /// Joined in the order chunks finish. Output may vary between runs.
    Completion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = SummaryConfig::default();
        assert_eq!(c.token_budget, 1024);
        assert_eq!(c.retry.max_attempts, 3);
        assert_eq!(c.retry.delay, Duration::from_secs(3));
        assert_eq!(c.collection_order, CollectionOrder::Indexed);
        assert_eq!(c.failure_sentinel, DEFAULT_FAILURE_SENTINEL);
        assert!(c.concurrency >= 1);
    }

    #[test]
    fn builder_rejects_out_of_range_ratio() {
        let ratios = LengthRatios {
            first_min: 0.0,
            ..LengthRatios::default()
        };
        let err = SummaryConfig::builder().ratios(ratios).build().unwrap_err();
        assert!(err.to_string().contains("first_min"), "got: {err}");
    }

    #[test]
    fn builder_rejects_inverted_ratios() {
        let ratios = LengthRatios {
            second_min: 0.9,
            second_max: 0.5,
            ..LengthRatios::default()
        };
        assert!(SummaryConfig::builder().ratios(ratios).build().is_err());
    }

    #[test]
    fn builder_rejects_zero_budget_and_attempts() {
        assert!(SummaryConfig::builder().token_budget(0).build().is_err());
        assert!(SummaryConfig::builder().max_attempts(0).build().is_err());
    }

    #[test]
    fn builder_clamps_concurrency() {
        let c = SummaryConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn debug_hides_provider() {
        let c = SummaryConfig::default();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("token_budget"));
    }
}
