//! # edgequake-pdfsum
//!
//! Condense long PDF documents into short summaries without mangling their
//! code and mathematics.
//!
//! ## Why this crate?
//!
//! Summarisation models rewrite everything they are given. Source code
//! comes back paraphrased and equations come back as prose, or not at all.
//! This crate lifts code blocks and equations out of the text before the
//! model sees it, summarises only the prose, and appends the preserved
//! units verbatim at the end.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Pages        per-page text via pdfium (spawn_blocking)
//!  ├─ 2. Extract      ```fenced```, <code>, indented blocks, $math$
//!  ├─ 3. Normalise    line wraps, glued words, punctuation
//!  ├─ 4. Chunk        sentence-aligned, token-budgeted
//!  ├─ 5. Summarise    tier 1 per chunk (concurrent, retried),
//!  │                  tier 2 over the joined text if it is still too long
//!  └─ 6. Reintegrate  summary + "Code Blocks" + "Equations"
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfsum::{condense, SummaryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = SummaryConfig::default();
//!     let output = condense("paper.pdf", &config).await?;
//!     println!("{}", output.text);
//!     eprintln!("{} chunk(s), second tier: {}",
//!         output.report.chunk_count,
//!         output.report.second_tier);
//!     Ok(())
//! }
//! ```
//!
//! ## Custom backends
//!
//! Anything implementing [`SummaryBackend`] can replace the LLM; pass it to
//! [`Condenser::new`] together with a [`PageSource`]. The backend's
//! [`TokenCounter`] is used for chunking as well as for length targets.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsum` binary (clap + anyhow + tracing-subscriber + indicatif + toml) |
//!
//! ```toml
//! edgequake-pdfsum = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod condense;
pub mod config;
pub mod document;
pub mod error;
pub mod ledger;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod segment;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{LengthWindow, LlmBackend, SummaryBackend, TokenCounter};
pub use condense::{
    condense, condense_pages, condense_sync, condense_to_file, output_path_for, BatchReport,
    Condenser,
};
pub use config::{CollectionOrder, LengthRatios, RetryPolicy, SummaryConfig, SummaryConfigBuilder};
pub use document::{DocumentRenderer, MarkdownRenderer, RenderReport};
pub use error::{BackendError, ChunkError, SummaryError};
pub use ledger::ProcessedLedger;
pub use output::{
    Chunk, ChunkSummary, ExtractedUnit, Page, PipelineReport, SummaryOutput, SummaryStats,
    UnitKind,
};
pub use pipeline::pages::{PageSource, PdfiumPageSource};
pub use progress::{NoopProgressCallback, ProgressCallback, SummaryProgressCallback};
pub use segment::{UnigramSegmenter, WordSegmenter};
