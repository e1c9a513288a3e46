//! Data carried between pipeline stages and returned to callers.
//!
//! Every stage consumes its input and returns a new owned value, so these
//! types are plain data: no interior mutability, no back-references.

use crate::error::ChunkError;
use serde::{Deserialize, Serialize};

/// Text of one document page as produced by a [`crate::pipeline::pages::PageSource`].
///
/// `text` is `None` (or empty) for pages without a text layer. Such pages
/// are skipped by the extractor, never treated as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 0-based page index within the document.
    pub index: usize,
    pub text: Option<String>,
}

impl Page {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: Some(text.into()),
        }
    }

    /// A page with no extractable text.
    pub fn blank(index: usize) -> Self {
        Self { index, text: None }
    }

    /// The page text, if it has any non-empty content.
    pub fn content(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// What kind of region an [`ExtractedUnit`] was lifted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    Code,
    Equation,
}

/// A code block or equation removed from the prose before summarisation.
///
/// Units are immutable once created and keep extraction order: by match
/// order within a page, then by page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedUnit {
    pub kind: UnitKind,
    /// Matched region, trimmed of surrounding whitespace.
    pub content: String,
    /// 0-based index of the page the unit came from.
    pub source_page: usize,
}

/// A sentence-aligned slice of prose sized for one backend call.
///
/// `token_count` is measured with the backend's own counter and is reused
/// for the length window, so chunking and summarisation never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub token_count: usize,
}

/// Result of summarising one chunk in tier 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSummary {
    /// Position of the source chunk in reading order.
    pub index: usize,
    /// Summary text; empty when every attempt failed.
    pub text: String,
    /// Token count of the source chunk.
    pub input_tokens: usize,
    /// Backend calls made for this chunk (1 on first-try success).
    pub attempts: u32,
    pub duration_ms: u64,
    pub error: Option<ChunkError>,
}

impl ChunkSummary {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && !self.text.is_empty()
    }
}

/// Number of units extracted from one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageUnitCount {
    pub page: usize,
    pub code: usize,
    pub equations: usize,
}

/// Structured record of what happened during a run.
///
/// Returned with every [`SummaryOutput`] so callers (and tests) can inspect
/// the pipeline without installing a log subscriber.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Per-page extracted-unit counts, for pages that had text.
    pub page_units: Vec<PageUnitCount>,
    /// 0-based indices of pages with no text layer.
    pub skipped_pages: Vec<usize>,
    pub chunk_count: usize,
    /// Chunks holding a single sentence larger than the token budget.
    pub oversized_chunks: usize,
    /// Indices of chunks whose summary was dropped after all attempts.
    pub failed_chunks: Vec<usize>,
    /// Whether the combined tier-1 text exceeded backend capacity.
    pub second_tier: bool,
    /// Whether the second tier failed and the sentinel string was used.
    pub used_sentinel: bool,
    /// Output lines the renderer refused. Zero when nothing was rendered.
    #[serde(default)]
    pub skipped_lines: usize,
}

/// Timing and token totals for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_pages: usize,
    pub prose_tokens: usize,
    /// Token count of the joined tier-1 output.
    pub combined_tokens: usize,
    pub code_units: usize,
    pub equation_units: usize,
    pub extract_duration_ms: u64,
    pub summarize_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything produced by one document run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    /// Final text: sanitised summary plus reintegrated code and equations.
    pub text: String,
    /// Summary as returned by the tiered summariser, before reintegration.
    pub summary: String,
    /// Normalised prose that was chunked, without code or equations.
    pub cleaned_text: String,
    pub code_units: Vec<ExtractedUnit>,
    pub equation_units: Vec<ExtractedUnit>,
    /// Tier-1 results in the order they were joined.
    pub chunks: Vec<ChunkSummary>,
    pub report: PipelineReport,
    pub stats: SummaryStats,
}
