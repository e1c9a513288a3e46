//! Tiered summarisation: per-chunk summaries, then an optional condensing pass.
//!
//! ## Tier 1
//!
//! Every chunk is summarised independently with at most `concurrency` calls
//! in flight. Each call asks for a length window proportional to the chunk's
//! token count (`ratios.first_*`). A failed call is retried up to
//! `retry.max_attempts` times in total, sleeping `retry.delay` between
//! attempts; the sleep holds only that chunk's slot. A chunk that never
//! succeeds contributes nothing and the document carries on.
//!
//! ## Tier 2
//!
//! The successful tier-1 summaries are joined with single spaces. Only if
//! the result is larger than the backend's input capacity is it condensed
//! once more (`ratios.second_*`). That pass is not retried; if it fails the
//! whole summary becomes the configured sentinel string.

use crate::backend::{LengthWindow, SummaryBackend};
use crate::config::{CollectionOrder, LengthRatios, RetryPolicy, SummaryConfig};
use crate::error::{BackendError, ChunkError};
use crate::output::{Chunk, ChunkSummary};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Result of [`summarize_tiered`].
#[derive(Debug, Clone)]
pub struct TieredSummary {
    /// Final summary text (tier 1 joined, tier 2 output, or the sentinel).
    pub text: String,
    /// Tier-1 results in joining order.
    pub chunks: Vec<ChunkSummary>,
    /// Token count of the joined tier-1 text.
    pub combined_tokens: usize,
    pub second_tier: bool,
    pub used_sentinel: bool,
}

/// Summarise one chunk with bounded retry.
///
/// Never returns an error: exhaustion is recorded in [`ChunkSummary::error`]
/// with an empty `text`.
pub async fn summarize_chunk(
    backend: &dyn SummaryBackend,
    index: usize,
    chunk: &Chunk,
    ratios: LengthRatios,
    retry: RetryPolicy,
) -> ChunkSummary {
    let start = Instant::now();
    let window = LengthWindow::proportional(chunk.token_count, ratios.first_min, ratios.first_max);
    debug!(
        "Chunk {}: {} tokens (min: {}, max: {})",
        index, chunk.token_count, window.min, window.max
    );

    let mut last_err: Option<BackendError> = None;

    for attempt in 1..=retry.max_attempts {
        if attempt > 1 {
            warn!(
                "Chunk {}: retry {}/{} after {:?}",
                index, attempt, retry.max_attempts, retry.delay
            );
            sleep(retry.delay).await;
        }

        match backend.summarize(&chunk.text, window).await {
            Ok(summary) if !summary.trim().is_empty() => {
                return ChunkSummary {
                    index,
                    text: summary.trim().to_string(),
                    input_tokens: chunk.token_count,
                    attempts: attempt,
                    duration_ms: start.elapsed().as_millis() as u64,
                    error: None,
                };
            }
            Ok(_) => {
                warn!("Chunk {}: attempt {} returned an empty summary", index, attempt);
                last_err = Some(BackendError::EmptyResponse);
            }
            Err(e) => {
                warn!("Chunk {}: attempt {} failed: {}", index, attempt, e);
                last_err = Some(e);
            }
        }
    }

    let detail = last_err
        .map(|e| e.to_string())
        .unwrap_or_else(|| "Unknown error".to_string());
    error!(
        "Chunk {}: giving up after {} attempts, chunk skipped",
        index, retry.max_attempts
    );

    ChunkSummary {
        index,
        text: String::new(),
        input_tokens: chunk.token_count,
        attempts: retry.max_attempts,
        duration_ms: start.elapsed().as_millis() as u64,
        error: Some(ChunkError::Exhausted {
            index,
            attempts: retry.max_attempts,
            detail,
        }),
    }
}

/// Run tier 1 over `chunks` and, if needed, tier 2 over the joined result.
pub async fn summarize_tiered(
    backend: &Arc<dyn SummaryBackend>,
    chunks: Vec<Chunk>,
    config: &SummaryConfig,
) -> TieredSummary {
    let total = chunks.len();
    let progress = config.progress_callback.clone();
    if let Some(ref cb) = progress {
        cb.on_summary_start(total);
    }
    info!(
        "Tier 1: summarising {} chunk(s), {} at a time",
        total, config.concurrency
    );

    let results = run_first_tier(backend, chunks, config).await;
    let success_count = results.iter().filter(|r| r.is_success()).count();

    let combined = results
        .iter()
        .filter(|r| !r.text.is_empty())
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let combined_tokens = backend.count_tokens(&combined);
    info!(
        "Tier 1 complete: {}/{} chunk(s) summarised, {} combined tokens",
        success_count, total, combined_tokens
    );

    let capacity = backend.max_input_tokens();
    let mut summary = TieredSummary {
        text: combined,
        chunks: results,
        combined_tokens,
        second_tier: false,
        used_sentinel: false,
    };

    if combined_tokens > capacity {
        warn!(
            "Combined summary exceeds backend capacity ({} > {} tokens), running tier 2",
            combined_tokens, capacity
        );
        if let Some(ref cb) = progress {
            cb.on_second_tier(combined_tokens);
        }
        summary.second_tier = true;

        let window = LengthWindow::proportional(
            combined_tokens,
            config.ratios.second_min,
            config.ratios.second_max,
        );
        match backend.summarize(&summary.text, window).await {
            Ok(text) if !text.trim().is_empty() => {
                info!("Tier 2 complete");
                summary.text = text.trim().to_string();
            }
            Ok(_) => {
                error!("Tier 2 returned an empty summary, using placeholder");
                summary.text = config.failure_sentinel.clone();
                summary.used_sentinel = true;
            }
            Err(e) => {
                error!("Tier 2 failed: {}, using placeholder", e);
                summary.text = config.failure_sentinel.clone();
                summary.used_sentinel = true;
            }
        }
    } else {
        debug!("Combined summary within capacity, no second tier");
    }

    if let Some(ref cb) = progress {
        cb.on_summary_complete(total, success_count);
    }
    summary
}

/// Tier 1 with at most `config.concurrency` chunks in flight.
async fn run_first_tier(
    backend: &Arc<dyn SummaryBackend>,
    chunks: Vec<Chunk>,
    config: &SummaryConfig,
) -> Vec<ChunkSummary> {
    let total = chunks.len();
    let ratios = config.ratios;
    let retry = config.retry;

    let tasks = chunks.into_iter().enumerate().map(|(index, chunk)| {
        let backend = Arc::clone(backend);
        let progress = config.progress_callback.clone();
        async move {
            if let Some(ref cb) = progress {
                cb.on_chunk_start(index, total);
            }
            let result = summarize_chunk(backend.as_ref(), index, &chunk, ratios, retry).await;
            if let Some(ref cb) = progress {
                match &result.error {
                    None => cb.on_chunk_complete(index, total, result.text.len()),
                    Some(e) => cb.on_chunk_error(index, total, &e.to_string()),
                }
            }
            result
        }
    });

    let concurrency = config.concurrency.max(1);
    match config.collection_order {
        CollectionOrder::Indexed => stream::iter(tasks).buffered(concurrency).collect().await,
        CollectionOrder::Completion => {
            stream::iter(tasks)
                .buffer_unordered(concurrency)
                .collect()
                .await
        }
    }
}
