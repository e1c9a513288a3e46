//! Progress-callback trait for per-chunk summarisation events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummaryConfigBuilder::progress_callback`] to receive
//! events as tier-1 chunks are summarised and when the second tier runs.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfsum::{SummaryConfig, SummaryProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl SummaryProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, index: usize, total_chunks: usize, summary_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Chunk {}/{} done ({} bytes)", index + 1, total_chunks, summary_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = SummaryConfig::builder()
//!     .progress_callback(counter as Arc<dyn SummaryProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the tiered summariser as it processes each chunk.
///
/// Implementations must be `Send + Sync`: tier-1 chunks run concurrently,
/// so `on_chunk_*` methods may be called from different tasks at once.
/// All methods have default no-op implementations.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called once before the first chunk is submitted.
    fn on_summary_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called just before the first backend call for a chunk.
    ///
    /// `index` is 0-based.
    fn on_chunk_start(&self, index: usize, total_chunks: usize) {
        let _ = (index, total_chunks);
    }

    /// Called when a chunk is summarised.
    fn on_chunk_complete(&self, index: usize, total_chunks: usize, summary_len: usize) {
        let _ = (index, total_chunks, summary_len);
    }

    /// Called when a chunk fails after all attempts are exhausted.
    fn on_chunk_error(&self, index: usize, total_chunks: usize, error: &str) {
        let _ = (index, total_chunks, error);
    }

    /// Called when the joined tier-1 text exceeds backend capacity and the
    /// second tier is about to run.
    fn on_second_tier(&self, combined_tokens: usize) {
        let _ = combined_tokens;
    }

    /// Called once after tier 1 (and tier 2, if any) has finished.
    fn on_summary_complete(&self, total_chunks: usize, success_count: usize) {
        let _ = (total_chunks, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;
