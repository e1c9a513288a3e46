//! Document condensation entry points.
//!
//! [`Condenser`] owns the three collaborators a run needs (page source,
//! summary backend, word segmenter) and drives one document, one output
//! file, or a whole input directory through the pipeline. The free
//! functions at the bottom build a default condenser from a
//! [`SummaryConfig`] for one-off calls.
//!
//! Errors split the same way as everywhere else in the crate: anything that
//! prevents a document from being read or written is a fatal
//! [`SummaryError`]; chunk failures and a failed second tier are recorded in
//! the returned [`SummaryOutput`].

use crate::backend::{LlmBackend, SummaryBackend};
use crate::config::SummaryConfig;
use crate::document::{DocumentRenderer, MarkdownRenderer, RenderReport};
use crate::error::SummaryError;
use crate::ledger::ProcessedLedger;
use crate::output::{Page, PipelineReport, SummaryOutput, SummaryStats};
use crate::pipeline::pages::{PageSource, PdfiumPageSource};
use crate::pipeline::{chunk, extract, input, normalize, reintegrate, summarize};
use crate::segment::{UnigramSegmenter, WordSegmenter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Suffix added to the input stem for the summary file.
pub const OUTPUT_SUFFIX: &str = "_cond";

/// Suffix added to the input stem for the saved normalised prose.
pub const CLEANED_TEXT_SUFFIX: &str = "_cleaned";

/// Drives documents through extraction, summarisation and rendering.
pub struct Condenser {
    config: SummaryConfig,
    backend: Arc<dyn SummaryBackend>,
    source: Arc<dyn PageSource>,
    segmenter: Arc<dyn WordSegmenter>,
}

impl Condenser {
    /// Use the given backend and page source with the embedded English lexicon.
    pub fn new(
        config: SummaryConfig,
        backend: Arc<dyn SummaryBackend>,
        source: Arc<dyn PageSource>,
    ) -> Self {
        Self {
            config,
            backend,
            source,
            segmenter: UnigramSegmenter::english_shared().clone(),
        }
    }

    /// Resolve the LLM provider, load the tokenizer and open PDFs with pdfium.
    pub fn from_config(config: SummaryConfig) -> Result<Self, SummaryError> {
        let backend: Arc<dyn SummaryBackend> = Arc::new(LlmBackend::from_config(&config)?);
        let source: Arc<dyn PageSource> = Arc::new(PdfiumPageSource::new(config.password.clone()));
        Ok(Self::new(config, backend, source))
    }

    /// Replace the word segmenter, e.g. with one loaded from a custom lexicon.
    pub fn with_segmenter(mut self, segmenter: Arc<dyn WordSegmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Condense one PDF.
    ///
    /// When `cleaned_text_dir` is configured the normalised prose is saved
    /// there as `<stem>_cleaned.txt`; failing to save it is logged, not fatal.
    pub async fn condense(&self, path: &Path) -> Result<SummaryOutput, SummaryError> {
        let total_start = Instant::now();
        info!("Starting summary: {}", path.display());

        let pdf_path = input::resolve_local(path)?;
        let pages = self.source.pages(&pdf_path).await?;

        let mut output = condense_pages(
            pages,
            &self.backend,
            self.segmenter.as_ref(),
            &self.config,
        )
        .await;

        if let Some(ref dir) = self.config.cleaned_text_dir {
            let txt_path = derived_path(&pdf_path, dir, CLEANED_TEXT_SUFFIX, "txt");
            save_cleaned_text(&txt_path, &output.cleaned_text).await;
        }

        output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        info!(
            "Summary complete: {} page(s), {}/{} chunk(s), {}ms total",
            output.stats.total_pages,
            output.report.chunk_count - output.report.failed_chunks.len(),
            output.report.chunk_count,
            output.stats.total_duration_ms
        );
        Ok(output)
    }

    /// Condense one PDF and write the rendered summary to `output_path`.
    ///
    /// The file is written atomically (temp file + rename).
    pub async fn condense_to_file(
        &self,
        path: &Path,
        output_path: &Path,
    ) -> Result<SummaryOutput, SummaryError> {
        let mut output = self.condense(path).await?;

        let mut renderer = MarkdownRenderer::new()
            .with_title(format!("Summary of {}", input::file_name(path)))
            .ascii_only(self.config.ascii_only);
        let render = render_sections(&mut renderer, &output);
        if render.skipped > 0 {
            warn!(
                "{} line(s) could not be rendered and were left out",
                render.skipped
            );
        }
        output.report.skipped_lines = render.skipped;

        let target = output_path.to_path_buf();
        tokio::task::spawn_blocking(move || renderer.save(&target))
            .await
            .map_err(|e| SummaryError::Internal(format!("Save task panicked: {}", e)))??;

        Ok(output)
    }

    /// Condense every PDF in `input_dir` that `ledger` has not seen yet.
    ///
    /// Files run one after another. Each summary goes to
    /// `<output_dir>/<stem>_cond.md` and the file name is appended to the
    /// ledger only after that write succeeds. A document that fails is
    /// reported and left out of the ledger so the next run retries it.
    pub async fn condense_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        ledger: &mut ProcessedLedger,
    ) -> Result<BatchReport, SummaryError> {
        let pending = input::pending_pdfs(input_dir, ledger)?;
        let mut report = BatchReport::default();
        if pending.is_empty() {
            info!("No new PDFs to process in {}", input_dir.display());
            return Ok(report);
        }

        for (i, pdf) in pending.iter().enumerate() {
            let name = input::file_name(pdf);
            info!("[{}/{}] Processing '{}'", i + 1, pending.len(), name);
            let out_path = output_path_for(pdf, output_dir);

            match self.condense_to_file(pdf, &out_path).await {
                Ok(output) => {
                    ledger.mark_processed(&name)?;
                    report.processed.push(BatchItem {
                        input: pdf.clone(),
                        output: out_path,
                        failed_chunks: output.report.failed_chunks.len(),
                        used_sentinel: output.report.used_sentinel,
                    });
                }
                Err(e) => {
                    error!("'{}' failed: {}", name, e);
                    report.failed.push(BatchFailure {
                        input: pdf.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Batch complete: {} processed, {} failed",
            report.processed.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

/// Outcome of [`Condenser::condense_directory`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: Vec<BatchItem>,
    pub failed: Vec<BatchFailure>,
}

/// A document that was condensed and recorded in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub input: PathBuf,
    pub output: PathBuf,
    pub failed_chunks: usize,
    pub used_sentinel: bool,
}

/// A document that hit a fatal error; it stays out of the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub input: PathBuf,
    pub error: String,
}

/// Run the in-memory pipeline over already-extracted pages.
///
/// Extract → normalise → chunk → tiered summary → reintegrate. Never fails:
/// an empty document yields an empty summary, and backend failures are
/// recorded in the returned report.
pub async fn condense_pages(
    pages: Vec<Page>,
    backend: &Arc<dyn SummaryBackend>,
    segmenter: &dyn WordSegmenter,
    config: &SummaryConfig,
) -> SummaryOutput {
    let total_pages = pages.len();

    let extract_start = Instant::now();
    let extraction = extract::extract(pages);
    let cleaned_text = normalize::normalize(&extraction.prose, segmenter);
    let chunks = chunk::chunk(&cleaned_text, config.token_budget, backend.as_ref());
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    let chunk_count = chunks.len();
    let prose_tokens: usize = chunks.iter().map(|c| c.token_count).sum();
    let oversized_chunks = chunks
        .iter()
        .filter(|c| c.token_count > config.token_budget)
        .count();
    debug!(
        "Prepared {} chunk(s), {} prose tokens, {} oversized",
        chunk_count, prose_tokens, oversized_chunks
    );

    let summarize_start = Instant::now();
    let tiered = summarize::summarize_tiered(backend, chunks, config).await;
    let summarize_duration_ms = summarize_start.elapsed().as_millis() as u64;

    let text = reintegrate::reintegrate(
        &tiered.text,
        &extraction.code_units,
        &extraction.equation_units,
    );

    let mut failed_chunks: Vec<usize> = tiered
        .chunks
        .iter()
        .filter(|c| c.error.is_some())
        .map(|c| c.index)
        .collect();
    failed_chunks.sort_unstable();

    let report = PipelineReport {
        page_units: extraction.page_counts,
        skipped_pages: extraction.skipped_pages,
        chunk_count,
        oversized_chunks,
        failed_chunks,
        second_tier: tiered.second_tier,
        used_sentinel: tiered.used_sentinel,
        skipped_lines: 0,
    };

    let stats = SummaryStats {
        total_pages,
        prose_tokens,
        combined_tokens: tiered.combined_tokens,
        code_units: extraction.code_units.len(),
        equation_units: extraction.equation_units.len(),
        extract_duration_ms,
        summarize_duration_ms,
        total_duration_ms: extract_duration_ms + summarize_duration_ms,
    };

    SummaryOutput {
        text,
        summary: tiered.text,
        cleaned_text,
        code_units: extraction.code_units,
        equation_units: extraction.equation_units,
        chunks: tiered.chunks,
        report,
        stats,
    }
}

/// Feed the sections of [`SummaryOutput::text`] to `renderer` one by one,
/// so code units can be rendered as code.
fn render_sections<R>(renderer: &mut R, output: &SummaryOutput) -> RenderReport
where
    R: DocumentRenderer + ?Sized,
{
    let mut report = renderer.add_text(&reintegrate::sanitize(&output.summary));
    if !output.code_units.is_empty() {
        report += renderer.add_text(&format!("# {}", reintegrate::CODE_HEADING));
        for unit in &output.code_units {
            report += renderer.add_code_block(&unit.content);
        }
    }
    if !output.equation_units.is_empty() {
        report += renderer.add_text(&format!("# {}", reintegrate::EQUATION_HEADING));
        for unit in &output.equation_units {
            report += renderer.add_text(&unit.content);
        }
    }
    report
}

/// `<output_dir>/<stem>_cond.md` for an input PDF.
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    derived_path(input, output_dir, OUTPUT_SUFFIX, "md")
}

fn derived_path(input: &Path, dir: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    dir.join(format!("{stem}{suffix}.{extension}"))
}

async fn save_cleaned_text(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            warn!("Failed to create '{}': {}", parent.display(), e);
            return;
        }
    }
    match tokio::fs::write(path, text).await {
        Ok(()) => info!("Cleaned text saved to '{}'", path.display()),
        Err(e) => warn!("Failed to save cleaned text '{}': {}", path.display(), e),
    }
}

// ── One-off entry points ─────────────────────────────────────────────────

/// Condense a PDF with a default [`Condenser`] built from `config`.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdfsum::{condense, SummaryConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SummaryConfig::default();
/// let output = condense("paper.pdf", &config).await?;
/// println!("{}", output.text);
/// # Ok(())
/// # }
/// ```
pub async fn condense(
    path: impl AsRef<Path>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    Condenser::from_config(config.clone())?
        .condense(path.as_ref())
        .await
}

/// Condense a PDF and write the summary to `output_path`.
pub async fn condense_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    Condenser::from_config(config.clone())?
        .condense_to_file(path.as_ref(), output_path.as_ref())
        .await
}

/// Synchronous wrapper around [`condense`].
///
/// Creates a temporary tokio runtime internally.
pub fn condense_sync(
    path: impl AsRef<Path>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SummaryError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(condense(path, config))
}
