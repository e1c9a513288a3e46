//! Integration tests for the summarisation pipeline.
//!
//! Every test runs against scripted in-process collaborators: a
//! [`ScriptedBackend`] that counts one token per word and answers through a
//! closure, and page sources that serve fixed text. No PDF library, network
//! or API key is needed.

use async_trait::async_trait;
use edgequake_pdfsum::{
    condense_pages, BackendError, CollectionOrder, Condenser, LengthWindow, Page, PageSource,
    ProcessedLedger, RetryPolicy, SummaryBackend, SummaryConfig, SummaryError,
    SummaryProgressCallback, TokenCounter, WordSegmenter,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

type Responder = Box<dyn Fn(&str) -> Result<String, BackendError> + Send + Sync>;

/// One token per whitespace-separated word; answers via `respond`.
struct ScriptedBackend {
    capacity: usize,
    respond: Responder,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, LengthWindow)>>,
}

impl ScriptedBackend {
    fn new(
        capacity: usize,
        respond: impl Fn(&str) -> Result<String, BackendError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            capacity,
            respond: Box::new(respond),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleep `delay` before answering any input starting with `first_word`.
    fn delay(mut self, first_word: &str, delay: Duration) -> Self {
        self.delays.insert(first_word.to_string(), delay);
        self
    }

    fn calls(&self) -> Vec<(String, LengthWindow)> {
        self.calls.lock().unwrap().clone()
    }
}

impl TokenCounter for ScriptedBackend {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

#[async_trait]
impl SummaryBackend for ScriptedBackend {
    fn max_input_tokens(&self) -> usize {
        self.capacity
    }

    async fn summarize(&self, text: &str, window: LengthWindow) -> Result<String, BackendError> {
        self.calls.lock().unwrap().push((text.to_string(), window));
        let first = text.split_whitespace().next().unwrap_or("");
        if let Some(delay) = self.delays.get(first) {
            tokio::time::sleep(*delay).await;
        }
        (self.respond)(text)
    }
}

/// Keeps every token whole.
struct NoSplit;

impl WordSegmenter for NoSplit {
    fn segment(&self, token: &str) -> Vec<String> {
        vec![token.to_string()]
    }
}

/// Serves pages by file name; unknown names are corrupt PDFs.
struct MapSource(HashMap<String, Vec<Page>>);

#[async_trait]
impl PageSource for MapSource {
    async fn pages(&self, path: &Path) -> Result<Vec<Page>, SummaryError> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.0
            .get(&name)
            .cloned()
            .ok_or_else(|| SummaryError::CorruptPdf {
                path: path.to_path_buf(),
                detail: "scripted failure".into(),
            })
    }
}

fn first_word(text: &str) -> Result<String, BackendError> {
    Ok(text.split_whitespace().next().unwrap_or("").to_string())
}

fn test_config() -> SummaryConfig {
    SummaryConfig::builder()
        .retry(RetryPolicy::immediate(3))
        .concurrency(4)
        .build()
        .unwrap()
}

fn as_backend(b: &Arc<ScriptedBackend>) -> Arc<dyn SummaryBackend> {
    Arc::clone(b) as Arc<dyn SummaryBackend>
}

fn write_fake_pdf(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"%PDF-1.7\n% scripted\n").unwrap();
    path
}

// ── Core pipeline ────────────────────────────────────────────────────────────

#[tokio::test]
async fn code_and_equations_survive_summarisation() {
    let backend = Arc::new(ScriptedBackend::new(1000, |t| {
        first_word(t).map(|w| format!("S:{w}"))
    }));
    let pages = vec![
        Page::new(
            0,
            "Intro sentence one. Intro sentence two.\n```print(1)```\nMore text here.",
        ),
        Page::blank(1),
        Page::new(2, "Energy is $E = mc^2$ today. Final words."),
    ];

    let out = condense_pages(pages, &as_backend(&backend), &NoSplit, &test_config()).await;

    assert_eq!(
        out.text,
        "S:Intro\n\n# Code Blocks\nprint(1)\n\n# Equations\nE = mc^2"
    );
    assert_eq!(out.summary, "S:Intro");
    assert!(!out.cleaned_text.contains("print(1)"));
    assert!(!out.cleaned_text.contains("mc^2"));
    assert!(out.cleaned_text.contains("Energy is today."));

    // the model only ever saw prose
    for (input, _) in backend.calls() {
        assert!(!input.contains("print(1)") && !input.contains('$'));
    }

    assert_eq!(out.report.skipped_pages, vec![1]);
    assert_eq!(out.report.page_units.len(), 2);
    assert_eq!(out.report.chunk_count, 1);
    assert!(!out.report.second_tier);
    assert_eq!(out.stats.code_units, 1);
    assert_eq!(out.stats.equation_units, 1);
    assert_eq!(out.stats.total_pages, 3);
}

#[tokio::test]
async fn indexed_order_survives_out_of_order_completion() {
    let backend = Arc::new(
        ScriptedBackend::new(1000, first_word)
            .delay("Alpha", Duration::from_millis(150))
            .delay("Bravo", Duration::from_millis(100))
            .delay("Charlie", Duration::from_millis(50)),
    );
    let pages = vec![Page::new(0, "Alpha one. Bravo two. Charlie three. Delta four.")];
    let config = SummaryConfig::builder()
        .token_budget(2)
        .retry(RetryPolicy::immediate(1))
        .concurrency(4)
        .build()
        .unwrap();

    let out = condense_pages(pages, &as_backend(&backend), &NoSplit, &config).await;

    assert_eq!(out.report.chunk_count, 4);
    assert_eq!(out.summary, "Alpha Bravo Charlie Delta");
    let indices: Vec<usize> = out.chunks.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn completion_order_keeps_every_summary() {
    let backend = Arc::new(
        ScriptedBackend::new(1000, first_word).delay("Alpha", Duration::from_millis(100)),
    );
    let pages = vec![Page::new(0, "Alpha one. Bravo two. Charlie three.")];
    let config = SummaryConfig::builder()
        .token_budget(2)
        .retry(RetryPolicy::immediate(1))
        .concurrency(3)
        .collection_order(CollectionOrder::Completion)
        .build()
        .unwrap();

    let out = condense_pages(pages, &as_backend(&backend), &NoSplit, &config).await;

    let mut words: Vec<&str> = out.summary.split(' ').collect();
    words.sort_unstable();
    assert_eq!(words, vec!["Alpha", "Bravo", "Charlie"]);
}

#[tokio::test]
async fn always_failing_backend_is_called_exactly_max_attempts_per_chunk() {
    let backend = Arc::new(ScriptedBackend::new(1000, |_| {
        Err(BackendError::Call("503 Service Unavailable".into()))
    }));
    let pages = vec![Page::new(0, "One two three. Four five six. Seven eight nine.")];
    let config = SummaryConfig::builder()
        .token_budget(3)
        .retry(RetryPolicy::immediate(3))
        .build()
        .unwrap();

    let out = condense_pages(pages, &as_backend(&backend), &NoSplit, &config).await;

    assert_eq!(backend.calls().len(), 9);
    assert_eq!(out.report.failed_chunks, vec![0, 1, 2]);
    assert!(out.chunks.iter().all(|c| c.text.is_empty() && c.attempts == 3));
    assert_eq!(out.summary, "");
    assert!(!out.report.second_tier);
}

#[tokio::test]
async fn one_failed_chunk_does_not_sink_the_document() {
    let backend = Arc::new(ScriptedBackend::new(1000, |t| {
        if t.starts_with("Four") {
            Err(BackendError::EmptyResponse)
        } else {
            first_word(t)
        }
    }));
    let pages = vec![Page::new(0, "One two three. Four five six. Seven eight nine.")];
    let config = SummaryConfig::builder()
        .token_budget(3)
        .retry(RetryPolicy::immediate(2))
        .build()
        .unwrap();

    let out = condense_pages(pages, &as_backend(&backend), &NoSplit, &config).await;

    assert_eq!(out.summary, "One Seven");
    assert_eq!(out.report.failed_chunks, vec![1]);
    assert_eq!(out.chunks[1].attempts, 2);
}

#[tokio::test]
async fn failed_chunks_are_reported_in_index_order() {
    let backend = Arc::new(
        ScriptedBackend::new(1000, |t| {
            if t.starts_with("Alpha") || t.starts_with("Charlie") {
                Err(BackendError::Call("overloaded".into()))
            } else {
                first_word(t)
            }
        })
        .delay("Alpha", Duration::from_millis(100)),
    );
    let pages = vec![Page::new(0, "Alpha one. Bravo two. Charlie three.")];
    let config = SummaryConfig::builder()
        .token_budget(2)
        .retry(RetryPolicy::immediate(1))
        .concurrency(3)
        .collection_order(CollectionOrder::Completion)
        .build()
        .unwrap();

    let out = condense_pages(pages, &as_backend(&backend), &NoSplit, &config).await;

    assert_eq!(out.summary, "Bravo");
    assert_eq!(out.report.failed_chunks, vec![0, 2]);
}

// ── Second tier ──────────────────────────────────────────────────────────────

fn identity_or_condense(text: &str) -> Result<String, BackendError> {
    if text.split_whitespace().count() > 3 {
        Ok("CONDENSED".to_string())
    } else {
        Ok(text.to_string())
    }
}

#[tokio::test]
async fn second_tier_runs_only_above_capacity() {
    let pages = || vec![Page::new(0, "One two three. Four five six. Seven eight nine.")];
    let config = SummaryConfig::builder()
        .token_budget(3)
        .retry(RetryPolicy::immediate(1))
        .build()
        .unwrap();

    // within capacity: tier-1 output is returned as-is
    let roomy = Arc::new(ScriptedBackend::new(100, identity_or_condense));
    let out = condense_pages(pages(), &as_backend(&roomy), &NoSplit, &config).await;
    assert!(!out.report.second_tier);
    assert_eq!(out.summary, "One two three. Four five six. Seven eight nine.");
    assert_eq!(roomy.calls().len(), 3);

    // above capacity: one more pass over the joined text
    let tight = Arc::new(ScriptedBackend::new(5, identity_or_condense));
    let out = condense_pages(pages(), &as_backend(&tight), &NoSplit, &config).await;
    assert!(out.report.second_tier);
    assert!(!out.report.used_sentinel);
    assert_eq!(out.summary, "CONDENSED");
    assert_eq!(out.stats.combined_tokens, 9);

    let calls = tight.calls();
    assert_eq!(calls.len(), 4);
    let (input, window) = &calls[3];
    assert_eq!(input, "One two three. Four five six. Seven eight nine.");
    assert_eq!(*window, LengthWindow { min: 5, max: 7 });
}

#[tokio::test]
async fn second_tier_failure_yields_sentinel() {
    let backend = Arc::new(ScriptedBackend::new(5, |t| {
        if t.split_whitespace().count() > 3 {
            Err(BackendError::Call("context length exceeded".into()))
        } else {
            Ok(t.to_string())
        }
    }));
    let pages = vec![Page::new(0, "One two three. Four five six.\n```x = 1```")];
    let config = SummaryConfig::builder()
        .token_budget(3)
        .retry(RetryPolicy::immediate(3))
        .build()
        .unwrap();

    let out = condense_pages(pages, &as_backend(&backend), &NoSplit, &config).await;

    assert!(out.report.second_tier);
    assert!(out.report.used_sentinel);
    assert_eq!(out.summary, "Summary could not be generated.");
    assert_eq!(
        out.text,
        "Summary could not be generated.\n\n# Code Blocks\nx = 1"
    );
    // tier 2 is a single attempt
    assert_eq!(backend.calls().len(), 3);
}

// ── Edge cases ───────────────────────────────────────────────────────────────

#[test]
fn document_without_text_makes_no_backend_calls() {
    let backend = Arc::new(ScriptedBackend::new(1000, first_word));
    let pages = vec![Page::blank(0), Page::new(1, "")];

    let out = tokio_test::block_on(condense_pages(
        pages,
        &as_backend(&backend),
        &NoSplit,
        &test_config(),
    ));

    assert_eq!(out.text, "");
    assert_eq!(out.report.chunk_count, 0);
    assert_eq!(out.report.skipped_pages, vec![0, 1]);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn progress_callback_sees_every_chunk() {
    #[derive(Default)]
    struct Counter {
        started: AtomicUsize,
        completed: AtomicUsize,
        failed: AtomicUsize,
        finished: AtomicUsize,
    }

    impl SummaryProgressCallback for Counter {
        fn on_chunk_start(&self, _: usize, _: usize) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn on_chunk_complete(&self, _: usize, _: usize, _: usize) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_chunk_error(&self, _: usize, _: usize, _: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_summary_complete(&self, total: usize, success: usize) {
            self.finished.store(total * 10 + success, Ordering::SeqCst);
        }
    }

    let counter = Arc::new(Counter::default());
    let backend = Arc::new(ScriptedBackend::new(1000, |t| {
        if t.starts_with("Bravo") {
            Err(BackendError::Call("nope".into()))
        } else {
            first_word(t)
        }
    }));
    let config = SummaryConfig::builder()
        .token_budget(2)
        .retry(RetryPolicy::immediate(1))
        .progress_callback(Arc::clone(&counter) as Arc<dyn SummaryProgressCallback>)
        .build()
        .unwrap();
    let pages = vec![Page::new(0, "Alpha one. Bravo two. Charlie three.")];

    condense_pages(pages, &as_backend(&backend), &NoSplit, &config).await;

    assert_eq!(counter.started.load(Ordering::SeqCst), 3);
    assert_eq!(counter.completed.load(Ordering::SeqCst), 2);
    assert_eq!(counter.failed.load(Ordering::SeqCst), 1);
    assert_eq!(counter.finished.load(Ordering::SeqCst), 32);
}

// ── Files, directories and the ledger ────────────────────────────────────────

fn scripted_condenser(config: SummaryConfig) -> Condenser {
    let mut pages = HashMap::new();
    pages.insert(
        "alpha.pdf".to_string(),
        vec![Page::new(
            0,
            "Alpha document text. It has code.\n```\n# setup\nlet a = 1;\n```",
        )],
    );
    pages.insert(
        "bravo.pdf".to_string(),
        vec![Page::new(0, "Bravo document text with $x^2$ inside.")],
    );
    let backend: Arc<dyn SummaryBackend> = Arc::new(ScriptedBackend::new(1000, first_word));
    let source: Arc<dyn PageSource> = Arc::new(MapSource(pages));
    Condenser::new(config, backend, source).with_segmenter(Arc::new(NoSplit))
}

#[tokio::test]
async fn condense_to_file_writes_rendered_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fake_pdf(dir.path(), "alpha.pdf");
    let out_path = dir.path().join("out").join("alpha_cond.md");

    let condenser = scripted_condenser(test_config());
    let output = condenser.condense_to_file(&input, &out_path).await.unwrap();

    assert_eq!(output.text, "Alpha\n\n# Code Blocks\n# setup\nlet a = 1;");

    // code is fenced so a `#` comment cannot turn into a heading
    let written = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(
        written,
        "# Summary of alpha.pdf\n\nAlpha\n# Code Blocks\n```\n# setup\nlet a = 1;\n```\n"
    );
    assert_eq!(output.report.skipped_lines, 0);
}

#[tokio::test]
async fn non_pdf_input_is_rejected_before_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("alpha.pdf");
    std::fs::write(&input, b"not a pdf at all").unwrap();

    let err = scripted_condenser(test_config())
        .condense(&input)
        .await
        .unwrap_err();
    assert!(matches!(err, SummaryError::NotAPdf { .. }));
}

#[tokio::test]
async fn cleaned_text_is_saved_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fake_pdf(dir.path(), "bravo.pdf");
    let cleaned_dir = dir.path().join("cleaned");
    let config = SummaryConfig::builder()
        .retry(RetryPolicy::immediate(1))
        .cleaned_text_dir(&cleaned_dir)
        .build()
        .unwrap();

    let output = scripted_condenser(config).condense(&input).await.unwrap();

    let saved = std::fs::read_to_string(cleaned_dir.join("bravo_cleaned.txt")).unwrap();
    assert_eq!(saved, output.cleaned_text);
    assert_eq!(saved, "Bravo document text with inside.");
}

#[tokio::test]
async fn batch_run_marks_only_successful_documents() {
    let dir = tempfile::tempdir().unwrap();
    let input_dir = dir.path().join("pdfs");
    let output_dir = dir.path().join("summaries");
    std::fs::create_dir(&input_dir).unwrap();
    write_fake_pdf(&input_dir, "alpha.pdf");
    write_fake_pdf(&input_dir, "bravo.pdf");
    write_fake_pdf(&input_dir, "corrupt.pdf");
    std::fs::write(input_dir.join("notes.txt"), "ignored").unwrap();

    let ledger_path = dir.path().join("processed_pdfs.txt");
    let condenser = scripted_condenser(test_config());

    let mut ledger = ProcessedLedger::open(&ledger_path).unwrap();
    let report = condenser
        .condense_directory(&input_dir, &output_dir, &mut ledger)
        .await
        .unwrap();

    assert_eq!(report.processed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].input.ends_with("corrupt.pdf"));
    assert!(output_dir.join("alpha_cond.md").exists());
    assert!(output_dir.join("bravo_cond.md").exists());
    assert!(!output_dir.join("corrupt_cond.md").exists());
    assert_eq!(
        std::fs::read_to_string(&ledger_path).unwrap(),
        "alpha.pdf\nbravo.pdf\n"
    );

    // a second run only retries the failure
    let mut ledger = ProcessedLedger::open(&ledger_path).unwrap();
    let again = condenser
        .condense_directory(&input_dir, &output_dir, &mut ledger)
        .await
        .unwrap();
    assert!(again.processed.is_empty());
    assert_eq!(again.failed.len(), 1);
}
