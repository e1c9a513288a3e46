//! CLI binary for edgequake-pdfsum.
//!
//! A thin shim over the library crate: flags and an optional TOML file are
//! merged (flags win) and mapped onto `SummaryConfig`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_pdfsum::{
    output_path_for, CollectionOrder, Condenser, LengthRatios, ProcessedLedger, ProgressCallback,
    SummaryConfig, SummaryOutput, SummaryProgressCallback, UnigramSegmenter,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live chunk counter for tier 1. Chunks may finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Summarising");
        self.bar.enable_steady_tick(Duration::from_millis(80));
        self.errors.store(0, Ordering::SeqCst);
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_summary_start(&self, total_chunks: usize) {
        self.activate_bar(total_chunks);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Summarising {total_chunks} chunk(s)…"))
        ));
    }

    fn on_chunk_start(&self, index: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(index, Instant::now());
        self.bar.set_message(format!("chunk {}", index + 1));
    }

    fn on_chunk_complete(&self, index: usize, total: usize, summary_len: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{summary_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_second_tier(&self, combined_tokens: usize) {
        self.bar.set_prefix("Condensing");
        self.bar
            .set_message(format!("second pass over {combined_tokens} tokens"));
    }

    fn on_summary_complete(&self, total_chunks: usize, success_count: usize) {
        let failed = total_chunks.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} chunk(s) summarised",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} chunk(s) summarised  ({} dropped)",
                if failed == total_chunks {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_chunks,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise one PDF to stdout
  pdfsum paper.pdf

  # Summarise to a file
  pdfsum paper.pdf -o paper_cond.md

  # Batch: every new PDF in ./pdfs, summaries in ./summaries
  pdfsum --input-dir pdfs --output-dir summaries

  # Batch with settings from a file (flags still win)
  pdfsum --config pdfsum.toml --concurrency 2

  # Smaller chunks, a specific model, JSON report
  pdfsum --token-budget 512 --model gpt-4.1-mini --json paper.pdf > paper.json

CONFIG FILE (TOML, every key optional):
  input_dir        = "pdfs"
  output_dir       = "summaries"
  ledger           = "processed_pdfs.txt"
  cleaned_text_dir = "cleaned_texts"
  model            = "gpt-4.1-nano"
  token_budget     = 1024
  first_min_ratio  = 0.25
  first_max_ratio  = 0.45
  second_min_ratio = 0.60
  second_max_ratio = 0.80
  max_attempts     = 3
  retry_delay_ms   = 3000
  order            = "indexed"

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_DIR          Directory containing libpdfium (default: system search path)
  PDFSUM_*                Fallback for every flag, e.g. PDFSUM_TOKEN_BUDGET=512
"#;

/// Condense PDF documents into summaries that keep code and equations verbatim.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsum",
    version,
    about = "Condense PDF documents into summaries that keep code and equations verbatim",
    long_about = "Summarise long PDF documents with an LLM. Code blocks and equations are \
lifted out before summarisation and appended unchanged. Works on one file or on every \
unprocessed PDF in a directory.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to summarise (omit when using --input-dir).
    input: Option<PathBuf>,

    /// Write the summary to this file instead of stdout.
    #[arg(short, long, env = "PDFSUM_OUTPUT", conflicts_with = "input_dir")]
    output: Option<PathBuf>,

    /// Summarise every unprocessed PDF in this directory.
    #[arg(long, env = "PDFSUM_INPUT_DIR", conflicts_with = "input")]
    input_dir: Option<PathBuf>,

    /// Directory for `<name>_cond.md` summaries.
    #[arg(long, env = "PDFSUM_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Processed-file ledger (default: <output-dir>/processed_pdfs.txt).
    #[arg(long, env = "PDFSUM_LEDGER")]
    ledger: Option<PathBuf>,

    /// TOML file with default settings.
    #[arg(long, env = "PDFSUM_CONFIG")]
    config: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-nano, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Maximum tokens per chunk.
    #[arg(long, env = "PDFSUM_TOKEN_BUDGET")]
    token_budget: Option<usize>,

    /// Backend input capacity; longer tier-1 output triggers a second pass.
    #[arg(long, env = "PDFSUM_MAX_INPUT_TOKENS")]
    max_input_tokens: Option<usize>,

    /// Tier-1 minimum output ratio.
    #[arg(long, env = "PDFSUM_FIRST_MIN_RATIO")]
    first_min_ratio: Option<f64>,

    /// Tier-1 maximum output ratio.
    #[arg(long, env = "PDFSUM_FIRST_MAX_RATIO")]
    first_max_ratio: Option<f64>,

    /// Tier-2 minimum output ratio.
    #[arg(long, env = "PDFSUM_SECOND_MIN_RATIO")]
    second_min_ratio: Option<f64>,

    /// Tier-2 maximum output ratio.
    #[arg(long, env = "PDFSUM_SECOND_MAX_RATIO")]
    second_max_ratio: Option<f64>,

    /// Number of chunks summarised concurrently.
    #[arg(short, long, env = "PDFSUM_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Backend calls per chunk before it is dropped.
    #[arg(long, env = "PDFSUM_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    /// Delay between attempts, in milliseconds.
    #[arg(long, env = "PDFSUM_RETRY_DELAY_MS")]
    retry_delay_ms: Option<u64>,

    /// How tier-1 summaries are joined: indexed (reading order) or completion.
    #[arg(long, env = "PDFSUM_ORDER", value_enum)]
    order: Option<OrderArg>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDFSUM_TEMPERATURE")]
    temperature: Option<f32>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDFSUM_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Word lexicon (`word count` per line) for glued-word repair.
    #[arg(long, env = "PDFSUM_LEXICON")]
    lexicon: Option<PathBuf>,

    /// Save the normalised prose of each document in this directory.
    #[arg(long, env = "PDFSUM_CLEANED_TEXT_DIR")]
    cleaned_text_dir: Option<PathBuf>,

    /// Strip non-ASCII characters from written summaries.
    #[arg(long, env = "PDFSUM_ASCII_ONLY")]
    ascii_only: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFSUM_PASSWORD")]
    password: Option<String>,

    /// Output structured JSON instead of the summary text.
    #[arg(long, env = "PDFSUM_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFSUM_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFSUM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFSUM_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrderArg {
    Indexed,
    Completion,
}

impl From<OrderArg> for CollectionOrder {
    fn from(v: OrderArg) -> Self {
        match v {
            OrderArg::Indexed => CollectionOrder::Indexed,
            OrderArg::Completion => CollectionOrder::Completion,
        }
    }
}

/// Settings read from `--config`. Flags override every value here.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    ledger: Option<PathBuf>,
    cleaned_text_dir: Option<PathBuf>,
    lexicon: Option<PathBuf>,
    system_prompt: Option<PathBuf>,
    model: Option<String>,
    provider: Option<String>,
    token_budget: Option<usize>,
    max_input_tokens: Option<usize>,
    first_min_ratio: Option<f64>,
    first_max_ratio: Option<f64>,
    second_min_ratio: Option<f64>,
    second_max_ratio: Option<f64>,
    concurrency: Option<usize>,
    max_attempts: Option<u32>,
    retry_delay_ms: Option<u64>,
    order: Option<CollectionOrder>,
    temperature: Option<f32>,
    failure_sentinel: Option<String>,
    ascii_only: Option<bool>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        toml::from_str(&text).with_context(|| format!("Invalid config file {:?}", path))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let file = match cli.config {
        Some(ref path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SummaryProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, &file, progress_cb).await?;
    let mut condenser = Condenser::from_config(config).context("Failed to set up summariser")?;

    if let Some(lexicon) = cli.lexicon.as_ref().or(file.lexicon.as_ref()) {
        let segmenter = UnigramSegmenter::from_file(lexicon).context("Failed to load lexicon")?;
        condenser = condenser.with_segmenter(Arc::new(segmenter));
    }

    let input_dir = cli.input_dir.clone().or_else(|| {
        // the config file's input_dir only applies when no file was given
        cli.input.is_none().then(|| file.input_dir.clone()).flatten()
    });
    let output_dir = cli.output_dir.clone().or_else(|| file.output_dir.clone());

    match (cli.input.as_ref(), input_dir) {
        (Some(input), _) => run_single(&cli, &condenser, input, output_dir.as_deref()).await,
        (None, Some(dir)) => {
            let Some(out_dir) = output_dir else {
                bail!("--output-dir is required with --input-dir");
            };
            let ledger = cli
                .ledger
                .clone()
                .or_else(|| file.ledger.clone())
                .unwrap_or_else(|| out_dir.join("processed_pdfs.txt"));
            run_batch(&cli, &condenser, &dir, &out_dir, &ledger).await
        }
        (None, None) => bail!("Give a PDF file or --input-dir"),
    }
}

/// One document: to `-o`, to `--output-dir`, or to stdout.
async fn run_single(
    cli: &Cli,
    condenser: &Condenser,
    input: &Path,
    output_dir: Option<&Path>,
) -> Result<()> {
    let target = cli
        .output
        .clone()
        .or_else(|| output_dir.map(|d| output_path_for(input, d)));

    let output = match target {
        Some(ref path) => condenser
            .condense_to_file(input, path)
            .await
            .context("Summarisation failed")?,
        None => condenser
            .condense(input)
            .await
            .context("Summarisation failed")?,
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if target.is_none() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !output.text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !cli.json {
        print_summary_line(&output, target.as_deref());
    }
    Ok(())
}

/// Every unprocessed PDF in `input_dir`.
async fn run_batch(
    cli: &Cli,
    condenser: &Condenser,
    input_dir: &Path,
    output_dir: &Path,
    ledger_path: &Path,
) -> Result<()> {
    let mut ledger = ProcessedLedger::open(ledger_path).context("Failed to open ledger")?;
    let report = condenser
        .condense_directory(input_dir, output_dir, &mut ledger)
        .await
        .context("Batch run failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        if report.processed.is_empty() && report.failed.is_empty() {
            eprintln!("{} No new PDFs in {}", dim("·"), input_dir.display());
        }
        for item in &report.processed {
            eprintln!(
                "{}  {}  →  {}",
                if item.failed_chunks == 0 && !item.used_sentinel {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                item.input.display(),
                bold(&item.output.display().to_string()),
            );
        }
        for failure in &report.failed {
            eprintln!("{}  {}  {}", red("✘"), failure.input.display(), red(&failure.error));
        }
    }

    if !report.failed.is_empty() {
        bail!("{} document(s) failed", report.failed.len());
    }
    Ok(())
}

fn print_summary_line(output: &SummaryOutput, target: Option<&Path>) {
    let report = &output.report;
    let ok = report.chunk_count - report.failed_chunks.len();
    eprintln!(
        "{}  {}/{} chunks  {} code  {} equations  {}ms{}",
        if report.failed_chunks.is_empty() && !report.used_sentinel {
            green("✔")
        } else {
            cyan("⚠")
        },
        ok,
        report.chunk_count,
        output.stats.code_units,
        output.stats.equation_units,
        output.stats.total_duration_ms,
        target
            .map(|p| format!("  →  {}", bold(&p.display().to_string())))
            .unwrap_or_default(),
    );
    if report.second_tier {
        eprintln!(
            "   {}",
            dim(&format!(
                "second pass over {} tokens{}",
                output.stats.combined_tokens,
                if report.used_sentinel { " failed" } else { "" }
            ))
        );
    }
}

/// Map CLI args (falling back to the config file) onto `SummaryConfig`.
async fn build_config(
    cli: &Cli,
    file: &FileConfig,
    progress: Option<ProgressCallback>,
) -> Result<SummaryConfig> {
    let system_prompt = match cli.system_prompt.as_ref().or(file.system_prompt.as_ref()) {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        ),
        None => None,
    };

    let defaults = LengthRatios::default();
    let ratios = LengthRatios {
        first_min: cli.first_min_ratio.or(file.first_min_ratio).unwrap_or(defaults.first_min),
        first_max: cli.first_max_ratio.or(file.first_max_ratio).unwrap_or(defaults.first_max),
        second_min: cli
            .second_min_ratio
            .or(file.second_min_ratio)
            .unwrap_or(defaults.second_min),
        second_max: cli
            .second_max_ratio
            .or(file.second_max_ratio)
            .unwrap_or(defaults.second_max),
    };

    let mut builder = SummaryConfig::builder()
        .ratios(ratios)
        .ascii_only(cli.ascii_only || file.ascii_only.unwrap_or(false));

    if let Some(n) = cli.token_budget.or(file.token_budget) {
        builder = builder.token_budget(n);
    }
    if let Some(n) = cli.max_input_tokens.or(file.max_input_tokens) {
        builder = builder.max_input_tokens(n);
    }
    if let Some(n) = cli.concurrency.or(file.concurrency) {
        builder = builder.concurrency(n);
    }
    if let Some(n) = cli.max_attempts.or(file.max_attempts) {
        builder = builder.max_attempts(n);
    }
    if let Some(ms) = cli.retry_delay_ms.or(file.retry_delay_ms) {
        builder = builder.retry_delay(Duration::from_millis(ms));
    }
    if let Some(order) = cli.order.map(CollectionOrder::from).or(file.order) {
        builder = builder.collection_order(order);
    }
    if let Some(t) = cli.temperature.or(file.temperature) {
        builder = builder.temperature(t);
    }
    if let Some(ref s) = file.failure_sentinel {
        builder = builder.failure_sentinel(s.clone());
    }
    if let Some(model) = cli.model.as_ref().or(file.model.as_ref()) {
        builder = builder.model(model.clone());
    }
    if let Some(provider) = cli.provider.as_ref().or(file.provider.as_ref()) {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(dir) = cli.cleaned_text_dir.as_ref().or(file.cleaned_text_dir.as_ref()) {
        builder = builder.cleaned_text_dir(dir.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
