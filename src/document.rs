//! Output documents: turn the final summary text into a file on disk.
//!
//! A renderer accepts text line by line and refuses lines it cannot
//! represent instead of failing the document. [`MarkdownRenderer`] is the
//! shipped implementation.

use crate::error::SummaryError;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::path::Path;
use tracing::{debug, info, warn};

/// Line counts from one [`DocumentRenderer::add_text`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderReport {
    pub added: usize,
    /// Lines rejected by the renderer (blank lines are not counted).
    pub skipped: usize,
}

impl AddAssign for RenderReport {
    fn add_assign(&mut self, other: Self) {
        self.added += other.added;
        self.skipped += other.skipped;
    }
}

/// Accumulates text and writes it out as a document.
pub trait DocumentRenderer {
    fn add_text(&mut self, text: &str) -> RenderReport;

    /// Add source code that must display verbatim. Plain-text renderers
    /// can treat it like any other text.
    fn add_code_block(&mut self, code: &str) -> RenderReport {
        self.add_text(code)
    }

    fn save(&self, path: &Path) -> Result<(), SummaryError>;
}

/// Private Use Area of the Basic Multilingual Plane.
const PUA: std::ops::RangeInclusive<char> = '\u{E000}'..='\u{F8FF}';

/// Replacement for glyphs in the Private Use Area.
const PUA_REPLACEMENT: char = '#';

/// Markdown document with an optional title heading.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    title: Option<String>,
    ascii_only: bool,
    lines: Vec<String>,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `# {title}` as the first line of the document.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Drop every non-ASCII character before a line is accepted.
    pub fn ascii_only(mut self, v: bool) -> Self {
        self.ascii_only = v;
        self
    }

    /// The document as it would be written by [`DocumentRenderer::save`].
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(ref title) = self.title {
            out.push_str("# ");
            out.push_str(title);
            out.push_str("\n\n");
        }
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    fn sanitize_line(&self, line: &str) -> String {
        line.trim_end_matches('\r')
            .chars()
            .map(|c| if PUA.contains(&c) { PUA_REPLACEMENT } else { c })
            .filter(|c| !self.ascii_only || c.is_ascii())
            .collect()
    }
}

impl DocumentRenderer for MarkdownRenderer {
    fn add_text(&mut self, text: &str) -> RenderReport {
        let mut report = RenderReport::default();
        for (n, raw) in text.split('\n').enumerate() {
            let line = self.sanitize_line(raw);
            if line.trim().is_empty() {
                continue;
            }
            if line.chars().any(|c| c.is_control() && c != '\t') {
                warn!("Line {}: contains control characters, skipped", n + 1);
                report.skipped += 1;
                continue;
            }
            self.lines.push(line);
            report.added += 1;
        }
        debug!(
            "Renderer: {} line(s) added, {} skipped",
            report.added, report.skipped
        );
        report
    }

    /// Fenced block. Blank lines inside the code are kept and the fence is
    /// longer than any backtick run in the body.
    fn add_code_block(&mut self, code: &str) -> RenderReport {
        let mut report = RenderReport::default();
        let mut body = Vec::new();
        for (n, raw) in code.split('\n').enumerate() {
            let line = self.sanitize_line(raw);
            if line.chars().any(|c| c.is_control() && c != '\t') {
                warn!("Code line {}: contains control characters, skipped", n + 1);
                report.skipped += 1;
                continue;
            }
            body.push(line);
        }
        if body.iter().all(|l| l.trim().is_empty()) {
            return report;
        }

        let longest_run = body
            .iter()
            .flat_map(|l| l.split(|c: char| c != '`'))
            .map(str::len)
            .max()
            .unwrap_or(0);
        let fence = "`".repeat(longest_run.max(2) + 1);

        report.added += body.len();
        self.lines.push(fence.clone());
        self.lines.extend(body);
        self.lines.push(fence);
        report
    }

    /// Write atomically: temp file next to `path`, then rename over it.
    fn save(&self, path: &Path) -> Result<(), SummaryError> {
        let write_err = |source| SummaryError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp_path = path.with_extension("md.tmp");
        std::fs::write(&tmp_path, self.render()).map_err(write_err)?;
        std::fs::rename(&tmp_path, path).map_err(write_err)?;

        info!("Summary saved to '{}'", path.display());
        Ok(())
    }
}
