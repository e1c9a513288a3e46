//! Structural extraction: lift code blocks and equations out of page text.
//!
//! A summarisation model rewrites whatever it is given, so code and maths
//! must never reach it. This stage removes them from each page and keeps
//! them, verbatim and in order, for the reintegrator.
//!
//! ## Matcher Order
//!
//! The matchers form a strict sequence. Each one runs on the text left over
//! by the previous one, so a region is claimed by the first matcher that
//! sees it and never extracted twice:
//!
//! 1. Fenced blocks: ```` ```…``` ````
//! 2. Tagged blocks: `<code>…</code>`
//! 3. Indented paragraphs: consecutive lines indented by ≥ 4 spaces or a tab
//! 4. Equations: `$…$` or `$$…$$`
//!
//! Reordering them changes the output. A region removed from the start of
//! a line takes the following spaces with it, which keeps [`extract`]
//! idempotent on its own prose.

use crate::output::{ExtractedUnit, Page, PageUnitCount, UnitKind};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, info};

/// Output of [`extract`]: the remaining prose plus everything removed from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Remaining page texts joined with a single `\n`.
    pub prose: String,
    pub code_units: Vec<ExtractedUnit>,
    pub equation_units: Vec<ExtractedUnit>,
    /// Unit counts for every page that had text.
    pub page_counts: Vec<PageUnitCount>,
    /// Indices of pages without a text layer.
    pub skipped_pages: Vec<usize>,
}

static RE_FENCED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(.*?)```").unwrap());

static RE_CODE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<code>(.*?)</code>").unwrap());

static RE_INDENTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(?:^(?: {4,}|\t)[^\n]*\S[^\n]*(?:\n|$))+").unwrap());

static RE_EQUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\$\$?(.*?)\$\$?").unwrap());

/// One extraction rule: which regex, which collection, and how to turn a
/// match into unit content.
struct Matcher {
    kind: UnitKind,
    pattern: &'static Lazy<Regex>,
    body: fn(&Captures<'_>) -> String,
}

static MATCHERS: [Matcher; 4] = [
    Matcher {
        kind: UnitKind::Code,
        pattern: &RE_FENCED,
        body: inner_group,
    },
    Matcher {
        kind: UnitKind::Code,
        pattern: &RE_CODE_TAG,
        body: inner_group,
    },
    Matcher {
        kind: UnitKind::Code,
        pattern: &RE_INDENTED,
        body: dedented_paragraph,
    },
    Matcher {
        kind: UnitKind::Equation,
        pattern: &RE_EQUATION,
        body: inner_group,
    },
];

fn inner_group(caps: &Captures<'_>) -> String {
    caps.get(1).map_or("", |m| m.as_str()).trim().to_string()
}

/// Strip the paragraph's common indentation so relative nesting survives.
fn dedented_paragraph(caps: &Captures<'_>) -> String {
    let block = caps.get(0).map_or("", |m| m.as_str());
    let indent = block
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    block
        .lines()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

impl Matcher {
    /// Remove every match from `text`, returning the residue and the unit bodies.
    ///
    /// When a removed region started its line, the spaces and tabs after it
    /// go too, so the residue never gains an indented line that a later
    /// pass would read as code.
    fn apply(&self, text: &str) -> (String, Vec<String>) {
        let mut bodies = Vec::new();
        let mut residue = String::with_capacity(text.len());
        let mut cursor = 0;

        for caps in self.pattern.captures_iter(text) {
            let Some(m) = caps.get(0) else { continue };
            bodies.push((self.body)(&caps));
            if m.start() > cursor {
                residue.push_str(&text[cursor..m.start()]);
            }
            cursor = cursor.max(m.end());
            if at_line_start(&residue) {
                let rest = &text[cursor..];
                cursor += rest.len() - rest.trim_start_matches([' ', '\t']).len();
            }
        }

        if bodies.is_empty() {
            return (text.to_string(), bodies);
        }
        residue.push_str(&text[cursor..]);
        (residue, bodies)
    }
}

/// True when the last line of `text` holds only spaces and tabs.
fn at_line_start(text: &str) -> bool {
    text.rsplit('\n')
        .next()
        .is_none_or(|line| line.chars().all(|c| c == ' ' || c == '\t'))
}

/// Extract code and equation units from `pages`, consuming them.
///
/// Pages without text are recorded in [`Extraction::skipped_pages`] and
/// contribute nothing. Units whose trimmed body is empty are dropped, but
/// their regions are still removed from the prose.
pub fn extract(pages: Vec<Page>) -> Extraction {
    let mut out = Extraction::default();
    let mut residues: Vec<String> = Vec::with_capacity(pages.len());

    for page in pages {
        let Some(text) = page.content() else {
            debug!("Page {}: no text, skipped", page.index + 1);
            out.skipped_pages.push(page.index);
            continue;
        };

        let mut count = PageUnitCount {
            page: page.index,
            ..PageUnitCount::default()
        };
        let mut remaining = text.to_string();

        for matcher in MATCHERS.iter() {
            let (rest, bodies) = matcher.apply(&remaining);
            remaining = rest;
            for content in bodies.into_iter().filter(|b| !b.is_empty()) {
                let unit = ExtractedUnit {
                    kind: matcher.kind,
                    content,
                    source_page: page.index,
                };
                match matcher.kind {
                    UnitKind::Code => {
                        count.code += 1;
                        out.code_units.push(unit);
                    }
                    UnitKind::Equation => {
                        count.equations += 1;
                        out.equation_units.push(unit);
                    }
                }
            }
        }

        if count.code > 0 || count.equations > 0 {
            debug!(
                "Page {}: extracted {} code block(s), {} equation(s)",
                page.index + 1,
                count.code,
                count.equations
            );
        }
        out.page_counts.push(count);
        residues.push(remaining);
    }

    out.prose = residues.join("\n");
    info!(
        "Extraction complete: {} code block(s), {} equation(s), {} page(s) skipped",
        out.code_units.len(),
        out.equation_units.len(),
        out.skipped_pages.len()
    );
    out
}
