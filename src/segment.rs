//! Dictionary-based segmentation of glued words.
//!
//! PDF text layers often lose the spaces between words ("informationretrieval").
//! [`UnigramSegmenter`] recovers them by picking the split whose words have
//! the highest combined unigram log-probability. Unknown words are scored by
//! length so a known split beats an unknown whole, but a known whole beats
//! any split into shorter known words.
//!
//! The embedded English lexicon is parsed once per process, on first use.

use crate::error::SummaryError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Splits a lower-cased token into sub-words.
///
/// Returns the token itself (one element) when no better split exists.
pub trait WordSegmenter: Send + Sync {
    fn segment(&self, token: &str) -> Vec<String>;
}

static ENGLISH_LEXICON: &str = include_str!("../data/unigrams.txt");
static ENGLISH: OnceLock<Arc<UnigramSegmenter>> = OnceLock::new();

/// Longest candidate word considered during segmentation, in characters.
const MAX_WORD_LEN: usize = 24;

/// Unigram-frequency segmenter.
#[derive(Debug, Clone)]
pub struct UnigramSegmenter {
    counts: HashMap<String, f64>,
    log_total: f64,
}

impl UnigramSegmenter {
    /// The shared segmenter over the embedded English lexicon.
    pub fn english() -> &'static UnigramSegmenter {
        Self::english_shared()
    }

    /// Handle to the same instance as [`UnigramSegmenter::english`]; the
    /// lexicon is parsed once per process and never copied.
    pub fn english_shared() -> &'static Arc<UnigramSegmenter> {
        ENGLISH.get_or_init(|| {
            let (entries, _) = parse_lexicon(ENGLISH_LEXICON);
            let segmenter = Self::from_entries(entries);
            debug!("Loaded embedded lexicon: {} words", segmenter.len());
            Arc::new(segmenter)
        })
    }

    /// Build from `(word, count)` pairs. Words are lower-cased.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, f64)>) -> Self {
        let mut counts: HashMap<String, f64> = HashMap::new();
        for (word, count) in entries {
            *counts.entry(word.to_lowercase()).or_insert(0.0) += count;
        }
        let total: f64 = counts.values().sum::<f64>().max(1.0);
        Self {
            counts,
            log_total: total.log10(),
        }
    }

    /// Load a lexicon file with one `word count` pair per line.
    ///
    /// Blank lines and lines starting with `#` are ignored; any other line
    /// that does not parse is an error.
    pub fn from_file(path: &Path) -> Result<Self, SummaryError> {
        let text = std::fs::read_to_string(path).map_err(|e| SummaryError::LexiconLoad {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let (entries, bad_lines) = parse_lexicon(&text);
        if let Some(line) = bad_lines.first() {
            return Err(SummaryError::LexiconLoad {
                path: path.to_path_buf(),
                detail: format!("malformed entry on line {line}"),
            });
        }
        Ok(Self::from_entries(entries))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// log10 probability of `word` appearing as a standalone word.
    fn score(&self, word: &str) -> f64 {
        match self.counts.get(word) {
            Some(count) => count.log10() - self.log_total,
            None => 1.0 - self.log_total - word.chars().count() as f64,
        }
    }
}

impl WordSegmenter for UnigramSegmenter {
    fn segment(&self, token: &str) -> Vec<String> {
        let bounds: Vec<usize> = token
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(token.len()))
            .collect();
        let n = bounds.len() - 1;
        if n == 0 {
            return Vec::new();
        }

        // best[i] = (score of the best segmentation of the first i chars, start of its last word)
        let mut best: Vec<(f64, usize)> = vec![(f64::NEG_INFINITY, 0); n + 1];
        best[0] = (0.0, 0);
        for end in 1..=n {
            let first_start = end.saturating_sub(MAX_WORD_LEN);
            for start in first_start..end {
                let word = &token[bounds[start]..bounds[end]];
                let candidate = best[start].0 + self.score(word);
                if candidate > best[end].0 {
                    best[end] = (candidate, start);
                }
            }
        }

        let mut words = Vec::new();
        let mut end = n;
        while end > 0 {
            let start = best[end].1;
            words.push(token[bounds[start]..bounds[end]].to_string());
            end = start;
        }
        words.reverse();
        words
    }
}

/// Parse `word count` lines; returns the entries and the 1-based numbers of
/// lines that could not be parsed.
fn parse_lexicon(text: &str) -> (Vec<(String, f64)>, Vec<usize>) {
    let mut entries = Vec::new();
    let mut bad = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next().and_then(|c| c.parse::<f64>().ok())) {
            (Some(word), Some(count)) if count > 0.0 => entries.push((word.to_string(), count)),
            _ => bad.push(i + 1),
        }
    }
    (entries, bad)
}
