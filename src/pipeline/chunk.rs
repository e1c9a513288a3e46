//! Token-budgeted, sentence-aligned chunking.
//!
//! Chunks never cut a sentence in half: the model sees whole sentences, and
//! a sentence that alone exceeds the budget becomes its own (oversized)
//! chunk rather than being truncated or dropped.

use crate::backend::TokenCounter;
use crate::output::Chunk;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Split `text` after every `.`, `!` or `?` that is followed by whitespace.
///
/// Sentences are trimmed; empty ones are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in RE_SENTENCE_END.find_iter(text) {
        sentences.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    sentences.push(&text[start..]);
    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Greedily pack sentences into chunks of at most `token_budget` tokens.
///
/// `counter` must be the same counter the summariser uses; each chunk's
/// `token_count` is reused for its length window.
pub fn chunk<C>(prose: &str, token_budget: usize, counter: &C) -> Vec<Chunk>
where
    C: TokenCounter + ?Sized,
{
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;

    for sentence in split_sentences(prose) {
        let tokens = counter.count_tokens(sentence);
        if !current.is_empty() && current_tokens + tokens > token_budget {
            chunks.push(close(&mut current, current_tokens));
            current_tokens = 0;
        }
        if current.is_empty() && tokens > token_budget {
            debug!(
                "Oversized sentence: {} tokens exceeds budget of {}",
                tokens, token_budget
            );
        }
        current.push(sentence);
        current_tokens += tokens;
    }

    if !current.is_empty() {
        chunks.push(close(&mut current, current_tokens));
    }

    info!(
        "Chunking complete: {} chunk(s) with a budget of {} tokens",
        chunks.len(),
        token_budget
    );
    chunks
}

fn close(sentences: &mut Vec<&str>, token_count: usize) -> Chunk {
    let text = sentences.join(" ").trim().to_string();
    sentences.clear();
    Chunk { text, token_count }
}
