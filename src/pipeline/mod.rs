//! Pipeline stages for document summarisation.
//!
//! Each submodule implements exactly one transformation step and consumes
//! its input, so every stage can be tested with plain values.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pages ──▶ extract ──▶ normalize ──▶ chunk ──▶ summarize ──▶ reintegrate
//! (path)   (pdfium)  (code/math)  (prose fix)  (budget)  (tier 1+2)    (sections)
//! ```
//!
//! 1. [`input`]: validate a local PDF; list pending PDFs in a directory
//! 2. [`pages`]: per-page text; runs in `spawn_blocking` because pdfium
//!    is not async-safe
//! 3. [`extract`]: lift code blocks and equations out of the prose
//! 4. [`normalize`]: line wraps, glued words, punctuation
//! 5. [`chunk`]: sentence-aligned chunks under a token budget
//! 6. [`summarize`]: concurrent per-chunk summaries with retry, then an
//!    optional second pass; the only stage with network I/O
//! 7. [`reintegrate`]: sanitise the summary and append the preserved units

pub mod chunk;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod pages;
pub mod reintegrate;
pub mod summarize;
