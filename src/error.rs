//! Error types for the edgequake-pdfsum library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`SummaryError`]: **Fatal**: the run cannot proceed at all (bad input
//!   file, wrong password, provider not configured, tokenizer missing).
//!   Returned as `Err(SummaryError)` from the top-level `condense*` functions.
//!
//! * [`ChunkError`]: **Non-fatal**: one chunk could not be summarised after
//!   all attempts. Stored inside [`crate::output::ChunkSummary`]; the chunk
//!   contributes nothing and the document carries on.
//!
//! * [`BackendError`]: what a single inference call returns. The tiered
//!   summariser retries these and converts an exhausted chunk into a
//!   [`ChunkError`]; they never reach the caller directly.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfsum library.
#[derive(Debug, Error)]
pub enum SummaryError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The input directory could not be listed.
    #[error("Failed to read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium for your platform and make sure it is on the library search path."
    )]
    PdfiumBindingFailed(String),

    // ── Backend errors ────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The tokenizer shared by chunking and summarisation failed to load.
    #[error("Failed to load tokenizer '{name}': {detail}")]
    TokenizerLoad { name: String, detail: String },

    /// A custom segmentation lexicon could not be read or parsed.
    #[error("Failed to load word lexicon '{path}': {detail}")]
    LexiconLoad { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The processed-file ledger could not be read or appended to.
    #[error("Processed-file ledger '{path}' is not usable: {source}")]
    LedgerIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single chunk.
///
/// Stored alongside [`crate::output::ChunkSummary`] when a chunk fails.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// Every attempt failed; the chunk contributes nothing to the summary.
    #[error("Chunk {index}: summarisation failed after {attempts} attempts: {detail}")]
    Exhausted {
        index: usize,
        attempts: u32,
        detail: String,
    },
}

/// Failure of one call into a [`crate::backend::SummaryBackend`].
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The provider reported an error (network, rate limit, 5xx, ...).
    #[error("backend call failed: {0}")]
    Call(String),

    /// The provider answered with no usable text.
    #[error("backend returned an empty summary")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_error_display() {
        let e = ChunkError::Exhausted {
            index: 4,
            attempts: 3,
            detail: "503 Service Unavailable".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Chunk 4"), "got: {msg}");
        assert!(msg.contains("3 attempts"), "got: {msg}");
    }

    #[test]
    fn provider_not_configured_display() {
        let e = SummaryError::ProviderNotConfigured {
            provider: "openai".into(),
            hint: "set OPENAI_API_KEY".into(),
        };
        assert!(e.to_string().contains("openai"));
        assert!(e.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn tokenizer_load_display() {
        let e = SummaryError::TokenizerLoad {
            name: "cl100k_base".into(),
            detail: "missing ranks".into(),
        };
        assert!(e.to_string().contains("cl100k_base"));
    }

    #[test]
    fn backend_error_display() {
        assert!(BackendError::Call("timeout".into())
            .to_string()
            .contains("timeout"));
        assert!(BackendError::EmptyResponse.to_string().contains("empty"));
    }
}
