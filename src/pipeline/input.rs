//! Input resolution: validate local PDFs and find pending work in a directory.
//!
//! pdfium reports a non-PDF as a generic load failure, so the `%PDF` magic
//! bytes are checked up front to give the caller a precise error.

use crate::error::SummaryError;
use crate::ledger::ProcessedLedger;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check that `path` exists, is readable and starts with `%PDF`.
///
/// Files shorter than four bytes are passed through; pdfium rejects them
/// with a corrupt-PDF error later.
pub fn resolve_local(path: &Path) -> Result<PathBuf, SummaryError> {
    let path = path.to_path_buf();
    if !path.is_file() {
        return Err(SummaryError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(SummaryError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SummaryError::PermissionDenied { path });
        }
        Err(_) => return Err(SummaryError::FileNotFound { path }),
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Whether `path` has a `.pdf` extension, in any case.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// All `*.pdf` files directly inside `dir`, sorted by file name.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, SummaryError> {
    let unreadable = |source| SummaryError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if path.is_file() && has_pdf_extension(&path) {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}

/// PDFs in `dir` whose file names are not yet in `ledger`.
pub fn pending_pdfs(dir: &Path, ledger: &ProcessedLedger) -> Result<Vec<PathBuf>, SummaryError> {
    let all = list_pdfs(dir)?;
    let total = all.len();
    let pending: Vec<PathBuf> = all
        .into_iter()
        .filter(|p| !ledger.is_processed(&file_name(p)))
        .collect();
    info!(
        "Found {} PDF(s) in {}, {} not yet processed",
        total,
        dir.display(),
        pending.len()
    );
    Ok(pending)
}

/// The ledger key for `path`: its final component, lossily decoded.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(has_pdf_extension(Path::new("a/report.PDF")));
        assert!(has_pdf_extension(Path::new("paper.pdf")));
        assert!(!has_pdf_extension(Path::new("notes.txt")));
        assert!(!has_pdf_extension(Path::new("pdf")));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_local(Path::new("/nonexistent/doc.pdf")).unwrap_err();
        assert!(matches!(err, SummaryError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"PK\x03\x04zip").unwrap();
        match resolve_local(&path).unwrap_err() {
            SummaryError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.pdf");
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();
        assert_eq!(resolve_local(&path).unwrap(), path);
    }

    #[test]
    fn pending_skips_ledgered_and_non_pdf_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "c.pdf", "readme.txt"] {
            std::fs::write(dir.path().join(name), b"%PDF").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let ledger_path = dir.path().join("processed.log");
        let mut ledger = ProcessedLedger::open(&ledger_path).unwrap();
        ledger.mark_processed("c.pdf").unwrap();

        let pending = pending_pdfs(dir.path(), &ledger).unwrap();
        let names: Vec<String> = pending.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn unreadable_directory_is_an_error() {
        let err = list_pdfs(Path::new("/nonexistent/input")).unwrap_err();
        assert!(matches!(err, SummaryError::InputDirUnreadable { .. }));
    }
}
