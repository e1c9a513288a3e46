//! Page text extraction via pdfium.
//!
//! pdfium is a blocking C++ library, so [`PdfiumPageSource`] does all of its
//! work inside `tokio::task::spawn_blocking`. A page whose text layer cannot
//! be read is returned as [`Page::blank`] and later skipped by the
//! extractor; only failures to open the document are fatal.

use crate::error::SummaryError;
use crate::output::Page;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming a directory that holds the pdfium library.
pub const PDFIUM_LIB_DIR_ENV: &str = "PDFIUM_LIB_DIR";

/// Produces the per-page text of a document.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn pages(&self, path: &Path) -> Result<Vec<Page>, SummaryError>;
}

/// [`PageSource`] backed by pdfium's text layer.
#[derive(Debug, Clone, Default)]
pub struct PdfiumPageSource {
    password: Option<String>,
}

impl PdfiumPageSource {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }
}

#[async_trait]
impl PageSource for PdfiumPageSource {
    async fn pages(&self, path: &Path) -> Result<Vec<Page>, SummaryError> {
        let path = path.to_path_buf();
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || read_pages_blocking(&path, password.as_deref()))
            .await
            .map_err(|e| SummaryError::Internal(format!("Page extraction task panicked: {}", e)))?
    }
}

fn bind_pdfium() -> Result<Pdfium, SummaryError> {
    let bindings = match std::env::var_os(PDFIUM_LIB_DIR_ENV) {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
            &PathBuf::from(dir),
        )),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| SummaryError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

fn read_pages_blocking(pdf_path: &Path, password: Option<&str>) -> Result<Vec<Page>, SummaryError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                SummaryError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                SummaryError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            SummaryError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut out = Vec::with_capacity(pages.len() as usize);
    for (index, page) in pages.iter().enumerate() {
        match page.text() {
            Ok(text) => {
                let text = text.all();
                debug!("Page {}: {} chars of text", index + 1, text.len());
                out.push(Page::new(index, text));
            }
            Err(e) => {
                warn!("Page {}: text layer unreadable ({:?}), skipped", index + 1, e);
                out.push(Page::blank(index));
            }
        }
    }
    Ok(out)
}
