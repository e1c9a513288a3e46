//! Processed-file ledger for batch runs.
//!
//! A plain text file with one file name per line. It is only ever appended
//! to, so an interrupted batch loses at most the entry for the file that was
//! being written when it stopped.

use crate::error::SummaryError;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Names of files that were already condensed.
#[derive(Debug)]
pub struct ProcessedLedger {
    path: PathBuf,
    names: HashSet<String>,
}

impl ProcessedLedger {
    /// Load the ledger at `path`. A missing file is an empty ledger.
    ///
    /// Blank lines are ignored and surrounding whitespace is trimmed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SummaryError> {
        let path = path.into();
        let names = match std::fs::read_to_string(&path) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(source) => return Err(SummaryError::LedgerIo { path, source }),
        };
        debug!("Ledger {}: {} processed file(s)", path.display(), names.len());
        Ok(Self { path, names })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_processed(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Record `name` in memory and append it to the file.
    ///
    /// Marking a name twice is a no-op.
    pub fn mark_processed(&mut self, name: &str) -> Result<(), SummaryError> {
        if self.names.contains(name) {
            return Ok(());
        }
        let io_err = |source| SummaryError::LedgerIo {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        writeln!(file, "{name}").map_err(io_err)?;

        self.names.insert(name.to_string());
        info!("Marked '{}' as processed", name);
        Ok(())
    }
}
