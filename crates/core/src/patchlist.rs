//! Patchlist generation.
//!
//! The patchlist is a plain text manifest with one `path,sha256` line per active file, in ledger
//! order, each line terminated by `\n`. Files in the `main` folder are listed by bare filename;
//! other folders prefix the folder name (`pack/data.grf`).

use crate::atomic::write_atomic;
use crate::record::StatusLedger;
use crate::{PatchError, PatchResult};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PatchlistGenerator {
    path: PathBuf,
}

impl PatchlistGenerator {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders the patchlist for `ledger`. Pure: equal ledgers give identical output.
    pub fn render(ledger: &StatusLedger) -> String {
        let mut out = String::new();
        for (filename, record) in ledger.iter().filter(|(_, r)| r.is_active()) {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{},{}", record.patch_path(filename), record.digest);
        }
        out
    }

    /// Renders and atomically writes the patchlist. Returns the number of lines written.
    pub fn write(&self, ledger: &StatusLedger) -> PatchResult<usize> {
        let rendered = Self::render(ledger);
        write_atomic(&self.path, rendered.as_bytes())?;

        let lines = rendered.lines().count();
        tracing::debug!("patchlist {} written with {} entries", self.path.display(), lines);
        Ok(lines)
    }

    /// Reads the current patchlist document.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::NotFound`] if it has never been generated.
    pub fn read(&self) -> PatchResult<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PatchError::NotFound(
                self.path.display().to_string(),
            )),
            Err(e) => Err(PatchError::FileRead {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}
