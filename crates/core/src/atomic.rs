//! Atomic whole-file replacement.

use crate::{PatchError, PatchResult};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Replaces `path` with `contents` so that readers see either the old document or the new one.
///
/// The bytes go to a temp file in the same directory, are synced, and the temp file is renamed
/// over `path`. A crash at any point leaves the previous document intact; the temp file is
/// removed on failure.
pub fn write_atomic(path: &Path, contents: &[u8]) -> PatchResult<()> {
    let write_err = |source: std::io::Error| PatchError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(write_err)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(parent)
        .map_err(write_err)?;
    temp.write_all(contents).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}
