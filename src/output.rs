//! Writing generated artifacts.
//!
//! The artifact goes to a temporary file next to the destination and is
//! renamed into place once complete. The destination is either untouched
//! or holds the whole new artifact.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ProbeError, Result};

pub fn write_artifact(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|e| ProbeError::io(path, e))?;
    file.write_all(contents)
        .and_then(|()| file.flush())
        .map_err(|e| ProbeError::io(path, e))?;
    file.persist(path).map_err(|e| ProbeError::io(path, e.error))?;
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
