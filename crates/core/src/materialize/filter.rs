//! Source-file filtering of freshly extracted snapshots.

use std::path::Path;

use tracing::debug;

use crate::errors::MaterializeError;

/// Keeps only files ending in one source extension.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    suffix: String,
}

impl SourceFilter {
    /// `extension` is given without the leading dot, e.g. `java`.
    pub fn new(extension: &str) -> Self {
        Self {
            suffix: format!(".{}", extension),
        }
    }

    pub fn keeps(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.suffix)
    }

    /// Delete every non-source file below `root`, then every directory left
    /// empty, bottom-up. `root` itself is removed when it ends up empty.
    /// Returns the number of files kept.
    pub fn apply(&self, root: &Path) -> Result<usize, MaterializeError> {
        if !root.exists() {
            return Ok(0);
        }
        self.apply_inner(root)
    }

    fn apply_inner(&self, dir: &Path) -> Result<usize, MaterializeError> {
        let entries = std::fs::read_dir(dir).map_err(|e| MaterializeError::io(dir, e))?;
        let mut kept = 0;
        for entry in entries {
            let entry = entry.map_err(|e| MaterializeError::io(dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| MaterializeError::io(&path, e))?;
            if file_type.is_dir() {
                kept += self.apply_inner(&path)?;
            } else if !self.keeps(&entry.file_name().to_string_lossy()) {
                std::fs::remove_file(&path).map_err(|e| MaterializeError::io(&path, e))?;
            } else {
                kept += 1;
            }
        }

        let is_empty = std::fs::read_dir(dir)
            .map_err(|e| MaterializeError::io(dir, e))?
            .next()
            .is_none();
        if is_empty {
            std::fs::remove_dir(dir).map_err(|e| MaterializeError::io(dir, e))?;
            debug!(path = %dir.display(), "removed empty directory");
        }
        Ok(kept)
    }
}
