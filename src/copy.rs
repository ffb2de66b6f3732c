//! Flat image copying with collision-safe names.
//!
//! Every source image ends up directly inside the output folder. Two maps keep
//! the flat namespace consistent for the whole run:
//!
//! - **copied**: normalized source path → output name. A source is copied at
//!   most once; later references reuse the same name.
//! - **claimed**: lowercase output name → source path that owns it.
//!
//! The first source with a given basename keeps it. Any other source with the
//! same basename (compared case-insensitively), or a basename already present
//! on disk from outside this run, gets `stem_<hash8>.ext` where `hash8` comes
//! from the full source path:
//!
//! ```text
//! vault/a/fig.png  →  fig.png
//! vault/b/fig.png  →  fig_3f9c2a1b.png
//! ```
//!
//! De-duplication is by path identity, not content: two byte-identical files at
//! different paths are both copied.

use crate::naming::{normalize_path, short_hash};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CopyError {
    #[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Destination for resolved images. Returns the flat name to reference.
///
/// [`ImageCopier`] is the real implementation; tests of the rewriter swap in
/// an in-memory store.
pub trait ImageStore {
    fn ensure_copied(&mut self, source: &Path) -> Result<String, CopyError>;
}

/// Copies images into one flat output directory, once per source path.
#[derive(Debug)]
pub struct ImageCopier {
    output_dir: PathBuf,
    copied: HashMap<PathBuf, String>,
    claimed: HashMap<String, PathBuf>,
    renamed: usize,
}

impl ImageCopier {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            copied: HashMap::new(),
            claimed: HashMap::new(),
            renamed: 0,
        }
    }

    /// Number of distinct source images copied so far.
    pub fn copied(&self) -> usize {
        self.copied.len()
    }

    /// How many of those needed a hashed name.
    pub fn renamed(&self) -> usize {
        self.renamed
    }

    /// Pick the flat name for a source that has not been copied yet.
    fn choose_name(&self, source: &Path) -> (String, bool) {
        let base = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !self.claimed.contains_key(&base.to_lowercase()) && !self.output_dir.join(&base).exists()
        {
            return (base, false);
        }

        let hash = short_hash(&source.to_string_lossy());
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match source.extension() {
            Some(ext) => format!("{}_{}.{}", stem, hash, ext.to_string_lossy()),
            None => format!("{}_{}", stem, hash),
        };
        (name, true)
    }
}

impl ImageStore for ImageCopier {
    fn ensure_copied(&mut self, source: &Path) -> Result<String, CopyError> {
        let source = normalize_path(source);
        if let Some(name) = self.copied.get(&source) {
            return Ok(name.clone());
        }

        let (name, renamed) = self.choose_name(&source);
        let dest = self.output_dir.join(&name);
        fs::copy(&source, &dest).map_err(|e| CopyError::Io {
            from: source.clone(),
            to: dest.clone(),
            source: e,
        })?;
        copy_modified_time(&source, &dest);

        if renamed {
            self.renamed += 1;
        }
        self.claimed.insert(name.to_lowercase(), source.clone());
        self.copied.insert(source, name.clone());
        Ok(name)
    }
}

/// Carry the source modification time over to the copy.
///
/// Best-effort: a read-only copy cannot be opened for writing and keeps the
/// time of the copy.
fn copy_modified_time(from: &Path, to: &Path) {
    let Ok(modified) = fs::metadata(from).and_then(|m| m.modified()) else {
        return;
    };
    if let Ok(file) = fs::File::options().write(true).open(to) {
        let _ = file.set_modified(modified);
    }
}
