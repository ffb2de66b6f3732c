//! Image reference resolution.
//!
//! Note-taking tools store attachments inconsistently: next to the note, in a
//! shared attachments folder referenced by bare filename, or by absolute path.
//! [`resolve`] tries each interpretation in turn and returns the first that
//! names a real file:
//!
//! ```text
//! reference                     tried as
//! ───────────────────────────   ─────────────────────────────────────────
//! https://example.com/a.png     URL → never resolved
//! /home/me/vault/img/a.png      absolute path, if the file exists
//! ../img/a.png                  relative to the document's directory
//! a.png                         basename lookup in the image index
//! ```
//!
//! The basename fallback recovers broken relative links as long as the
//! filename is unique in the tree. When it is not, the first discovered file
//! wins (see [`crate::scan`] for discovery order).

use crate::naming::{is_url, normalize_path};
use crate::scan::ImageIndex;
use std::path::{Path, PathBuf};

/// Resolve a raw reference found in a document located in `document_dir`.
///
/// Returns `None` for URLs, blank references, and references that match
/// nothing on disk or in the index.
pub fn resolve(reference: &str, document_dir: &Path, index: &ImageIndex) -> Option<PathBuf> {
    let reference = reference.trim();
    if reference.is_empty() || is_url(reference) {
        return None;
    }
    let reference = reference.replace('\\', "/");
    let as_path = Path::new(&reference);

    if as_path.is_absolute() && as_path.is_file() {
        return Some(normalize_path(as_path));
    }

    let candidate = normalize_path(&document_dir.join(as_path));
    if candidate.is_file() {
        return Some(candidate);
    }

    let basename = reference.rsplit('/').next().unwrap_or(&reference);
    index.lookup(basename).map(Path::to_path_buf)
}
