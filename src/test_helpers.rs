//! Shared test utilities for the combine-md test suite.
//!
//! Builds throw-away vaults in temp directories and reads back what a run
//! produced.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = vault(&[
//!     ("Notes/a.md", "![[pic.png]]"),
//!     ("attachments/pic.png", "png bytes"),
//! ]);
//! let summary = combine(&options_for(tmp.path()), None).unwrap();
//!
//! let docs = output_documents(&summary.layout.tmp_dir);
//! assert_eq!(docs[0].0, "000001__Notes__a.md");
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::combine::CombineOptions;

// =========================================================================
// Vault setup
// =========================================================================

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
}

/// Create a temp vault holding the given `(relative path, contents)` files.
pub fn vault(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (rel, contents) in files {
        write_file(tmp.path(), rel, contents);
    }
    tmp
}

/// Default options rooted at `root`.
pub fn options_for(root: &Path) -> CombineOptions {
    CombineOptions::new(root)
}

// =========================================================================
// Output readers
// =========================================================================

/// Sorted file names (not directories) directly inside `dir`.
pub fn output_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// `(file name, contents)` of every document in the temp folder, in name order.
pub fn output_documents(tmp_dir: &Path) -> Vec<(String, String)> {
    output_files(tmp_dir)
        .into_iter()
        .map(|name| {
            let contents = fs::read_to_string(tmp_dir.join(&name)).unwrap();
            (name, contents)
        })
        .collect()
}

/// Contents of the output document whose name ends with `suffix`. Panics if
/// there is no such document.
pub fn find_document(tmp_dir: &Path, suffix: &str) -> String {
    let docs = output_documents(tmp_dir);
    docs.iter()
        .find(|(name, _)| name.ends_with(suffix))
        .map(|(_, contents)| contents.clone())
        .unwrap_or_else(|| {
            let names: Vec<&str> = docs.iter().map(|(n, _)| n.as_str()).collect();
            panic!("document '*{suffix}' not found. Available: {names:?}")
        })
}

// =========================================================================
// Permissions
// =========================================================================

/// Make `dir` unlistable. Returns `false` (and restores the mode) when the
/// process can list it anyway, as it can when running as root.
#[cfg(unix)]
pub fn lock_dir(dir: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(dir).is_ok() {
        unlock_dir(dir);
        return false;
    }
    true
}

/// Restore a directory locked by [`lock_dir`] so the temp dir can be removed.
#[cfg(unix)]
pub fn unlock_dir(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
}
