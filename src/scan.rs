//! Source tree scanning.
//!
//! Stage 1 of the flatten pipeline. Walks the source tree once and records
//! everything later stages need:
//!
//! - every image file in scope, in discovery order
//! - an [`ImageIndex`] from lowercase basename to the paths carrying it, used
//!   as the last-resort fallback when a reference does not resolve by path
//! - every markdown document in scope, in natural order of its root-relative path
//!
//! ## Exclusions
//!
//! ```text
//! vault/
//! ├── 01 Intro.md
//! ├── attachments/             # images referenced only by filename
//! │   └── diagram.png
//! ├── Projects/
//! │   ├── plan.md
//! │   └── Archive/             # excluded by name → whole subtree skipped
//! │       └── old.md
//! └── combined_output_folder/  # our own output, always excluded
//! ```
//!
//! Exclusion matches directory *names*, case-insensitively, at any depth. An
//! excluded directory is pruned before it is read, so nothing below it is ever
//! reported.
//!
//! ## Discovery Order
//!
//! Entries of a directory are visited files first, then sub-directories, each
//! group sorted by file name. The index therefore lists duplicate basenames in
//! a stable order, and "first discovered" means the same file on every run.

use crate::naming::{has_image_extension, is_markdown_name, natural_key, normalize_path};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source root not found or not a directory: {0}")]
    InvalidRoot(PathBuf),
    #[error("Cannot read source tree: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Case-insensitive set of directory names to skip.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    names: HashSet<String>,
}

impl ExclusionSet {
    /// Build a set from folder names. Names are trimmed; blank names are dropped.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for name in names {
            set.insert(name.as_ref());
        }
        set
    }

    pub fn insert(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() {
            self.names.insert(name.to_lowercase());
        }
    }

    /// True if a single directory name is excluded. Only the configured
    /// names are trimmed; `name` is compared as it is on disk.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    /// True if any segment of a root-relative directory path is excluded.
    pub fn excludes(&self, relative: &Path) -> bool {
        relative
            .components()
            .any(|c| self.contains(&c.as_os_str().to_string_lossy()))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Lowercase basename → source paths sharing that basename, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    by_name: HashMap<String, Vec<PathBuf>>,
}

impl ImageIndex {
    pub fn insert(&mut self, path: PathBuf) {
        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        self.by_name.entry(key).or_default().push(path);
    }

    /// All paths carrying `basename` (compared case-insensitively).
    pub fn candidates(&self, basename: &str) -> &[PathBuf] {
        self.by_name
            .get(&basename.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first discovered path carrying `basename`.
    pub fn lookup(&self, basename: &str) -> Option<&Path> {
        self.candidates(basename).first().map(PathBuf::as_path)
    }

    /// Basenames shared by more than one file. Resolution by basename picks the
    /// first of these, which is worth surfacing to the user.
    pub fn ambiguous(&self) -> Vec<(&str, &[PathBuf])> {
        let mut out: Vec<(&str, &[PathBuf])> = self
            .by_name
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(name, paths)| (name.as_str(), paths.as_slice()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}

/// Everything discovered in one walk of the source tree.
#[derive(Debug)]
pub struct ScanResult {
    /// Absolute, normalized source root.
    pub root: PathBuf,
    /// Every in-scope image, in discovery order.
    pub images: Vec<PathBuf>,
    pub index: ImageIndex,
    /// Every in-scope markdown document, in natural order.
    pub documents: Vec<PathBuf>,
}

impl ScanResult {
    /// Path relative to the scanned root (unchanged if outside it).
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Walk `root` and collect images, the image index and markdown documents.
pub fn scan(root: &Path, exclusions: &ExclusionSet) -> Result<ScanResult, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::InvalidRoot(root.to_path_buf()));
    }
    let root = std::path::absolute(root)
        .map(|p| normalize_path(&p))
        .map_err(|_| ScanError::InvalidRoot(root.to_path_buf()))?;

    let mut images = Vec::new();
    let mut index = ImageIndex::default();
    let mut documents = Vec::new();

    let walker = WalkDir::new(&root)
        .sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
        .into_iter()
        .filter_entry(|entry| !is_excluded_dir(entry, &root, exclusions));

    for entry in walker {
        let entry = entry?;
        if is_directory(&entry) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if has_image_extension(&name) {
            let path = entry.path().to_path_buf();
            index.insert(path.clone());
            images.push(path);
        } else if is_markdown_name(&name) {
            documents.push(entry.path().to_path_buf());
        }
    }

    documents.sort_by_cached_key(|p| {
        natural_key(&p.strip_prefix(&root).unwrap_or(p).to_string_lossy())
    });

    Ok(ScanResult {
        root,
        images,
        index,
        documents,
    })
}

/// Directories (including symlinks to directories) are never classified as files.
fn is_directory(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() || (entry.path_is_symlink() && entry.path().is_dir())
}

fn is_excluded_dir(entry: &DirEntry, root: &Path, exclusions: &ExclusionSet) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() || exclusions.is_empty() {
        return false;
    }
    entry
        .path()
        .strip_prefix(root)
        .map(|rel| exclusions.excludes(rel))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn names(result: &ScanResult, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| result.relative(p).to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn finds_images_and_documents() {
        let tmp = vault(&[
            ("intro.md", "# Intro"),
            ("img/a.png", "png"),
            ("img/b.JPG", "jpg"),
            ("notes/deep/c.md", "c"),
            ("notes/readme.txt", "txt"),
        ]);
        let result = scan(tmp.path(), &ExclusionSet::default()).unwrap();

        assert_eq!(names(&result, &result.documents), ["intro.md", "notes/deep/c.md"]);
        assert_eq!(names(&result, &result.images), ["img/a.png", "img/b.JPG"]);
    }

    #[test]
    fn documents_in_natural_order() {
        let tmp = vault(&[("a2.md", ""), ("a10.md", ""), ("a1.md", "")]);
        let result = scan(tmp.path(), &ExclusionSet::default()).unwrap();

        assert_eq!(names(&result, &result.documents), ["a1.md", "a2.md", "a10.md"]);
    }

    #[test]
    fn documents_grouped_by_folder() {
        let tmp = vault(&[
            ("Part 10/a.md", ""),
            ("Part 2/b.md", ""),
            ("Part 2/a.md", ""),
            ("root.md", ""),
        ]);
        let result = scan(tmp.path(), &ExclusionSet::default()).unwrap();

        assert_eq!(
            names(&result, &result.documents),
            ["Part 2/a.md", "Part 2/b.md", "Part 10/a.md", "root.md"]
        );
    }

    #[test]
    fn markdown_suffix_is_case_insensitive() {
        let tmp = vault(&[("LOUD.MD", ""), ("quiet.md", "")]);
        let result = scan(tmp.path(), &ExclusionSet::default()).unwrap();
        assert_eq!(result.documents.len(), 2);
    }

    #[test]
    fn excluded_folder_pruned_at_any_depth() {
        let tmp = vault(&[
            ("keep.md", ""),
            ("a/b/c/Private/secret.md", ""),
            ("a/b/c/Private/secret.png", ""),
            ("a/b/c/Private/nested/more.png", ""),
            ("a/b/c/visible.png", ""),
        ]);
        let result = scan(tmp.path(), &ExclusionSet::new(["private"])).unwrap();

        assert_eq!(names(&result, &result.documents), ["keep.md"]);
        assert_eq!(names(&result, &result.images), ["a/b/c/visible.png"]);
        assert!(result.index.lookup("secret.png").is_none());
    }

    #[test]
    fn exclusion_matches_case_insensitively() {
        let tmp = vault(&[("Drafts/x.md", ""), ("y.md", "")]);
        let result = scan(tmp.path(), &ExclusionSet::new(["  DRAFTS "])).unwrap();
        assert_eq!(names(&result, &result.documents), ["y.md"]);
    }

    #[test]
    fn exclusion_trims_configured_names_only() {
        let set = ExclusionSet::new([" Drafts "]);
        assert!(set.contains("drafts"));
        assert!(!set.contains("Drafts "));
    }

    #[test]
    fn exclusion_does_not_match_files() {
        let tmp = vault(&[("private", "a file, not a folder"), ("p.png", "")]);
        let result = scan(tmp.path(), &ExclusionSet::new(["p.png"])).unwrap();
        assert_eq!(result.images.len(), 1);
    }

    #[test]
    fn index_keeps_duplicates_in_discovery_order() {
        let tmp = vault(&[("b/fig.png", "b"), ("a/Fig.png", "a"), ("fig.png", "root")]);
        let result = scan(tmp.path(), &ExclusionSet::default()).unwrap();

        let hits = names(&result, result.index.candidates("FIG.PNG"));
        // Files of a directory come before its sub-directories.
        assert_eq!(hits, ["fig.png", "a/Fig.png", "b/fig.png"]);
        assert_eq!(result.index.lookup("fig.png"), Some(result.images[0].as_path()));
        assert_eq!(result.index.ambiguous().len(), 1);
    }

    #[test]
    fn missing_root_is_error() {
        let tmp = vault(&[]);
        let missing = tmp.path().join("nope");
        let err = scan(&missing, &ExclusionSet::default()).unwrap_err();
        assert!(matches!(err, ScanError::InvalidRoot(_)));
    }

    #[test]
    fn file_root_is_error() {
        let tmp = vault(&[("file.md", "")]);
        let err = scan(&tmp.path().join("file.md"), &ExclusionSet::default()).unwrap_err();
        assert!(matches!(err, ScanError::InvalidRoot(_)));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_folder_aborts_scan() {
        let tmp = vault(&[("a.md", ""), ("locked/b.md", ""), ("locked/c.png", "c")]);
        let locked = tmp.path().join("locked");
        if !lock_dir(&locked) {
            return;
        }
        let result = scan(tmp.path(), &ExclusionSet::default());
        unlock_dir(&locked);

        assert!(matches!(result, Err(ScanError::Walk(_))));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_folder_ignored_when_excluded() {
        let tmp = vault(&[("a.md", ""), ("locked/b.md", "")]);
        let locked = tmp.path().join("locked");
        if !lock_dir(&locked) {
            return;
        }
        let result = scan(tmp.path(), &ExclusionSet::new(["Locked"]));
        unlock_dir(&locked);

        let result = result.unwrap();
        assert_eq!(names(&result, &result.documents), ["a.md"]);
    }

    #[test]
    fn root_is_absolute_and_normalized() {
        let tmp = vault(&[("x/a.md", "")]);
        let dotted = tmp.path().join("x").join("..");
        let result = scan(&dotted, &ExclusionSet::default()).unwrap();
        assert!(result.root.is_absolute());
        assert_eq!(names(&result, &result.documents), ["x/a.md"]);
    }
}
