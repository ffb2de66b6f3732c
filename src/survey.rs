//! Vault overview for choosing what to flatten.
//!
//! The top-level folders of a vault are the natural unit of selection: the
//! ones left out become `--ignore` names. [`collect_stats`] sizes up a
//! selection before running it.

use crate::naming::is_markdown_name;
use crate::scan::ExclusionSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Immediate sub-directories of `root`, sorted case-insensitively.
///
/// The output folder is left out, matched case-insensitively as the scan
/// excludes it.
pub fn top_level_folders(root: &Path, output_dir_name: &str) -> io::Result<Vec<String>> {
    let output_dir = ExclusionSet::new([output_dir_name]);
    let mut folders = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !output_dir.contains(&name) {
            folders.push(name);
        }
    }
    folders.sort_by_cached_key(|name| (name.to_lowercase(), name.clone()));
    Ok(folders)
}

/// Size totals for a set of folders.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VaultStats {
    pub total_size: u64,
    pub total_files: u64,
    /// Sub-directories below the selected folders, not counting the folders.
    pub total_dirs: u64,
    /// Characters (not bytes) across all markdown files.
    pub markdown_chars: u64,
}

impl fmt::Display for VaultStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {} files, {} folders, {} markdown characters",
            format_size(self.total_size),
            self.total_files,
            self.total_dirs,
            self.markdown_chars
        )
    }
}

/// Totals for the top-level `folders` of `root`.
///
/// Statistics are advisory: unreadable entries are skipped.
pub fn collect_stats<S: AsRef<str>>(root: &Path, folders: &[S]) -> VaultStats {
    let mut stats = VaultStats::default();
    for folder in folders {
        for entry in WalkDir::new(root.join(folder.as_ref()))
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.depth() == 0 {
                continue;
            }
            if entry.file_type().is_dir() {
                stats.total_dirs += 1;
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            stats.total_size += metadata.len();
            stats.total_files += 1;
            if !is_markdown_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            if let Ok(bytes) = fs::read(entry.path()) {
                stats.markdown_chars += String::from_utf8_lossy(&bytes).chars().count() as u64;
            }
        }
    }
    stats
}

/// Human-readable byte count with one decimal: `512.0 B`, `1.5 KB`, `2.0 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}
