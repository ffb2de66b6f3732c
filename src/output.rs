//! CLI output formatting.
//!
//! Output is **document-centric**: every written document leads with its
//! position in reading order and its source path, and reference counts follow
//! as indented context. Paths are root-relative so the listing reads like a
//! table of contents of the combined document.
//!
//! # Output Format
//!
//! ## Flatten
//!
//! ```text
//! Found 3 documents, 4 images
//!     1 image name shared by several files (first found is used)
//! 001 Intro.md
//!     2 images linked
//! 002 Projects/plan.md
//!     0 images linked, 1 unresolved
//! 003 Projects/review.md
//! Skipped broken.png: Failed to copy ...
//!
//! Documents: 3 → vault/combined_output_folder/_tmp_md_flat
//! Images: 4 copied (1 renamed)
//! References: 2 images linked, 1 unresolved
//! ```
//!
//! ## Folders
//!
//! ```text
//! 001 Archive
//! 002 Projects
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::combine::{CombineEvent, CombineSummary};
use crate::survey::{VaultStats, format_size};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

// ============================================================================
// Flatten
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_event(event: &CombineEvent) -> Vec<String> {
    match event {
        CombineEvent::Scanned {
            documents,
            images,
            ambiguous,
        } => {
            let mut lines = vec![format!(
                "Found {} {}, {} {}",
                documents,
                plural(*documents, "document", "documents"),
                images,
                plural(*images, "image", "images")
            )];
            if *ambiguous > 0 {
                lines.push(format!(
                    "{}{} image {} shared by several files (first found is used)",
                    indent(1),
                    ambiguous,
                    plural(*ambiguous, "name", "names")
                ));
            }
            lines
        }
        CombineEvent::DocumentWritten {
            sequence,
            source,
            stats,
            ..
        } => {
            let mut lines = vec![format!("{} {}", format_index(*sequence), source)];
            if stats.rewritten > 0 || stats.unresolved > 0 {
                lines.push(format!("{}{}", indent(1), stats));
            }
            lines
        }
        CombineEvent::SweepSkipped { source, error } => {
            vec![format!("Skipped {}: {}", source, error)]
        }
    }
}

/// Format the totals of a finished run.
pub fn format_summary(summary: &CombineSummary) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!(
            "Documents: {} \u{2192} {}",
            summary.documents,
            summary.layout.tmp_dir.display()
        ),
    ];
    if summary.images_renamed > 0 {
        lines.push(format!(
            "Images: {} copied ({} renamed)",
            summary.images_copied, summary.images_renamed
        ));
    } else {
        lines.push(format!("Images: {} copied", summary.images_copied));
    }
    lines.push(format!("References: {}", summary.references));
    if summary.sweep_skipped > 0 {
        lines.push(format!(
            "Skipped: {} {} could not be copied",
            summary.sweep_skipped,
            plural(summary.sweep_skipped, "image", "images")
        ));
    }
    lines
}

/// Print the totals of a finished run to stdout.
pub fn print_summary(summary: &CombineSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Survey
// ============================================================================

/// Format the selectable top-level folders, one per line.
pub fn format_folders(folders: &[String]) -> Vec<String> {
    if folders.is_empty() {
        return vec!["No folders found".to_string()];
    }
    folders
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} {}", format_index(i + 1), name))
        .collect()
}

pub fn print_folders(folders: &[String]) {
    for line in format_folders(folders) {
        println!("{}", line);
    }
}

/// Format statistics for a folder selection.
pub fn format_stats(folders: &[String], stats: &VaultStats) -> Vec<String> {
    let selection = if folders.is_empty() {
        "(none)".to_string()
    } else {
        folders.join(", ")
    };
    vec![
        format!("Selected: {}", selection),
        format!("{}Size: {}", indent(1), format_size(stats.total_size)),
        format!("{}Files: {}", indent(1), stats.total_files),
        format!("{}Folders: {}", indent(1), stats.total_dirs),
        format!("{}Markdown characters: {}", indent(1), stats.markdown_chars),
    ]
}

pub fn print_stats(folders: &[String], stats: &VaultStats) {
    for line in format_stats(folders, stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
