//! The flatten run.
//!
//! Ties the stages together for one source tree:
//!
//! ```text
//! 1. Scan       source tree → documents (natural order), images, basename index
//! 2. Rewrite    each document → references resolved, images copied on demand,
//!               headings + provenance added, written as NNNNNN__folder__file.md
//! 3. Sweep      every discovered image → copied if no document referenced it
//! ```
//!
//! ## Output Layout
//!
//! ```text
//! vault/
//! └── combined_output_folder/        # flat images, and the converter's result
//!     ├── diagram.png
//!     ├── diagram_3f9c2a1b.png
//!     └── _tmp_md_flat/              # flat documents, in reading order
//!         ├── 000001__Vault root__Intro.md
//!         ├── 000002__Projects__plan.md
//!         └── 000003__Projects - 2024__review.md
//! ```
//!
//! The output folder sits inside the source root and is always excluded from
//! the scan, so a run never reads its own output.
//!
//! ## Run State
//!
//! The sequence counter, the image copier and the last folder heading are all
//! created by [`combine`] and dropped when it returns. Two runs never share
//! state.

use crate::config::CombineConfig;
use crate::copy::{CopyError, ImageCopier, ImageStore};
use crate::naming::{clean_title, is_plain_name, normalize_path, slug};
use crate::rewrite::{DocumentFramer, HeadingStyle, RewriteStats, rewrite_references};
use crate::scan::{ExclusionSet, ScanError, scan};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CombineError {
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Image copy failed: {0}")]
    Copy(#[from] CopyError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid folder name '{0}': expected a single non-empty path segment")]
    InvalidName(String),
}

/// Inputs of one flatten run.
#[derive(Debug, Clone)]
pub struct CombineOptions {
    pub root: PathBuf,
    pub output_dir_name: String,
    pub tmp_dir_name: String,
    /// Folder names excluded at any depth, in addition to the output folder.
    pub ignore: Vec<String>,
    pub headings: HeadingStyle,
    /// Folder heading for documents directly in the root.
    pub root_title: String,
}

impl CombineOptions {
    /// Options with stock defaults for everything but the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::from_config(root, &CombineConfig::default())
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &CombineConfig) -> Self {
        Self {
            root: root.into(),
            output_dir_name: config.output_dir_name.clone(),
            tmp_dir_name: config.tmp_dir_name.clone(),
            ignore: config.ignore.clone(),
            headings: HeadingStyle::new(
                config.headings.folder_level,
                config.headings.file_level,
            ),
            root_title: config.root_title.clone(),
        }
    }

    pub fn layout(&self) -> Result<OutputLayout, CombineError> {
        OutputLayout::new(&self.root, &self.output_dir_name, &self.tmp_dir_name)
    }

    /// The output folder name plus every configured ignore name.
    pub fn exclusions(&self) -> ExclusionSet {
        let mut set = ExclusionSet::new(&self.ignore);
        set.insert(&self.output_dir_name);
        set
    }
}

/// Absolute locations of the source root, the output folder and the temp folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub tmp_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(root: &Path, output_dir_name: &str, tmp_dir_name: &str) -> Result<Self, CombineError> {
        for name in [output_dir_name, tmp_dir_name] {
            if !is_plain_name(name) {
                return Err(CombineError::InvalidName(name.to_string()));
            }
        }
        let root = normalize_path(&std::path::absolute(root)?);
        let output_dir = root.join(output_dir_name);
        let tmp_dir = output_dir.join(tmp_dir_name);
        Ok(Self {
            root,
            output_dir,
            tmp_dir,
        })
    }
}

/// Delete the output folder left by a previous run.
///
/// Returns whether anything was removed.
pub fn reset_output(layout: &OutputLayout) -> Result<bool, CombineError> {
    match fs::remove_dir_all(&layout.output_dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Progress reported while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombineEvent {
    Scanned {
        documents: usize,
        images: usize,
        /// Basenames carried by more than one image.
        ambiguous: usize,
    },
    DocumentWritten {
        sequence: usize,
        /// Root-relative source path, `/`-separated.
        source: String,
        /// File name in the temp folder.
        output: String,
        stats: RewriteStats,
    },
    SweepSkipped {
        source: String,
        error: String,
    },
}

/// Totals of a finished run.
#[derive(Debug, Clone)]
pub struct CombineSummary {
    pub layout: OutputLayout,
    pub documents: usize,
    /// Distinct source images now in the output folder.
    pub images_copied: usize,
    /// Images that needed a hashed name.
    pub images_renamed: usize,
    pub references: RewriteStats,
    pub sweep_skipped: usize,
}

/// Flatten the tree at `options.root` into its output folder.
///
/// Fails on an invalid root or folder name, an unreadable document, or an image
/// that a document references but that cannot be copied. Images that only the
/// final sweep copies are skipped on error and reported as
/// [`CombineEvent::SweepSkipped`].
pub fn combine(
    options: &CombineOptions,
    events: Option<Sender<CombineEvent>>,
) -> Result<CombineSummary, CombineError> {
    let layout = options.layout()?;
    let scanned = scan(&layout.root, &options.exclusions())?;
    emit(
        &events,
        CombineEvent::Scanned {
            documents: scanned.documents.len(),
            images: scanned.images.len(),
            ambiguous: scanned.index.ambiguous().len(),
        },
    );

    fs::create_dir_all(&layout.tmp_dir)?;

    let mut copier = ImageCopier::new(&layout.output_dir);
    let mut framer = DocumentFramer::new(options.headings);
    let mut references = RewriteStats::default();

    for (i, document) in scanned.documents.iter().enumerate() {
        let sequence = i + 1;
        let relative = scanned.relative(document);
        let source = slash_path(relative);
        let folder = folder_title(relative, &options.root_title);
        let file = file_title(relative);

        let bytes = fs::read(document)?;
        let text = String::from_utf8_lossy(&bytes);
        let document_dir = document.parent().unwrap_or(scanned.root.as_path());
        let rewritten = rewrite_references(&text, document_dir, &scanned.index, &mut copier)?;

        let framed = framer.frame(&folder, &file, &rewritten.text, &source);
        let output = output_name(sequence, &folder, &file);
        fs::write(layout.tmp_dir.join(&output), framed)?;

        references.add(rewritten.stats);
        emit(
            &events,
            CombineEvent::DocumentWritten {
                sequence,
                source,
                output,
                stats: rewritten.stats,
            },
        );
    }

    let mut sweep_skipped = 0;
    for image in &scanned.images {
        if let Err(e) = copier.ensure_copied(image) {
            sweep_skipped += 1;
            emit(
                &events,
                CombineEvent::SweepSkipped {
                    source: slash_path(scanned.relative(image)),
                    error: e.to_string(),
                },
            );
        }
    }

    Ok(CombineSummary {
        layout,
        documents: scanned.documents.len(),
        images_copied: copier.copied(),
        images_renamed: copier.renamed(),
        references,
        sweep_skipped,
    })
}

fn emit(events: &Option<Sender<CombineEvent>>, event: CombineEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening.
        let _ = tx.send(event);
    }
}

/// `NNNNNN__<folder slug>__<file slug>.md`
pub fn output_name(sequence: usize, folder_title: &str, file_title: &str) -> String {
    format!("{:06}__{}__{}.md", sequence, slug(folder_title), slug(file_title))
}

/// Heading for the folder holding `relative`: its directory segments joined by
/// ` / `, or `root_title` for documents directly in the root.
pub fn folder_title(relative: &Path, root_title: &str) -> String {
    let segments: Vec<String> = relative
        .parent()
        .map(|dir| {
            dir.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    if segments.is_empty() {
        clean_title(root_title)
    } else {
        clean_title(&segments.join(" / "))
    }
}

/// Heading for the document itself: its file name without extension.
pub fn file_title(relative: &Path) -> String {
    relative
        .file_stem()
        .map(|s| clean_title(&s.to_string_lossy()))
        .unwrap_or_default()
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
