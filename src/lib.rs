//! # combine-md
//!
//! Flattens a tree of linked markdown notes and their images into one folder
//! of self-contained files, ready to be fed to a document converter such as
//! pandoc in a single call.
//!
//! Note vaults reference images in three ways, and rarely consistently:
//! wiki embeds (`![[diagram.png]]`), markdown images
//! (`![alt](../img/diagram.png)`), and inline HTML (`<img src="diagram.png">`).
//! Paths may be relative to the note, absolute, or just a bare filename of an
//! attachment stored somewhere else in the tree. After flattening, every
//! resolvable reference points at a bare file name next to the documents.
//!
//! # Architecture: Scan, Rewrite, Sweep
//!
//! ```text
//! 1. Scan     vault/        →  documents (natural order), images, basename index
//! 2. Rewrite  each document →  _tmp_md_flat/NNNNNN__folder__file.md
//!                              (images copied into the output folder on first use)
//! 3. Sweep    every image   →  copied too, even if nothing references it
//! ```
//!
//! The scan happens once. Nothing reads the output folder while the run is in
//! progress, and the output folder is excluded from the scan, so re-running on
//! the same vault sees the same input.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`combine`] | Runs the three stages, owns all per-run state |
//! | [`scan`] | Walks the tree with folder exclusions, builds the image index |
//! | [`resolve`] | Turns a raw reference into a source file: path first, basename last |
//! | [`copy`] | Copies each image once under a collision-free flat name |
//! | [`rewrite`] | Rewrites the three reference syntaxes, adds headings and provenance |
//! | [`naming`] | Natural sort key, slugs, URL detection, short hashes |
//! | [`config`] | `combine.toml` loading, validation and merging over stock defaults |
//! | [`convert`] | Runs the external converter over the flat documents |
//! | [`survey`] | Top-level folder listing and size statistics |
//! | [`output`] | CLI output formatting for progress events and summaries |
//!
//! # Design Decisions
//!
//! ## Reading Order From Paths
//!
//! Documents are ordered by a natural sort of their root-relative path, so
//! `Part 2/` comes before `Part 10/` and all documents of one folder stay
//! together. The sequence number in each output name freezes that order for
//! the converter, which only has to sort file names.
//!
//! ## Flat Names Are Claimed, Not Guessed
//!
//! The first image to use a basename keeps it; every later image with the
//! same basename (case-insensitively) gets a short hash of its source path
//! appended. The same source image is copied exactly once and every reference
//! to it shares one name. See [`copy`].
//!
//! ## Leave What Cannot Be Resolved
//!
//! A reference that does not resolve, or that is a URL, is left exactly as
//! written. Broken links stay visible in the converted document instead of
//! disappearing.

pub mod combine;
pub mod config;
pub mod convert;
pub mod copy;
pub mod naming;
pub mod output;
pub mod resolve;
pub mod rewrite;
pub mod scan;
pub mod survey;

#[cfg(test)]
pub(crate) mod test_helpers;
