//! Hand-off to the external document converter.
//!
//! The flat folder is the input format for a converter such as pandoc. Once a
//! flatten run has finished, the documents in the temp folder are passed in
//! file name order, which is the sequence order:
//!
//! ```text
//! pandoc -s <tmp>/000001__Intro__a.md <tmp>/000002__Intro__b.md ... -o <out>/combined.rtf
//! ```
//!
//! The converter runs with the output folder as its working directory, so the
//! bare image names written by the rewriter resolve against the flat images
//! sitting next to the temp folder.

use crate::combine::OutputLayout;
use crate::naming::is_markdown_name;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("No markdown documents found in {}", .0.display())]
    NoDocuments(PathBuf),
    #[error("Converter not found: {0}")]
    MissingTool(String),
    #[error("{program} failed ({}): {stderr}", exit_label(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "terminated by signal".to_string(),
    }
}

/// Target document format. Also the extension of the produced file.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ConvertFormat {
    #[default]
    Rtf,
    Docx,
    Md,
}

impl ConvertFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ConvertFormat::Rtf => "rtf",
            ConvertFormat::Docx => "docx",
            ConvertFormat::Md => "md",
        }
    }
}

impl fmt::Display for ConvertFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Which converter to run and what it should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSettings {
    pub program: String,
    pub format: ConvertFormat,
    /// File name of the result, without extension.
    pub output_basename: String,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            program: "pandoc".to_string(),
            format: ConvertFormat::default(),
            output_basename: "combined".to_string(),
        }
    }
}

impl ConvertSettings {
    /// Where the converted document lands.
    pub fn output_path(&self, layout: &OutputLayout) -> PathBuf {
        layout.output_dir.join(format!(
            "{}.{}",
            self.output_basename,
            self.format.extension()
        ))
    }
}

/// Every markdown document directly inside `tmp_dir`, sorted by file name.
///
/// A missing or empty folder means the flatten run produced nothing.
pub fn collect_documents(tmp_dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    if !tmp_dir.is_dir() {
        return Err(ConvertError::NoDocuments(tmp_dir.to_path_buf()));
    }
    let mut documents = Vec::new();
    for entry in fs::read_dir(tmp_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && is_markdown_name(&entry.file_name().to_string_lossy()) {
            documents.push(path);
        }
    }
    if documents.is_empty() {
        return Err(ConvertError::NoDocuments(tmp_dir.to_path_buf()));
    }
    documents.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(documents)
}

/// Command-line arguments for a standalone conversion of `documents` into `output`.
pub fn converter_args(documents: &[PathBuf], output: &Path) -> Vec<String> {
    let mut args = Vec::with_capacity(documents.len() + 3);
    args.push("-s".to_string());
    args.extend(documents.iter().map(|d| d.to_string_lossy().into_owned()));
    args.push("-o".to_string());
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Run the converter over `documents` and return the produced file's path.
pub fn run_converter(
    settings: &ConvertSettings,
    layout: &OutputLayout,
    documents: &[PathBuf],
) -> Result<PathBuf, ConvertError> {
    if documents.is_empty() {
        return Err(ConvertError::NoDocuments(layout.tmp_dir.clone()));
    }
    let output = settings.output_path(layout);

    let result = Command::new(&settings.program)
        .args(converter_args(documents, &output))
        .current_dir(&layout.output_dir)
        .output();
    let result = match result {
        Ok(r) => r,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConvertError::MissingTool(settings.program.clone()));
        }
        Err(e) => return Err(e.into()),
    };

    if !result.status.success() {
        return Err(ConvertError::Failed {
            program: settings.program.clone(),
            code: result.status.code(),
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        });
    }
    Ok(output)
}
