//! Path and name helpers shared by every stage.
//!
//! Everything here is pure string and path manipulation without filesystem
//! access, so the ordering, hashing and slugging rules can be tested in isolation.
//!
//! ## Natural Order
//!
//! Documents are ordered by a natural key over their root-relative path: digit
//! runs compare as integers, everything else compares case-insensitively.
//!
//! - `notes/a1.md` < `notes/a2.md` < `notes/a10.md`
//! - `Chapter 2/intro.md` < `chapter 10/intro.md`
//!
//! ## Output Names
//!
//! Flat output documents are named `NNNNNN__<folder>__<file>.md`. The folder and
//! file parts go through [`slug`], which keeps spaces and most punctuation but
//! replaces characters that are illegal on common filesystems:
//! - `Travel / Japan` → `Travel - Japan`
//! - `What? Why: "now"` → `What- Why- -now-`

use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

/// Image extensions (lowercase, without dot) that are resolved and copied.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "tif", "tiff",
];

/// Maximum length of a slugged title, in characters.
pub const SLUG_MAX_CHARS: usize = 120;

/// True if the last path segment of `reference` carries an image extension.
pub fn has_image_extension(reference: &str) -> bool {
    Path::new(reference)
        .extension()
        .map(|e| {
            let ext = e.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// True for file names ending in `.md`, case-insensitively.
pub fn is_markdown_name(name: &str) -> bool {
    name.to_lowercase().ends_with(".md")
}

/// True if `name` is usable as a single directory or file name: non-empty,
/// not `.` or `..`, and free of path separators.
pub fn is_plain_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

/// One segment of a [`NaturalKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyPart {
    /// Lowercased non-digit run (may be empty).
    Text(String),
    /// Digit run with leading zeros stripped, compared by numeric value.
    Number(String),
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyPart::Text(a), KeyPart::Text(b)) => a.cmp(b),
            (KeyPart::Number(a), KeyPart::Number(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (KeyPart::Number(_), KeyPart::Text(_)) => Ordering::Less,
            (KeyPart::Text(_), KeyPart::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort key that orders `file2` before `file10`.
///
/// The key alternates text and number parts, always starting and ending with a
/// (possibly empty) text part, so two keys never compare a number against text
/// at the same position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalKey(Vec<KeyPart>);

/// Build the natural sort key for a string.
pub fn natural_key(s: &str) -> NaturalKey {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if !c.is_ascii_digit() {
            text.push(c);
            continue;
        }
        parts.push(KeyPart::Text(std::mem::take(&mut text).to_lowercase()));
        let mut digits = String::from(c);
        while let Some(&d) = chars.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            digits.push(d);
            chars.next();
        }
        parts.push(KeyPart::Number(digits.trim_start_matches('0').to_string()));
    }
    parts.push(KeyPart::Text(text.to_lowercase()));

    NaturalKey(parts)
}

/// True if the reference starts with a URI scheme (`https:`, `mailto:`, `data:`...).
///
/// A scheme is an ASCII letter followed by letters, digits, `+`, `-` or `.`.
pub fn is_url(reference: &str) -> bool {
    let mut chars = reference.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    for c in chars {
        match c {
            ':' => return true,
            c if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.') => {}
            _ => return false,
        }
    }
    false
}

/// First 8 hex characters of the SHA-256 digest of `s`.
///
/// Used to disambiguate output names, so it hashes the *path string*, not the
/// file contents.
pub fn short_hash(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(8);
    hex
}

/// Collapse runs of `\r`, `\n` and `\t` into one space and trim.
///
/// Headings must stay on a single line.
pub fn clean_title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_break = false;
    for c in s.chars() {
        if matches!(c, '\r' | '\n' | '\t') {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(c);
            in_break = false;
        }
    }
    out.trim().to_string()
}

/// Filesystem-friendly version of a title.
///
/// Replaces `/ \ : < > " | ? *` with `-`, collapses whitespace runs to a single
/// space, trims, and truncates to [`SLUG_MAX_CHARS`] characters.
pub fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
            continue;
        }
        in_space = false;
        if matches!(c, '/' | '\\' | ':' | '<' | '>' | '"' | '|' | '?' | '*') {
            out.push('-');
        } else {
            out.push(c);
        }
    }
    out.trim().chars().take(SLUG_MAX_CHARS).collect()
}

/// Lexically normalize a path: drop `.` segments and fold `..` into its parent.
///
/// Never touches the filesystem, so symlinks are not resolved. Two spellings of
/// the same location (`img/a.png`, `./img/../img/a.png`) normalize identically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
