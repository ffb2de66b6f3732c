//! In-place rewriting of image references.
//!
//! Three reference syntaxes are rewritten, in this order, each by one
//! left-to-right pass of non-overlapping matches:
//!
//! | Pass | Syntax | Rewritten to |
//! |------|--------|--------------|
//! | 1 | `![[target]]`, `![[target\|alias]]` | `![](name)` (alias dropped) |
//! | 2 | `![alt](path "title" attrs)` | `![alt](name title attrs)` |
//! | 3 | `<img ... src="path" ...>` | only the quoted value changes |
//!
//! A reference is only touched when its path carries an image extension *and*
//! resolves to a file (see [`crate::resolve`]). Everything else, including
//! broken links and URLs, is left byte-for-byte as written.
//!
//! Text produced by an earlier pass is sealed: a later match whose replaced
//! span touches it is skipped, so a rewritten `![](fig.png)` is never resolved
//! a second time against the document's directory.
//!
//! [`DocumentFramer`] then wraps the rewritten body with headings and a
//! provenance comment.

use crate::copy::{CopyError, ImageStore};
use crate::naming::{has_image_extension, is_url};
use crate::resolve::resolve;
use crate::scan::ImageIndex;
use regex::{Captures, Regex};
use std::fmt;
use std::fmt::Write as _;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

static WIKI_EMBED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[\[([^\]|]+?)(?:\|[^\]]*)?\]\]").expect("wiki embed pattern must compile")
});

static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("markdown image pattern must compile")
});

static HTML_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<img\b[^>]*\bsrc=)(?:"([^"']+)"|'([^"']+)')"#)
        .expect("html image pattern must compile")
});

/// Reference counts for one document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStats {
    /// Image references pointed at a flat output name.
    pub rewritten: usize,
    /// Image references that matched nothing and were left as written.
    pub unresolved: usize,
}

impl RewriteStats {
    pub fn add(&mut self, other: RewriteStats) {
        self.rewritten += other.rewritten;
        self.unresolved += other.unresolved;
    }
}

impl fmt::Display for RewriteStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unresolved > 0 {
            write!(
                f,
                "{} images linked, {} unresolved",
                self.rewritten, self.unresolved
            )
        } else {
            write!(f, "{} images linked", self.rewritten)
        }
    }
}

/// Output of [`rewrite_references`].
#[derive(Debug)]
pub struct Rewritten {
    pub text: String,
    pub stats: RewriteStats,
}

/// Rewrite every resolvable image reference in `text`.
///
/// `document_dir` is the directory of the document the text came from.
/// Resolved images are handed to `store`, whose returned name replaces the
/// path. Copy failures abort the rewrite.
pub fn rewrite_references<S: ImageStore + ?Sized>(
    text: &str,
    document_dir: &Path,
    index: &ImageIndex,
    store: &mut S,
) -> Result<Rewritten, CopyError> {
    let mut linker = Linker {
        document_dir,
        index,
        store,
        stats: RewriteStats::default(),
    };

    let doc = Document {
        text: text.to_string(),
        sealed: Vec::new(),
    };
    let doc = run_pass(doc, &WIKI_EMBED, whole_match, |caps| linker.wiki_embed(caps))?;
    let doc = run_pass(doc, &MARKDOWN_IMAGE, whole_match, |caps| linker.markdown_image(caps))?;
    let doc = run_pass(doc, &HTML_IMAGE, html_src_value, |caps| linker.html_image(caps))?;

    Ok(Rewritten {
        text: doc.text,
        stats: linker.stats,
    })
}

/// Document text plus the byte ranges earlier passes produced, in order.
struct Document {
    text: String,
    sealed: Vec<Range<usize>>,
}

impl Document {
    fn is_sealed(&self, span: &Range<usize>) -> bool {
        self.sealed
            .iter()
            .any(|r| r.start < span.end && span.start < r.end)
    }
}

fn whole_match(caps: &Captures) -> Option<Range<usize>> {
    caps.get(0).map(|m| m.range())
}

fn html_src_value(caps: &Captures) -> Option<Range<usize>> {
    caps.get(2).or_else(|| caps.get(3)).map(|m| m.range())
}

/// Apply one pattern across the document. `span` picks the bytes of a match
/// that get replaced; matches whose span touches sealed text are skipped.
/// `handler` returns `None` to keep a match unchanged.
///
/// Sealed text may still sit inside the unreplaced part of a match, so an
/// embed in an `<img>` attribute does not hide that tag's `src`.
fn run_pass<F>(
    doc: Document,
    pattern: &Regex,
    span: fn(&Captures) -> Option<Range<usize>>,
    mut handler: F,
) -> Result<Document, CopyError>
where
    F: FnMut(&Captures) -> Result<Option<String>, CopyError>,
{
    let mut edits = Vec::new();
    for caps in pattern.captures_iter(&doc.text) {
        let Some(range) = span(&caps) else { continue };
        if doc.is_sealed(&range) {
            continue;
        }
        if let Some(replacement) = handler(&caps)? {
            edits.push((range, replacement));
        }
    }
    if edits.is_empty() {
        return Ok(doc);
    }

    let mut text = String::with_capacity(doc.text.len());
    let mut sealed = Vec::with_capacity(doc.sealed.len() + edits.len());
    let mut earlier = doc.sealed.iter().peekable();
    let mut last = 0;
    for (range, replacement) in edits {
        while let Some(r) = earlier.next_if(|r| r.end <= range.start) {
            let start = text.len() + r.start - last;
            sealed.push(start..start + r.len());
        }
        text.push_str(&doc.text[last..range.start]);
        let start = text.len();
        text.push_str(&replacement);
        sealed.push(start..text.len());
        last = range.end;
    }
    for r in earlier {
        let start = text.len() + r.start - last;
        sealed.push(start..start + r.len());
    }
    text.push_str(&doc.text[last..]);
    Ok(Document { text, sealed })
}

/// Per-document resolution state shared by the three passes.
struct Linker<'a, S: ?Sized> {
    document_dir: &'a Path,
    index: &'a ImageIndex,
    store: &'a mut S,
    stats: RewriteStats,
}

impl<S: ImageStore + ?Sized> Linker<'_, S> {
    /// Resolve and copy an image reference, returning its flat name.
    fn link(&mut self, reference: &str) -> Result<Option<String>, CopyError> {
        if is_url(reference.trim()) {
            return Ok(None);
        }
        match resolve(reference, self.document_dir, self.index) {
            Some(source) => {
                let name = self.store.ensure_copied(&source)?;
                self.stats.rewritten += 1;
                Ok(Some(name))
            }
            None => {
                self.stats.unresolved += 1;
                Ok(None)
            }
        }
    }

    fn wiki_embed(&mut self, caps: &Captures) -> Result<Option<String>, CopyError> {
        let target = caps[1].trim();
        if !has_image_extension(target) {
            return Ok(None);
        }
        Ok(self.link(target)?.map(|name| format!("![]({name})")))
    }

    fn markdown_image(&mut self, caps: &Captures) -> Result<Option<String>, CopyError> {
        let alt = &caps[1];
        let inner = caps[2].trim();
        let inner = inner
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
            .unwrap_or(inner);

        let tokens = tokenize(inner);
        let Some((path, rest)) = tokens.split_first() else {
            return Ok(None);
        };
        if !has_image_extension(path) {
            return Ok(None);
        }
        let Some(name) = self.link(path)? else {
            return Ok(None);
        };

        if rest.is_empty() {
            Ok(Some(format!("![{alt}]({name})")))
        } else {
            Ok(Some(format!("![{alt}]({name} {})", rest.join(" "))))
        }
    }

    /// Returns only the new `src` value; the tag around it is kept.
    fn html_image(&mut self, caps: &Captures) -> Result<Option<String>, CopyError> {
        let Some(value) = caps.get(2).or_else(|| caps.get(3)) else {
            return Ok(None);
        };
        if !has_image_extension(value.as_str()) {
            return Ok(None);
        }
        self.link(value.as_str())
    }
}

/// Split the inside of `![alt](...)` into shell-style tokens.
///
/// `#` has no comment meaning here: `pic.png #center` is two tokens. Malformed
/// quoting keeps the whole span as one literal token.
fn tokenize(inner: &str) -> Vec<String> {
    shlex::split(&escape_word_hashes(inner)).unwrap_or_else(|| vec![inner.to_string()])
}

/// Backslash-escape every `#` that starts an unquoted word, so `shlex` keeps
/// it as a literal character instead of dropping the rest of the line.
fn escape_word_hashes(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len() + 4);
    let mut chars = inner.chars();
    let mut quote: Option<char> = None;
    let mut word_start = true;
    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => {
                out.push(ch);
                if ch == q {
                    quote = None;
                } else if q == '"' && ch == '\\' {
                    out.extend(chars.next());
                }
            }
            None => match ch {
                ' ' | '\t' | '\n' => {
                    out.push(ch);
                    word_start = true;
                    continue;
                }
                '#' if word_start => out.push_str("\\#"),
                '\\' => {
                    out.push(ch);
                    out.extend(chars.next());
                }
                '"' | '\'' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                _ => out.push(ch),
            },
        }
        word_start = false;
    }
    out
}

/// Heading depths for folder and file headings, clamped to `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingStyle {
    folder_level: u8,
    file_level: u8,
}

impl HeadingStyle {
    pub fn new(folder_level: i64, file_level: i64) -> Self {
        Self {
            folder_level: clamp_level(folder_level),
            file_level: clamp_level(file_level),
        }
    }

    pub fn folder_level(&self) -> u8 {
        self.folder_level
    }

    pub fn file_level(&self) -> u8 {
        self.file_level
    }
}

impl Default for HeadingStyle {
    fn default() -> Self {
        Self::new(1, 2)
    }
}

fn clamp_level(level: i64) -> u8 {
    level.clamp(1, 6) as u8
}

/// Adds headings and provenance to rewritten documents, in document order.
///
/// A folder heading is emitted only when the folder differs from the previous
/// document's, so consecutive documents of one folder share a single heading.
#[derive(Debug, Default)]
pub struct DocumentFramer {
    style: HeadingStyle,
    last_folder: Option<String>,
}

impl DocumentFramer {
    pub fn new(style: HeadingStyle) -> Self {
        Self {
            style,
            last_folder: None,
        }
    }

    /// Wrap `body`. `source` is the document's root-relative path.
    pub fn frame(&mut self, folder_title: &str, file_title: &str, body: &str, source: &str) -> String {
        let mut out = String::with_capacity(body.len() + folder_title.len() + file_title.len() + 64);
        let folder_marks = "#".repeat(self.style.folder_level as usize);
        let file_marks = "#".repeat(self.style.file_level as usize);

        if self.last_folder.as_deref() != Some(folder_title) {
            let _ = write!(out, "\n\n{folder_marks} {folder_title}\n\n");
            self.last_folder = Some(folder_title.to_string());
        }
        let _ = write!(out, "{file_marks} {file_title}\n\n");
        out.push_str(body);
        let _ = write!(out, "\n\n<!-- Source: {source} -->\n\n");
        out
    }
}
