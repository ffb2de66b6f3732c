//! End-to-end flatten runs over throw-away vaults.
//!
//! Each test builds a small vault in a temp directory, runs the public
//! `combine` entry point, and inspects the output folder the way a converter
//! would see it.

use combine_md::combine::{CombineOptions, CombineSummary, combine, reset_output};
use combine_md::convert::collect_documents;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ===========================================================================
// Helpers
// ===========================================================================

fn vault(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (rel, contents) in files {
        let path = tmp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    tmp
}

fn run(root: &Path) -> CombineSummary {
    let options = CombineOptions::new(root);
    reset_output(&options.layout().unwrap()).unwrap();
    combine(&options, None).unwrap()
}

/// File name → contents for every file directly inside `dir`.
fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| {
            (
                e.file_name().to_string_lossy().into_owned(),
                fs::read(e.path()).unwrap(),
            )
        })
        .collect()
}

fn image_names(summary: &CombineSummary) -> Vec<String> {
    snapshot(&summary.layout.output_dir).into_keys().collect()
}

/// Documents in converter order, as text.
fn documents(summary: &CombineSummary) -> Vec<(String, String)> {
    collect_documents(&summary.layout.tmp_dir)
        .unwrap()
        .into_iter()
        .map(|p| {
            let name = p.file_name().unwrap().to_string_lossy().into_owned();
            (name, fs::read_to_string(&p).unwrap())
        })
        .collect()
}

fn document(summary: &CombineSummary, suffix: &str) -> String {
    documents(summary)
        .into_iter()
        .find(|(name, _)| name.ends_with(suffix))
        .map(|(_, text)| text)
        .unwrap_or_else(|| panic!("no document ending in {suffix}"))
}

// ===========================================================================
// Ordering and naming
// ===========================================================================

#[test]
fn documents_follow_natural_order_of_paths() {
    let tmp = vault(&[
        ("Part 10/a.md", ""),
        ("Part 2/b.md", ""),
        ("Part 2/a.md", ""),
        ("Part 1/z.md", ""),
    ]);
    let summary = run(tmp.path());

    let names: Vec<String> = documents(&summary).into_iter().map(|(n, _)| n).collect();
    assert_eq!(
        names,
        [
            "000001__Part 1__z.md",
            "000002__Part 2__a.md",
            "000003__Part 2__b.md",
            "000004__Part 10__a.md",
        ]
    );
}

#[test]
fn nested_folders_titled_with_separators() {
    let tmp = vault(&[("Travel/Japan/Tokyo.md", "day one")]);
    let summary = run(tmp.path());

    let (name, text) = &documents(&summary)[0];
    assert_eq!(name, "000001__Travel - Japan__Tokyo.md");
    assert!(text.starts_with("\n\n# Travel / Japan\n\n## Tokyo\n\nday one"));
    assert!(text.ends_with("<!-- Source: Travel/Japan/Tokyo.md -->\n\n"));
}

#[test]
fn folder_heading_written_once_per_folder_run() {
    let tmp = vault(&[
        ("A/1.md", "one"),
        ("A/2.md", "two"),
        ("A/3.md", "three"),
        ("B/1.md", "four"),
    ]);
    let summary = run(tmp.path());

    let all: String = documents(&summary).into_iter().map(|(_, t)| t).collect();
    assert_eq!(all.matches("\n# A\n").count(), 1);
    assert_eq!(all.matches("\n# B\n").count(), 1);
    assert_eq!(all.matches("\n## ").count(), 4);
    assert!(document(&summary, "__A__2.md").starts_with("## 2\n\n"));
}

// ===========================================================================
// Images
// ===========================================================================

#[test]
fn same_basename_in_two_folders_gets_two_names() {
    let tmp = vault(&[
        ("a/note.md", "![](fig.png)"),
        ("a/fig.png", "from a"),
        ("b/note.md", "![](fig.png)"),
        ("b/fig.png", "from b"),
    ]);
    let summary = run(tmp.path());
    let out = &summary.layout.output_dir;

    let images = image_names(&summary);
    assert_eq!(images.len(), 2);
    assert_eq!(summary.images_renamed, 1);

    let a = document(&summary, "__a__note.md");
    let b = document(&summary, "__b__note.md");
    assert!(a.contains("![](fig.png)"));
    let renamed = images.iter().find(|n| *n != "fig.png").unwrap();
    assert!(b.contains(&format!("![]({renamed})")));
    assert_eq!(fs::read_to_string(out.join("fig.png")).unwrap(), "from a");
    assert_eq!(fs::read_to_string(out.join(renamed)).unwrap(), "from b");
}

#[test]
fn one_image_referenced_many_ways_is_copied_once() {
    let tmp = vault(&[
        ("notes/one.md", "![[pic.png]]\n![x](../media/pic.png)"),
        ("notes/two.md", "<img src=\"pic.png\" width=\"50\">"),
        ("media/pic.png", "p"),
    ]);
    let summary = run(tmp.path());

    assert_eq!(image_names(&summary), ["pic.png"]);
    assert_eq!(summary.references.rewritten, 3);
    assert!(document(&summary, "one.md").contains("![](pic.png)\n![x](pic.png)"));
    assert!(document(&summary, "two.md").contains("<img src=\"pic.png\" width=\"50\">"));
}

#[test]
fn unreferenced_images_are_swept() {
    let tmp = vault(&[("a.md", "no images"), ("assets/logo.svg", "<svg/>")]);
    let summary = run(tmp.path());
    assert_eq!(image_names(&summary), ["logo.svg"]);
}

#[test]
fn non_image_references_untouched() {
    let text = "![[Other Note]]\n![[Other Note|alias]]\n![spec](spec.pdf)\n[link](b.md)";
    let tmp = vault(&[("a.md", text), ("spec.pdf", "pdf"), ("b.md", "")]);
    let summary = run(tmp.path());

    assert!(document(&summary, "__a.md").contains(text));
    assert!(image_names(&summary).is_empty());
}

#[test]
fn broken_and_remote_references_left_as_written() {
    let text = "![](missing.png) ![[gone.jpg]] ![r](https://example.com/r.png) <img src='http://x/y.gif'>";
    let tmp = vault(&[("a.md", text)]);
    let summary = run(tmp.path());

    assert!(document(&summary, "__a.md").contains(text));
    assert_eq!(summary.references.rewritten, 0);
    assert_eq!(summary.references.unresolved, 2);
}

#[test]
fn html_attributes_preserved() {
    let tmp = vault(&[
        (
            "a.md",
            r#"<p><img class="wide" SRC='img/p.png' alt="P" data-x=1/></p>"#,
        ),
        ("img/p.png", "p"),
    ]);
    let summary = run(tmp.path());
    assert!(
        document(&summary, "__a.md")
            .contains(r#"<p><img class="wide" SRC='p.png' alt="P" data-x=1/></p>"#)
    );
}

#[test]
fn image_found_by_basename_anywhere() {
    let tmp = vault(&[
        ("Projects/plan.md", "![d](attachments/diagram.png)"),
        ("Resources/Attachments/diagram.png", "d"),
    ]);
    let summary = run(tmp.path());
    assert!(document(&summary, "plan.md").contains("![d](diagram.png)"));
}

// ===========================================================================
// Exclusions
// ===========================================================================

#[test]
fn ignored_folders_pruned_everywhere() {
    let tmp = vault(&[
        ("keep.md", "![](secret.png)"),
        ("Deep/Nested/Private/hidden.md", ""),
        ("Deep/Nested/Private/secret.png", "s"),
        ("Deep/Nested/ok.png", "o"),
    ]);
    let mut options = CombineOptions::new(tmp.path());
    options.ignore = vec!["private".into()];
    let summary = combine(&options, None).unwrap();

    assert_eq!(summary.documents, 1);
    assert_eq!(image_names(&summary), ["ok.png"]);
    // Excluded images are not even reachable by basename.
    assert!(document(&summary, "keep.md").contains("![](secret.png)"));
    assert_eq!(summary.references.unresolved, 1);
}

// ===========================================================================
// Re-runs
// ===========================================================================

#[test]
fn rerun_after_reset_is_byte_identical() {
    let tmp = vault(&[
        ("Intro.md", "![[a.png]]"),
        ("x/a.png", "xa"),
        ("y/a.png", "ya"),
        ("y/Notes.md", "<img src=\"a.png\">"),
    ]);
    let first = run(tmp.path());
    let images = snapshot(&first.layout.output_dir);
    let docs = snapshot(&first.layout.tmp_dir);

    let second = run(tmp.path());
    assert_eq!(snapshot(&second.layout.output_dir), images);
    assert_eq!(snapshot(&second.layout.tmp_dir), docs);
}

#[test]
fn rerun_without_reset_never_overwrites_images() {
    let tmp = vault(&[("a.md", "![](pic.png)"), ("pic.png", "p")]);
    let options = CombineOptions::new(tmp.path());
    combine(&options, None).unwrap();
    let second = combine(&options, None).unwrap();

    let images = image_names(&second);
    assert_eq!(images.len(), 2);
    assert_eq!(second.images_renamed, 1);
    // Documents are rewritten in place with the same names.
    assert_eq!(documents(&second).len(), 1);
}
