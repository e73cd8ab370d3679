use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::html::{ReferenceExtractor, TagScanner};
use crate::runtime::normalize_for_display;

/// Maximum findings printed per kind; counts are always complete.
pub const PREVIEW_LIMIT: usize = 20;

const EXTERNAL_PREFIXES: &[&str] = &["http", "mailto:", "tel:"];
const INDEX_DOCUMENT: &str = "index.html";

#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub content: String,
}

impl Document {
    /// Read a built document. Invalid UTF-8 is replaced rather than rejected.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            content: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingAsset {
    pub document: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AltTextViolation {
    pub document: PathBuf,
    pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentFindings {
    pub references_checked: usize,
    pub missing_assets: Vec<MissingAsset>,
    pub alt_violations: Vec<AltTextViolation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub root: PathBuf,
    pub documents_scanned: usize,
    pub references_checked: usize,
    pub missing_assets: Vec<MissingAsset>,
    pub alt_violations: Vec<AltTextViolation>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.missing_assets.is_empty() && self.alt_violations.is_empty()
    }

    pub fn total_findings(&self) -> usize {
        self.missing_assets.len() + self.alt_violations.len()
    }

    /// Failure summary grouped by kind, each group capped at [`PREVIEW_LIMIT`].
    pub fn render_findings(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.alt_violations.is_empty() {
            lines.push(format!(
                "Images missing alt ({}):",
                self.alt_violations.len()
            ));
            for violation in self.alt_violations.iter().take(PREVIEW_LIMIT) {
                lines.push(format!(
                    " - {}: {}",
                    self.display_document(&violation.document),
                    violation.tag
                ));
            }
            push_overflow(&mut lines, self.alt_violations.len());
        }
        if !self.missing_assets.is_empty() {
            lines.push(format!(
                "Missing assets/internal links ({}):",
                self.missing_assets.len()
            ));
            for missing in self.missing_assets.iter().take(PREVIEW_LIMIT) {
                lines.push(format!(
                    " - {} -> {}",
                    self.display_document(&missing.document),
                    missing.url
                ));
            }
            push_overflow(&mut lines, self.missing_assets.len());
        }
        lines
    }

    fn display_document(&self, document: &Path) -> String {
        normalize_for_display(document.strip_prefix(&self.root).unwrap_or(document))
    }
}

fn push_overflow(lines: &mut Vec<String>, total: usize) {
    if total > PREVIEW_LIMIT {
        lines.push(format!("   ... and {} more", total - PREVIEW_LIMIT));
    }
}

/// Check every built HTML document under `root` with the default tag scanner.
pub fn check_site(root: &Path) -> Result<CheckReport> {
    check_site_with(root, &TagScanner)
}

pub fn check_site_with(root: &Path, extractor: &dyn ReferenceExtractor) -> Result<CheckReport> {
    if !root.is_dir() {
        bail!(
            "build output not found: {} (run the site build first)",
            root.display()
        );
    }

    let documents = html_documents(root)?;
    let mut report = CheckReport {
        root: root.to_path_buf(),
        documents_scanned: documents.len(),
        references_checked: 0,
        missing_assets: Vec::new(),
        alt_violations: Vec::new(),
    };

    for path in documents {
        let document = Document::read(&path)?;
        let findings = check_document(root, &document, extractor);
        debug!(
            document = %path.display(),
            references = findings.references_checked,
            missing = findings.missing_assets.len(),
            alt = findings.alt_violations.len(),
            "checked document"
        );
        report.references_checked += findings.references_checked;
        report.missing_assets.extend(findings.missing_assets);
        report.alt_violations.extend(findings.alt_violations);
    }

    Ok(report)
}

/// Check one document's images and local references against the output root.
pub fn check_document(
    root: &Path,
    document: &Document,
    extractor: &dyn ReferenceExtractor,
) -> DocumentFindings {
    let mut findings = DocumentFindings::default();

    for image in extractor.extract_images(&document.content) {
        if !image.has_alt_text() {
            findings.alt_violations.push(AltTextViolation {
                document: document.path.clone(),
                tag: image.raw,
            });
        }
    }

    for reference in extractor.extract_references(&document.content) {
        let path = reference.path;
        // Relative references are accepted unresolved and not counted.
        if is_external(&path) || !path.starts_with('/') {
            continue;
        }
        findings.references_checked += 1;
        if !resolves_locally(root, &path) {
            findings.missing_assets.push(MissingAsset {
                document: document.path.clone(),
                url: path,
            });
        }
    }

    findings
}

pub fn is_external(url: &str) -> bool {
    EXTERNAL_PREFIXES
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

/// Resolve a reference path against the output root.
///
/// Paths that are not root-relative are accepted without resolution. A
/// root-relative path is valid when it names a file, a directory holding
/// `index.html`, or a file once `.html` is appended.
pub fn resolves_locally(root: &Path, url_path: &str) -> bool {
    let Some(relative) = url_path.strip_prefix('/') else {
        return true;
    };
    let local = root.join(relative.trim_start_matches('/'));

    if local.is_file() {
        return true;
    }
    if local.is_dir() && local.join(INDEX_DOCUMENT).is_file() {
        return true;
    }
    let mut with_extension = local.into_os_string();
    with_extension.push(".html");
    PathBuf::from(with_extension).is_file()
}

/// All `.html` files under `root`, sorted by path.
pub fn html_documents(root: &Path) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_html = entry
            .path()
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("html"));
        if is_html {
            documents.push(entry.into_path());
        }
    }
    documents.sort();
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::html::{ImageTag, Reference, TagKind};

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
        fs::write(path, content).expect("write fixture");
    }

    fn site_fixture() -> tempfile::TempDir {
        let temp = tempdir().expect("tempdir");
        let root = temp.path();
        write(root, "index.html", "<html></html>");
        write(root, "about.html", "<html></html>");
        write(root, "works/index.html", "<html></html>");
        write(root, "works/night-drive/index.html", "<html></html>");
        write(root, "works/night-drive/cover.jpg", "jpeg");
        write(root, "_astro/site.css", "body{}");
        temp
    }

    #[test]
    fn resolution_accepts_file_directory_index_and_clean_urls() {
        let temp = site_fixture();
        let root = temp.path();
        assert!(resolves_locally(root, "/works/night-drive/cover.jpg"));
        assert!(resolves_locally(root, "/works/night-drive"));
        assert!(resolves_locally(root, "/works/night-drive/"));
        assert!(resolves_locally(root, "/about"));
        assert!(resolves_locally(root, "/"));
        assert!(!resolves_locally(root, "/contact"));
        assert!(!resolves_locally(root, "/works/missing/cover.jpg"));
    }

    #[test]
    fn directory_without_index_is_missing() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("empty")).expect("create dir");
        assert!(!resolves_locally(temp.path(), "/empty"));
    }

    #[test]
    fn relative_references_are_accepted_unresolved() {
        let temp = tempdir().expect("tempdir");
        assert!(resolves_locally(temp.path(), "cover.jpg"));
        assert!(resolves_locally(temp.path(), "../elsewhere/page"));
    }

    #[test]
    fn clean_site_reports_no_findings() {
        let temp = site_fixture();
        write(
            temp.path(),
            "works/night-drive/index.html",
            r#"<link rel="stylesheet" href="/_astro/site.css">
<a href="/works/">All works</a>
<a href="/about#team">About</a>
<img src="/works/night-drive/cover.jpg?v=3" alt="Night Drive cover frame">"#,
        );

        let report = check_site(temp.path()).expect("check");
        assert!(report.is_clean());
        assert_eq!(report.documents_scanned, 4);
        assert_eq!(report.references_checked, 4);
        assert!(report.render_findings().is_empty());
    }

    #[test]
    fn each_broken_reference_is_reported_once() {
        let temp = site_fixture();
        write(
            temp.path(),
            "index.html",
            r#"<a href="/contact">Contact</a>
<img src="/works/gone/cover.jpg" alt="gone">
<video poster="/works/gone/poster.jpg"><source src="/media/gone.mp4"></video>
<script src="/_astro/missing.js"></script>
<a href="/about">About</a>"#,
        );

        let report = check_site(temp.path()).expect("check");
        let urls = report
            .missing_assets
            .iter()
            .map(|missing| missing.url.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            urls,
            vec![
                "/contact",
                "/works/gone/cover.jpg",
                "/media/gone.mp4",
                "/works/gone/poster.jpg",
                "/_astro/missing.js",
            ]
        );
        assert!(report.alt_violations.is_empty());
        assert!(!report.is_clean());
    }

    #[test]
    fn external_references_never_produce_findings() {
        let temp = site_fixture();
        write(
            temp.path(),
            "index.html",
            r##"<a href="https://unreachable.invalid/x">x</a>
<a href="http://unreachable.invalid/y">y</a>
<a href="mailto:studio@example.com">mail</a>
<a href="tel:+15550100">call</a>
<a href="#top">top</a>"##,
        );

        let report = check_site(temp.path()).expect("check");
        assert!(report.is_clean());
        assert_eq!(report.references_checked, 0);
    }

    #[test]
    fn alt_violations_are_independent_of_resolution() {
        let temp = site_fixture();
        write(
            temp.path(),
            "index.html",
            r#"<img src="/works/night-drive/cover.jpg">
<img src="/works/gone.jpg" alt="">"#,
        );

        let report = check_site(temp.path()).expect("check");
        assert_eq!(report.alt_violations.len(), 2);
        assert_eq!(
            report.alt_violations[0].tag,
            r#"<img src="/works/night-drive/cover.jpg">"#
        );
        assert_eq!(report.missing_assets.len(), 1);
    }

    #[test]
    fn whitespace_alt_satisfies_the_alt_rule() {
        let temp = site_fixture();
        write(
            temp.path(),
            "index.html",
            r#"<img src="/works/night-drive/cover.jpg" alt=" ">"#,
        );

        let report = check_site(temp.path()).expect("check");
        assert!(report.alt_violations.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn only_root_relative_references_are_counted() {
        let temp = site_fixture();
        write(
            temp.path(),
            "index.html",
            r#"<a href="about">About</a>
<img src="cover.jpg" alt="relative">
<a href="../works/">Works</a>
<a href="/about">About</a>"#,
        );

        let report = check_site(temp.path()).expect("check");
        assert!(report.is_clean());
        assert_eq!(report.references_checked, 1);
    }

    #[test]
    fn invalid_utf8_document_is_still_checked() {
        let temp = site_fixture();
        let mut bytes = b"<p>caf\xe9</p>".to_vec();
        bytes.extend_from_slice(br#"<img src="/works/gone.jpg">"#);
        fs::write(temp.path().join("legacy.html"), bytes).expect("write legacy");

        let report = check_site(temp.path()).expect("check");
        assert_eq!(report.documents_scanned, 5);
        assert_eq!(report.alt_violations.len(), 1);
        assert_eq!(report.missing_assets.len(), 1);
        assert_eq!(report.missing_assets[0].url, "/works/gone.jpg");
    }

    #[test]
    fn non_html_files_are_not_inspected() {
        let temp = tempdir().expect("tempdir");
        write(temp.path(), "feed.xml", r#"<img src="/nope.png">"#);
        write(temp.path(), "page.htm", r#"<img src="/nope.png">"#);
        let report = check_site(temp.path()).expect("check");
        assert_eq!(report.documents_scanned, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let error = check_site(&temp.path().join("dist")).expect_err("must fail");
        assert!(error.to_string().contains("build output not found"));
    }

    #[test]
    fn rendered_groups_are_capped() {
        let temp = tempdir().expect("tempdir");
        let page = (0..25)
            .map(|index| format!(r#"<a href="/missing-{index}">x</a>"#))
            .collect::<String>();
        write(temp.path(), "index.html", &page);

        let report = check_site(temp.path()).expect("check");
        assert_eq!(report.missing_assets.len(), 25);
        let lines = report.render_findings();
        assert_eq!(lines[0], "Missing assets/internal links (25):");
        assert_eq!(lines[1], " - index.html -> /missing-0");
        assert_eq!(lines.len(), 1 + PREVIEW_LIMIT + 1);
        assert_eq!(lines[lines.len() - 1], "   ... and 5 more");
    }

    struct FixedExtractor;

    impl ReferenceExtractor for FixedExtractor {
        fn extract_references(&self, _html: &str) -> Vec<Reference> {
            vec![Reference::new(TagKind::Anchor, "/nowhere?q=1")]
        }

        fn extract_images(&self, _html: &str) -> Vec<ImageTag> {
            vec![ImageTag {
                raw: "<img>".to_string(),
                alt: None,
            }]
        }
    }

    #[test]
    fn check_document_uses_supplied_extractor() {
        let temp = tempdir().expect("tempdir");
        let document = Document {
            path: temp.path().join("index.html"),
            content: String::new(),
        };
        let findings = check_document(temp.path(), &document, &FixedExtractor);
        assert_eq!(findings.references_checked, 1);
        assert_eq!(findings.missing_assets[0].url, "/nowhere");
        assert_eq!(findings.alt_violations[0].tag, "<img>");
    }
}
