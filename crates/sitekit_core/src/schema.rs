//! Typed frontmatter for the `works` content collection.
//!
//! Mirrors the site's collection schema so documents written by the migrator
//! and documents edited by hand can be validated the same way.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::check::PREVIEW_LIMIT;
use crate::runtime::normalize_for_display;

pub const FRONTMATTER_DELIMITER: &str = "---";
pub const DOCUMENT_EXTENSION: &str = "mdx";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photo,
    Video,
    #[default]
    Mixed,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aspect {
    #[default]
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "4:3")]
    Standard,
}

impl Aspect {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Widescreen => "16:9",
            Self::Standard => "4:3",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalVideoKind {
    #[default]
    Youtube,
}

impl ExternalVideoKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub width: u32,
    pub height: u32,
    pub alt: String,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    pub src: String,
    pub srclang: String,
    pub label: String,
    #[serde(default)]
    pub default: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub src: String,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub aspect: Aspect,
    #[serde(default)]
    pub captions: Option<Vec<Caption>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalVideo {
    pub kind: ExternalVideoKind,
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub aspect: Aspect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkFrontmatter {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub media_type: MediaType,
    pub cover: Image,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub external_videos: Vec<ExternalVideo>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl WorkFrontmatter {
    /// Constraints the type system does not carry.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (label, image) in std::iter::once(("cover", &self.cover)).chain(
            self.images
                .iter()
                .map(|image| ("images[]", image)),
        ) {
            if image.width == 0 || image.height == 0 {
                problems.push(format!(
                    "{label} {} must have positive width and height",
                    image.src
                ));
            }
        }
        for video in &self.external_videos {
            if video.id.trim().is_empty() {
                problems.push("externalVideos[] id must not be empty".to_string());
            }
        }
        problems
    }
}

/// Split a document into its frontmatter text and body.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let first_line_end = content.find('\n')?;
    if content[..first_line_end].trim_end() != FRONTMATTER_DELIMITER {
        return None;
    }
    let rest = &content[first_line_end + 1..];
    let mut offset = 0usize;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONTMATTER_DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

pub fn parse_frontmatter(content: &str) -> Result<WorkFrontmatter> {
    let Some((yaml, _)) = split_frontmatter(content) else {
        bail!("missing frontmatter block");
    };
    serde_yaml::from_str(yaml).context("frontmatter does not match the works schema")
}

/// Render frontmatter in the collection's canonical key order, delimiters included.
pub fn render_frontmatter(frontmatter: &WorkFrontmatter) -> Result<String> {
    let mut lines = vec![
        FRONTMATTER_DELIMITER.to_string(),
        format!("title: {}", yaml_scalar(&frontmatter.title)?),
        format!("date: {}", quoted_scalar(&frontmatter.date)?),
        format!("mediaType: {}", frontmatter.media_type.as_str()),
        "cover:".to_string(),
    ];
    push_image_fields(&mut lines, &frontmatter.cover, "  ", "  ")?;

    if frontmatter.images.is_empty() {
        lines.push("images: []".to_string());
    } else {
        lines.push("images:".to_string());
        for image in &frontmatter.images {
            push_image_fields(&mut lines, image, "  - ", "    ")?;
        }
    }

    if frontmatter.videos.is_empty() {
        lines.push("videos: []".to_string());
    } else {
        lines.push("videos:".to_string());
        for video in &frontmatter.videos {
            lines.push(format!("  - src: {}", yaml_scalar(&video.src)?));
            if let Some(poster) = &video.poster {
                lines.push(format!("    poster: {}", yaml_scalar(poster)?));
            }
            lines.push(format!("    aspect: {}", quoted_scalar(video.aspect.as_str())?));
            if let Some(captions) = &video.captions {
                lines.push("    captions:".to_string());
                for caption in captions {
                    lines.push(format!("      - src: {}", yaml_scalar(&caption.src)?));
                    lines.push(format!("        srclang: {}", yaml_scalar(&caption.srclang)?));
                    lines.push(format!("        label: {}", yaml_scalar(&caption.label)?));
                    if let Some(default) = caption.default {
                        lines.push(format!("        default: {default}"));
                    }
                }
            }
        }
    }

    if frontmatter.external_videos.is_empty() {
        lines.push("externalVideos: []".to_string());
    } else {
        lines.push("externalVideos:".to_string());
        for video in &frontmatter.external_videos {
            lines.push(format!("  - kind: {}", video.kind.as_str()));
            lines.push(format!("    id: {}", yaml_scalar(&video.id)?));
            if let Some(title) = &video.title {
                lines.push(format!("    title: {}", yaml_scalar(title)?));
            }
            lines.push(format!("    aspect: {}", quoted_scalar(video.aspect.as_str())?));
        }
    }

    if let Some(summary) = frontmatter
        .summary
        .as_deref()
        .filter(|summary| !summary.trim().is_empty())
    {
        lines.push("summary: >-".to_string());
        for line in summary.trim().lines() {
            if line.trim().is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("  {}", line.trim_end()));
            }
        }
    }

    lines.push(FRONTMATTER_DELIMITER.to_string());
    lines.push(String::new());
    Ok(lines.join("\n"))
}

fn push_image_fields(
    lines: &mut Vec<String>,
    image: &Image,
    first_indent: &str,
    indent: &str,
) -> Result<()> {
    lines.push(format!("{first_indent}src: {}", yaml_scalar(&image.src)?));
    lines.push(format!("{indent}width: {}", image.width));
    lines.push(format!("{indent}height: {}", image.height));
    lines.push(format!("{indent}alt: {}", yaml_scalar(&image.alt)?));
    if let Some(caption) = &image.caption {
        lines.push(format!("{indent}caption: {}", yaml_scalar(caption)?));
    }
    Ok(())
}

/// Inline YAML scalar for `value`, quoted only when plain style would misparse.
fn yaml_scalar(value: &str) -> Result<String> {
    let single_line = value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let rendered = serde_yaml::to_string(&single_line).context("failed to render YAML scalar")?;
    Ok(rendered.trim_end().to_string())
}

/// Always-quoted scalar, for strings a YAML 1.1 reader would retype (dates, `16:9`).
fn quoted_scalar(value: &str) -> Result<String> {
    serde_json::to_string(value).context("failed to render quoted YAML scalar")
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaIssue {
    pub document: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub root: PathBuf,
    pub documents_checked: usize,
    pub issues: Vec<SchemaIssue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn render_issues(&self) -> Vec<String> {
        if self.issues.is_empty() {
            return Vec::new();
        }
        let mut lines = vec![format!("Invalid content documents ({}):", self.issues.len())];
        for issue in self.issues.iter().take(PREVIEW_LIMIT) {
            let document = issue
                .document
                .strip_prefix(&self.root)
                .unwrap_or(&issue.document);
            lines.push(format!(
                " - {}: {}",
                normalize_for_display(document),
                issue.message
            ));
        }
        if self.issues.len() > PREVIEW_LIMIT {
            lines.push(format!("   ... and {} more", self.issues.len() - PREVIEW_LIMIT));
        }
        lines
    }
}

/// Validate the frontmatter of every `.md`/`.mdx` document under `root`.
pub fn validate_content(root: &Path) -> Result<ValidationReport> {
    if !root.is_dir() {
        bail!("content directory not found: {}", root.display());
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        let is_document = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| matches!(extension, "md" | "mdx"));
        if is_document {
            documents.push(entry.into_path());
        }
    }
    documents.sort();

    let mut issues = Vec::new();
    for document in &documents {
        let content = fs::read_to_string(document)
            .with_context(|| format!("failed to read {}", document.display()))?;
        let message = match parse_frontmatter(&content) {
            Ok(frontmatter) => {
                let problems = frontmatter.problems();
                if problems.is_empty() {
                    continue;
                }
                problems.join("; ")
            }
            Err(error) => format!("{error:#}"),
        };
        issues.push(SchemaIssue {
            document: document.clone(),
            message,
        });
    }

    Ok(ValidationReport {
        root: root.to_path_buf(),
        documents_checked: documents.len(),
        issues,
    })
}
