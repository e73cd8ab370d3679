use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SiteConfig;
use crate::fetch::{Fetcher, first_success};
use crate::runtime::ResolvedPaths;
use crate::schema::{
    Aspect, DOCUMENT_EXTENSION, ExternalVideo, ExternalVideoKind, Image, MediaType,
    WorkFrontmatter, render_frontmatter,
};
use crate::slug::slugify;
use crate::youtube::{
    Enrichment, high_quality_thumbnail, lookup_enrichment, max_resolution_thumbnail,
    parse_video_id,
};

const COVER_FILENAME: &str = "cover.jpg";
const COVER_WIDTH: u32 = 1280;
const COVER_HEIGHT: u32 = 720;

/// One entry of the seed file. Every field except `url` is an optional override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SeedRecord {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

pub fn load_seed(path: &Path) -> Result<Vec<SeedRecord>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

#[derive(Debug, Clone)]
pub struct MigrateOptions {
    pub content_dir: PathBuf,
    pub public_dir: PathBuf,
    pub public_web_prefix: String,
    pub default_date: String,
    pub slug_max_len: usize,
    pub fetch_metadata: bool,
}

impl MigrateOptions {
    pub fn resolve(paths: &ResolvedPaths, config: &SiteConfig, fetch_metadata: bool) -> Self {
        Self {
            content_dir: paths.content_dir.clone(),
            public_dir: paths.public_dir.clone(),
            public_web_prefix: config.public_web_prefix(),
            default_date: config.default_date().to_string(),
            slug_max_len: config.slug_max_len(),
            fetch_metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CoverStatus {
    Present,
    Downloaded { source: String },
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    Exists,
    /// An earlier record of the same run already claimed the slug.
    Collision { first_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    Written,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordReport {
    pub url: String,
    pub id: String,
    pub title: String,
    pub slug: String,
    pub document_path: PathBuf,
    pub enriched: bool,
    pub cover: Option<CoverStatus>,
    pub outcome: RecordOutcome,
}

impl RecordReport {
    pub fn document_name(&self) -> String {
        format!("{}.{DOCUMENT_EXTENSION}", self.slug)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrateReport {
    pub records: Vec<RecordReport>,
}

impl MigrateReport {
    pub fn written(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Written))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Skipped(_)))
    }

    pub fn covers_missing(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.cover == Some(CoverStatus::Missing))
            .count()
    }

    fn count(&self, predicate: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.records
            .iter()
            .filter(|record| predicate(&record.outcome))
            .count()
    }
}

/// Ensure a content document and cover exist for every seed record, in order.
///
/// Existing documents are never rewritten. A record whose URL has no video
/// identity aborts the run; records before it keep their side effects.
/// `on_record` observes each record as soon as it is settled.
pub fn migrate(
    records: &[SeedRecord],
    options: &MigrateOptions,
    fetcher: &dyn Fetcher,
    mut on_record: impl FnMut(&RecordReport),
) -> Result<MigrateReport> {
    fs::create_dir_all(&options.content_dir)
        .with_context(|| format!("failed to create {}", options.content_dir.display()))?;
    fs::create_dir_all(&options.public_dir)
        .with_context(|| format!("failed to create {}", options.public_dir.display()))?;

    let mut report = MigrateReport::default();
    let mut claimed_slugs: HashMap<String, String> = HashMap::new();

    info!(records = records.len(), fetch = options.fetch_metadata, "migration started");
    for record in records {
        let record_report = migrate_record(record, options, fetcher, &mut claimed_slugs)?;
        on_record(&record_report);
        report.records.push(record_report);
    }
    info!(
        written = report.written(),
        skipped = report.skipped(),
        "migration finished"
    );

    Ok(report)
}

fn migrate_record(
    record: &SeedRecord,
    options: &MigrateOptions,
    fetcher: &dyn Fetcher,
    claimed_slugs: &mut HashMap<String, String>,
) -> Result<RecordReport> {
    let Some(id) = parse_video_id(&record.url) else {
        bail!("invalid YouTube URL: {}", record.url);
    };

    let enrichment = if options.fetch_metadata {
        lookup_enrichment(fetcher, &id)
    } else {
        None
    };

    let title = non_blank(record.title.as_deref())
        .map(ToString::to_string)
        .or_else(|| {
            enrichment
                .as_ref()
                .and_then(|enrichment| enrichment.title.clone())
        })
        .unwrap_or_else(|| format!("Untitled ({id})"));

    let slug = resolve_slug(record, &title, &id, options.slug_max_len);
    let document_path = options
        .content_dir
        .join(format!("{slug}.{DOCUMENT_EXTENSION}"));
    let mut report = RecordReport {
        url: record.url.clone(),
        id: id.clone(),
        title: title.clone(),
        slug: slug.clone(),
        document_path: document_path.clone(),
        enriched: enrichment.is_some(),
        cover: None,
        outcome: RecordOutcome::Written,
    };

    if let Some(first_url) = claimed_slugs.get(&slug) {
        warn!(
            %slug,
            url = %record.url,
            first_url = %first_url,
            "slug already claimed by an earlier record; skipping"
        );
        report.outcome = RecordOutcome::Skipped(SkipReason::Collision {
            first_url: first_url.clone(),
        });
        return Ok(report);
    }
    claimed_slugs.insert(slug.clone(), record.url.clone());

    let cover_path = options.public_dir.join(&slug).join(COVER_FILENAME);
    report.cover = Some(ensure_cover(
        &cover_path,
        &cover_candidates(&id, enrichment.as_ref()),
        fetcher,
    ));

    if document_path.exists() {
        report.outcome = RecordOutcome::Skipped(SkipReason::Exists);
        return Ok(report);
    }

    let frontmatter = build_frontmatter(record, options, &title, &slug, &id);
    let mut document = render_frontmatter(&frontmatter)?;
    document.push('\n');
    if let Some(body) = compose_body(record) {
        document.push_str(&body);
        document.push('\n');
    }
    write_new_file(&document_path, document.as_bytes())?;

    Ok(report)
}

fn resolve_slug(record: &SeedRecord, title: &str, id: &str, max_len: usize) -> String {
    let source = non_blank(record.slug.as_deref()).unwrap_or(title);
    let slug = slugify(source, max_len);
    if slug.is_empty() {
        slugify(&format!("video {id}"), max_len)
    } else {
        slug
    }
}

/// Cover download candidates in priority order, without duplicates.
pub fn cover_candidates(id: &str, enrichment: Option<&Enrichment>) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(thumbnail) = enrichment.and_then(|enrichment| enrichment.thumbnail_url.clone()) {
        candidates.push(thumbnail);
    }
    candidates.push(max_resolution_thumbnail(id));
    candidates.push(high_quality_thumbnail(id));

    let mut seen = HashSet::new();
    candidates.retain(|candidate| seen.insert(candidate.clone()));
    candidates
}

fn ensure_cover(cover_path: &Path, candidates: &[String], fetcher: &dyn Fetcher) -> CoverStatus {
    if cover_path.exists() {
        return CoverStatus::Present;
    }
    let downloaded = first_success(candidates.iter().map(String::as_str), |url| {
        let bytes = fetcher.get_bytes(url)?;
        if bytes.is_empty() {
            bail!("empty response body from {url}");
        }
        write_new_file(cover_path, &bytes)
    });
    match downloaded {
        Some((source, ())) => CoverStatus::Downloaded {
            source: source.to_string(),
        },
        None => {
            warn!(
                cover = %cover_path.display(),
                candidates = candidates.len(),
                "no cover candidate could be downloaded"
            );
            CoverStatus::Missing
        }
    }
}

fn build_frontmatter(
    record: &SeedRecord,
    options: &MigrateOptions,
    title: &str,
    slug: &str,
    id: &str,
) -> WorkFrontmatter {
    let date = non_blank(record.date.as_deref()).unwrap_or(&options.default_date);
    let summary = non_blank(record.summary.as_deref())
        .or_else(|| non_blank(record.description.as_deref()))
        .map(ToString::to_string);

    WorkFrontmatter {
        title: title.to_string(),
        date: date.to_string(),
        media_type: MediaType::Video,
        cover: Image {
            src: format!("{}/{slug}/{COVER_FILENAME}", options.public_web_prefix),
            width: COVER_WIDTH,
            height: COVER_HEIGHT,
            alt: format!("{title} — cover frame"),
            caption: None,
        },
        images: Vec::new(),
        videos: Vec::new(),
        external_videos: vec![ExternalVideo {
            kind: ExternalVideoKind::Youtube,
            id: id.to_string(),
            title: Some(title.to_string()),
            aspect: Aspect::Widescreen,
        }],
        summary,
    }
}

fn compose_body(record: &SeedRecord) -> Option<String> {
    let parts = [record.description.as_deref(), record.detail.as_deref()]
        .into_iter()
        .filter_map(non_blank)
        .collect::<Vec<_>>();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Write `bytes` to `path`, which must not exist yet, creating parent directories.
///
/// Bytes land in a sibling staging file that is renamed into place, so a
/// failed write never leaves a truncated `path` behind.
fn write_new_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("path has no file name: {}", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create parent directory {}", parent.display()))?;
    if path.exists() {
        bail!("refusing to overwrite {}", path.display());
    }

    let staging = parent.join(format!(".{}.partial", file_name.to_string_lossy()));
    let written = fs::write(&staging, bytes)
        .with_context(|| format!("failed to write {}", staging.display()))
        .and_then(|()| {
            fs::rename(&staging, path)
                .with_context(|| format!("failed to move {} into place", path.display()))
        });
    if written.is_err() {
        let _ = fs::remove_file(&staging);
    }
    written
}
