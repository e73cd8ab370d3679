use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{SiteConfig, load_config};

pub const CONFIG_FILENAME: &str = "sitekit.toml";

/// Files whose presence marks a directory as the site project root.
const ROOT_MARKERS: &[&str] = &[CONFIG_FILENAME, "astro.config.mjs", "package.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Config,
    Heuristic,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Config => "config",
            Self::Heuristic => "heuristic",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

/// Fully resolved on-disk layout for one invocation.
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub project_root: PathBuf,
    pub config_path: PathBuf,
    pub dist_dir: PathBuf,
    pub seed_path: PathBuf,
    pub content_dir: PathBuf,
    pub public_dir: PathBuf,
    pub root_source: ValueSource,
    pub config_source: ValueSource,
    pub layout_source: ValueSource,
}

impl ResolvedPaths {
    pub fn diagnostics(&self) -> String {
        format!(
            "project_root={} ({})\nconfig_path={} ({})\ndist_dir={} ({})\nseed_path={}\ncontent_dir={}\npublic_dir={}",
            normalize_for_display(&self.project_root),
            self.root_source.as_str(),
            normalize_for_display(&self.config_path),
            self.config_source.as_str(),
            normalize_for_display(&self.dist_dir),
            self.layout_source.as_str(),
            normalize_for_display(&self.seed_path),
            normalize_for_display(&self.content_dir),
            normalize_for_display(&self.public_dir),
        )
    }
}

/// Resolve the project root and config, then lay out every tool path relative to it.
pub fn resolve_paths(
    context: &ResolutionContext,
    overrides: &PathOverrides,
) -> Result<(ResolvedPaths, SiteConfig)> {
    resolve_paths_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> Result<(ResolvedPaths, SiteConfig)>
where
    F: Fn(&str) -> Option<String>,
{
    let (project_root, root_source) = resolve_project_root(context, overrides, &lookup_env);

    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &project_root), ValueSource::Flag)
    } else if let Some(value) = non_empty(lookup_env("SITEKIT_CONFIG")) {
        (absolutize(Path::new(&value), &project_root), ValueSource::Env)
    } else {
        (project_root.join(CONFIG_FILENAME), ValueSource::Default)
    };

    let config = load_config(&config_path).context("failed to load site configuration")?;
    let layout_source = if config_path.exists() {
        ValueSource::Config
    } else {
        ValueSource::Default
    };

    let paths = ResolvedPaths {
        dist_dir: absolutize(Path::new(config.dist_dir()), &project_root),
        seed_path: absolutize(Path::new(config.seed_path()), &project_root),
        content_dir: absolutize(Path::new(config.content_dir()), &project_root),
        public_dir: absolutize(Path::new(config.public_dir()), &project_root),
        project_root,
        config_path,
        root_source,
        config_source,
        layout_source,
    };
    Ok((paths, config))
}

fn resolve_project_root<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: &F,
) -> (PathBuf, ValueSource)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = overrides.project_root.as_deref() {
        return (absolutize(path, &context.cwd), ValueSource::Flag);
    }
    if let Some(value) = non_empty(lookup_env("SITEKIT_PROJECT_ROOT")) {
        return (absolutize(Path::new(&value), &context.cwd), ValueSource::Env);
    }
    match detect_project_root(&context.cwd) {
        Some(root) => (root, ValueSource::Heuristic),
        None => (context.cwd.clone(), ValueSource::Default),
    }
}

fn detect_project_root(cwd: &Path) -> Option<PathBuf> {
    let mut seen = HashSet::new();
    for candidate in cwd.ancestors() {
        if !seen.insert(normalize_for_display(candidate)) {
            continue;
        }
        if ROOT_MARKERS
            .iter()
            .any(|marker| candidate.join(marker).exists())
        {
            return Some(candidate.to_path_buf());
        }
    }
    None
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
