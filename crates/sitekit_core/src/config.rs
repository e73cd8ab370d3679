use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str = "sitekit/0.1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_DIST_DIR: &str = "dist";
pub const DEFAULT_SEED_PATH: &str = "scripts/videos.seed.json";
pub const DEFAULT_CONTENT_DIR: &str = "src/content/works";
pub const DEFAULT_PUBLIC_DIR: &str = "public/works";
pub const DEFAULT_PUBLIC_WEB_PREFIX: &str = "/works";
pub const DEFAULT_DATE: &str = "2020-01-01";
pub const DEFAULT_SLUG_MAX_LEN: usize = 80;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct SiteConfig {
    #[serde(default)]
    pub check: CheckSection,
    #[serde(default)]
    pub migrate: MigrateSection,
    #[serde(default)]
    pub http: HttpSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct CheckSection {
    pub dist_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct MigrateSection {
    pub seed_path: Option<String>,
    pub content_dir: Option<String>,
    pub public_dir: Option<String>,
    pub public_web_prefix: Option<String>,
    pub default_date: Option<String>,
    pub slug_max_len: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct HttpSection {
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

impl SiteConfig {
    pub fn dist_dir(&self) -> &str {
        self.check.dist_dir.as_deref().unwrap_or(DEFAULT_DIST_DIR)
    }

    pub fn seed_path(&self) -> &str {
        self.migrate
            .seed_path
            .as_deref()
            .unwrap_or(DEFAULT_SEED_PATH)
    }

    pub fn content_dir(&self) -> &str {
        self.migrate
            .content_dir
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_DIR)
    }

    pub fn public_dir(&self) -> &str {
        self.migrate
            .public_dir
            .as_deref()
            .unwrap_or(DEFAULT_PUBLIC_DIR)
    }

    /// Web path under which `public_dir` is served, without a trailing slash.
    pub fn public_web_prefix(&self) -> String {
        let prefix = self
            .migrate
            .public_web_prefix
            .as_deref()
            .unwrap_or(DEFAULT_PUBLIC_WEB_PREFIX)
            .trim_end_matches('/');
        if prefix.starts_with('/') {
            prefix.to_string()
        } else {
            format!("/{prefix}")
        }
    }

    pub fn default_date(&self) -> &str {
        self.migrate
            .default_date
            .as_deref()
            .unwrap_or(DEFAULT_DATE)
    }

    pub fn slug_max_len(&self) -> usize {
        self.migrate
            .slug_max_len
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_SLUG_MAX_LEN)
    }

    /// Resolve request timeout: env SITEKIT_HTTP_TIMEOUT_MS > config > DEFAULT_TIMEOUT_MS.
    pub fn timeout_ms(&self) -> u64 {
        env::var("SITEKIT_HTTP_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .or(self.http.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    /// Resolve user agent: env SITEKIT_USER_AGENT > config > DEFAULT_USER_AGENT.
    pub fn user_agent(&self) -> String {
        if let Ok(value) = env::var("SITEKIT_USER_AGENT") {
            let trimmed = value.trim().to_string();
            if !trimmed.is_empty() {
                return trimmed;
            }
        }
        self.http
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }
}

/// Load and parse a SiteConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<SiteConfig> {
    if !config_path.exists() {
        return Ok(SiteConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: SiteConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_uses_site_layout() {
        let config = SiteConfig::default();
        assert_eq!(config.dist_dir(), "dist");
        assert_eq!(config.seed_path(), "scripts/videos.seed.json");
        assert_eq!(config.content_dir(), "src/content/works");
        assert_eq!(config.public_dir(), "public/works");
        assert_eq!(config.public_web_prefix(), "/works");
        assert_eq!(config.slug_max_len(), 80);
    }

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/sitekit.toml")).expect("load config");
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn load_config_parses_all_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("sitekit.toml");
        fs::write(
            &config_path,
            r#"
[check]
dist_dir = "out"

[migrate]
seed_path = "data/seed.json"
public_web_prefix = "media/"
default_date = "2019-06-01"
slug_max_len = 40

[http]
timeout_ms = 5000
user_agent = "portfolio-bot/2.0"
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(config.dist_dir(), "out");
        assert_eq!(config.seed_path(), "data/seed.json");
        assert_eq!(config.public_web_prefix(), "/media");
        assert_eq!(config.default_date(), "2019-06-01");
        assert_eq!(config.slug_max_len(), 40);
        assert_eq!(config.http.timeout_ms, Some(5000));
        assert_eq!(config.http.user_agent.as_deref(), Some("portfolio-bot/2.0"));
    }

    #[test]
    fn zero_slug_length_falls_back_to_default() {
        let config: SiteConfig = toml::from_str("[migrate]\nslug_max_len = 0\n").expect("parse");
        assert_eq!(config.slug_max_len(), DEFAULT_SLUG_MAX_LEN);
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("sitekit.toml");
        fs::write(&config_path, "[check\ndist_dir = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }
}
