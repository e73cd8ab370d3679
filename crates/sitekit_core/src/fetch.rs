use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::SiteConfig;

/// Remote retrieval used by the migrator.
pub trait Fetcher {
    fn get_json(&self, url: &str) -> Result<Value>;
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher with a bounded per-request timeout.
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
        })
    }

    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        Self::new(
            Duration::from_millis(config.timeout_ms()),
            config.user_agent(),
        )
    }

    fn get(&self, url: &str, accept: &str) -> Result<reqwest::blocking::Response> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", self.user_agent.clone())
            .header("Accept", accept)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {} while fetching {}", status.as_u16(), url);
        }
        Ok(response)
    }
}

impl Fetcher for HttpFetcher {
    fn get_json(&self, url: &str) -> Result<Value> {
        self.get(url, "application/json")?
            .json()
            .with_context(|| format!("failed to decode JSON from {url}"))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .get(url, "*/*")?
            .bytes()
            .with_context(|| format!("failed to read response body from {url}"))?;
        Ok(bytes.to_vec())
    }
}

/// Try `candidates` in order and return the first one `attempt` succeeds on,
/// together with its output. Failures are logged and skipped.
pub fn first_success<'a, T, I, F>(candidates: I, mut attempt: F) -> Option<(&'a str, T)>
where
    I: IntoIterator<Item = &'a str>,
    F: FnMut(&str) -> Result<T>,
{
    for candidate in candidates {
        match attempt(candidate) {
            Ok(value) => return Some((candidate, value)),
            Err(error) => debug!(candidate, error = %error, "candidate failed"),
        }
    }
    None
}
