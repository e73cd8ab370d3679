use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::fetch::Fetcher;

pub const SHORT_LINK_HOST: &str = "youtu.be";
const CANONICAL_HOST: &str = "youtube.com";
const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";

/// Extract the video identity from a watch, short-link or embed URL.
pub fn parse_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;

    let id = if host == SHORT_LINK_HOST {
        parsed
            .path()
            .strip_prefix('/')?
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string()
    } else if host.contains(CANONICAL_HOST) {
        if parsed.path() == "/watch" {
            parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())?
        } else {
            let rest = parsed.path().strip_prefix("/embed/")?;
            rest.chars()
                .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-')
                .collect()
        }
    } else {
        return None;
    };

    if id.is_empty() { None } else { Some(id) }
}

pub fn short_link(id: &str) -> String {
    format!("https://{SHORT_LINK_HOST}/{id}")
}

pub fn oembed_url(id: &str) -> String {
    format!("{OEMBED_ENDPOINT}?url={}&format=json", short_link(id))
}

pub fn max_resolution_thumbnail(id: &str) -> String {
    format!("https://img.youtube.com/vi/{id}/maxresdefault.jpg")
}

/// Lower resolution thumbnail that exists for every public video.
pub fn high_quality_thumbnail(id: &str) -> String {
    format!("https://img.youtube.com/vi/{id}/hqdefault.jpg")
}

/// Metadata recovered from the oEmbed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
    thumbnail_url: Option<String>,
}

/// Look up oEmbed metadata for `id`. Any failure yields `None`.
pub fn lookup_enrichment(fetcher: &dyn Fetcher, id: &str) -> Option<Enrichment> {
    let url = oembed_url(id);
    let payload = match fetcher.get_json(&url) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::debug!(%url, error = %error, "oEmbed lookup failed");
            return None;
        }
    };
    parse_enrichment(payload)
}

fn parse_enrichment(payload: Value) -> Option<Enrichment> {
    let response: OEmbedResponse = match serde_json::from_value(payload) {
        Ok(response) => response,
        Err(error) => {
            tracing::debug!(error = %error, "malformed oEmbed response");
            return None;
        }
    };
    Some(Enrichment {
        title: non_blank(response.title),
        thumbnail_url: non_blank(response.thumbnail_url),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn identity_from_every_supported_shape() {
        assert_eq!(parse_video_id("https://youtu.be/abc123").as_deref(), Some("abc123"));
        assert_eq!(
            parse_video_id("https://www.youtube.com/watch?v=abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            parse_video_id("https://www.youtube.com/embed/abc123").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn identity_ignores_extra_parameters() {
        assert_eq!(
            parse_video_id("https://m.youtube.com/watch?feature=share&v=a_B-9&t=42").as_deref(),
            Some("a_B-9")
        );
        assert_eq!(
            parse_video_id("https://www.youtube.com/embed/abc123?start=10").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn unsupported_shapes_have_no_identity() {
        assert_eq!(parse_video_id("https://vimeo.com/12345"), None);
        assert_eq!(parse_video_id("https://www.youtube.com/watch"), None);
        assert_eq!(parse_video_id("https://www.youtube.com/channel/xyz"), None);
        assert_eq!(parse_video_id("https://youtu.be/"), None);
        assert_eq!(parse_video_id("not a url"), None);
    }

    #[test]
    fn oembed_url_embeds_short_link() {
        assert_eq!(
            oembed_url("abc123"),
            "https://www.youtube.com/oembed?url=https://youtu.be/abc123&format=json"
        );
    }

    #[test]
    fn enrichment_tolerates_partial_and_malformed_payloads() {
        let full = parse_enrichment(json!({
            "title": "Night Drive",
            "thumbnail_url": "https://i.ytimg.com/vi/abc123/hqdefault.jpg",
            "author_name": "Studio"
        }))
        .expect("enrichment");
        assert_eq!(full.title.as_deref(), Some("Night Drive"));

        let blank = parse_enrichment(json!({"title": "  "})).expect("enrichment");
        assert_eq!(blank.title, None);
        assert_eq!(blank.thumbnail_url, None);

        assert_eq!(parse_enrichment(json!({"title": 7})), None);
        assert_eq!(parse_enrichment(json!("Not Found")), None);
    }
}
