//! Lightweight tag scanning over raw markup.
//!
//! This is not an HTML parser: tags are located by name and their attributes
//! read up to the closing `>`, skipping comments. Markup that defeats this
//! (tags split by scripts, attribute values containing `<` outside quotes)
//! can hide references from the checker.

use std::collections::BTreeMap;

/// Tag kinds whose attributes point at site assets or pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Anchor,
    Image,
    Source,
    Video,
    Link,
    Script,
}

impl TagKind {
    pub const ALL: [TagKind; 6] = [
        Self::Anchor,
        Self::Image,
        Self::Source,
        Self::Video,
        Self::Link,
        Self::Script,
    ];

    pub fn tag_name(self) -> &'static str {
        match self {
            Self::Anchor => "a",
            Self::Image => "img",
            Self::Source => "source",
            Self::Video => "video",
            Self::Link => "link",
            Self::Script => "script",
        }
    }

    /// Attribute holding the referenced URL for this tag kind.
    pub fn url_attribute(self) -> &'static str {
        match self {
            Self::Anchor | Self::Link => "href",
            Self::Image | Self::Source | Self::Script => "src",
            Self::Video => "poster",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub tag: TagKind,
    pub raw: String,
    /// `raw` with any fragment and query removed.
    pub path: String,
}

impl Reference {
    pub fn new(tag: TagKind, raw: &str) -> Self {
        Self {
            tag,
            raw: raw.to_string(),
            path: strip_fragment_and_query(raw).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTag {
    pub raw: String,
    pub alt: Option<String>,
}

impl ImageTag {
    pub fn has_alt_text(&self) -> bool {
        self.alt
            .as_deref()
            .is_some_and(|alt| !alt.is_empty())
    }
}

/// Source of references and image tags for one document's markup.
pub trait ReferenceExtractor {
    fn extract_references(&self, html: &str) -> Vec<Reference>;
    fn extract_images(&self, html: &str) -> Vec<ImageTag>;
}

/// Default extractor: one pass over the start tags of the markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagScanner;

impl ReferenceExtractor for TagScanner {
    fn extract_references(&self, html: &str) -> Vec<Reference> {
        let tags = start_tags(html);
        let mut references = Vec::new();
        for kind in TagKind::ALL {
            for tag in tags.iter().filter(|tag| tag.name == kind.tag_name()) {
                let Some(value) = tag.attrs.get(kind.url_attribute()) else {
                    continue;
                };
                let decoded = decode_html(value.trim());
                if !decoded.is_empty() {
                    references.push(Reference::new(kind, &decoded));
                }
            }
        }
        references
    }

    fn extract_images(&self, html: &str) -> Vec<ImageTag> {
        start_tags(html)
            .into_iter()
            .filter(|tag| tag.name == TagKind::Image.tag_name())
            .map(|tag| ImageTag {
                raw: tag.raw.to_string(),
                alt: tag.attrs.get("alt").map(|alt| decode_html(alt)),
            })
            .collect()
    }
}

pub fn strip_fragment_and_query(raw: &str) -> &str {
    let without_fragment = raw.split('#').next().unwrap_or_default();
    without_fragment.split('?').next().unwrap_or_default()
}

/// A start tag as written in the markup.
#[derive(Debug, Clone)]
struct StartTag<'a> {
    /// Lowercased element name.
    name: String,
    raw: &'a str,
    attrs: BTreeMap<String, String>,
}

/// Every start tag in `html`, in document order. Comments are skipped and
/// closing tags ignored.
fn start_tags(html: &str) -> Vec<StartTag<'_>> {
    let mut tags = Vec::new();
    let mut cursor = 0usize;

    while let Some(offset) = html[cursor..].find('<') {
        let at = cursor + offset;
        let after = &html[at + 1..];
        if after.starts_with("!--") {
            cursor = after
                .find("-->")
                .map_or(html.len(), |end| at + 1 + end + 3);
            continue;
        }

        let name_len = element_name_len(after);
        if name_len == 0 {
            cursor = at + 1;
            continue;
        }
        let attrs_start = at + 1 + name_len;
        let Some(end) = closing_bracket(html, attrs_start) else {
            break;
        };
        tags.push(StartTag {
            name: after[..name_len].to_ascii_lowercase(),
            raw: &html[at..=end],
            attrs: parse_attributes(&html[attrs_start..end]),
        });
        cursor = end + 1;
    }

    tags
}

/// Length of the element name opening `text`, or 0 when `text` does not
/// start a tag name terminated by whitespace, `/` or `>`.
fn element_name_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    if !bytes.first().is_some_and(u8::is_ascii_alphabetic) {
        return 0;
    }
    let len = bytes
        .iter()
        .take_while(|byte| byte.is_ascii_alphanumeric())
        .count();
    match bytes.get(len) {
        Some(b'>' | b'/') => len,
        Some(byte) if byte.is_ascii_whitespace() => len,
        _ => 0,
    }
}

/// Index of the `>` closing the tag, ignoring any inside quoted values.
fn closing_bracket(html: &str, from: usize) -> Option<usize> {
    let mut quote = None::<u8>;
    for (index, byte) in html.bytes().enumerate().skip(from) {
        match (quote, byte) {
            (Some(open), _) if byte == open => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(byte),
            (None, b'>') => return Some(index),
            (None, _) => {}
        }
    }
    None
}

/// Attributes of one tag, names lowercased. The first occurrence of a name wins.
fn parse_attributes(body: &str) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    let mut rest = body;

    loop {
        rest = rest.trim_start_matches(|ch: char| ch.is_ascii_whitespace() || ch == '/');
        if rest.is_empty() {
            break;
        }
        let name_end = rest
            .find(|ch: char| ch.is_ascii_whitespace() || ch == '=' || ch == '/')
            .unwrap_or(rest.len());
        if name_end == 0 {
            // stray '='
            rest = &rest[1..];
            continue;
        }
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let value = match rest.strip_prefix('=') {
            Some(assigned) => {
                let (value, remaining) = attribute_value(assigned.trim_start());
                rest = remaining;
                value
            }
            None => "",
        };
        attrs.entry(name).or_insert_with(|| value.to_string());
    }

    attrs
}

/// Split `text` into a leading attribute value and what follows it.
fn attribute_value(text: &str) -> (&str, &str) {
    match text.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let inner = &text[1..];
            match inner.find(quote) {
                Some(end) => (&inner[..end], &inner[end + 1..]),
                None => (inner, ""),
            }
        }
        _ => {
            let end = text
                .find(|ch: char| ch.is_ascii_whitespace())
                .unwrap_or(text.len());
            (&text[..end], &text[end..])
        }
    }
}

fn decode_html(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
