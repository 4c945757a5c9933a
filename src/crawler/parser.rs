//! HTML parser for extracting anchors and classifying links
//!
//! The forum renders its crawlable snapshot as plain HTML. Listing pages mark
//! topic anchors with a `title` attribute and leave navigation untitled, topic
//! pages link every message through a fixed `/d/msg/` path.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// `target` of the anchor inside a group's welcome message banner
const WELCOME_TARGET: &str = "welcomeMsg";

static COUNT_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\D+ \d+\s*-\s*\d+ \D+ (\d+)\D*$").expect("valid regex"));

/// One `<a href>` element of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Absolute URL (resolved against the page URL where possible)
    pub href: String,

    pub title: Option<String>,

    pub target: Option<String>,
}

/// Extracted information from a forum page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// All anchors in document order
    pub anchors: Vec<Anchor>,

    /// Total count printed on the page, if any. Known to be unreliable.
    pub count_hint: Option<usize>,
}

/// Classification of one anchor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    /// Topic (on a listing page) or article (on a topic page)
    Content { url: String, label: String },

    /// Anything else; on a listing page, a pagination candidate
    Other { url: String },

    /// Page furniture that takes no part in classification
    Excluded,
}

/// Decides whether anchors are content links
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    article_prefix: String,
}

impl LinkClassifier {
    /// Creates a classifier for the site at `base`
    pub fn new(base: &str) -> Self {
        Self {
            article_prefix: format!("{}/d/msg/", base),
        }
    }

    /// Classifies an anchor of a topic listing page
    ///
    /// A non-empty `title` is the sole topic discriminator.
    pub fn classify_listing(&self, anchor: &Anchor) -> LinkKind {
        if is_welcome_banner(anchor) {
            return LinkKind::Excluded;
        }

        match anchor.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => LinkKind::Content {
                url: anchor.href.clone(),
                label: title.to_string(),
            },
            _ => LinkKind::Other {
                url: anchor.href.clone(),
            },
        }
    }

    /// Classifies an anchor of a topic page; message links are content
    pub fn classify_topic(&self, anchor: &Anchor) -> LinkKind {
        if is_welcome_banner(anchor) {
            return LinkKind::Excluded;
        }

        if anchor.href.starts_with(&self.article_prefix) {
            LinkKind::Content {
                url: anchor.href.clone(),
                label: anchor.title.clone().unwrap_or_default(),
            }
        } else {
            LinkKind::Other {
                url: anchor.href.clone(),
            }
        }
    }
}

fn is_welcome_banner(anchor: &Anchor) -> bool {
    anchor.target.as_deref() == Some(WELCOME_TARGET)
}

/// Parses HTML content and extracts anchors and the count hint
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The URL the page was fetched from, for relative links
///
/// # Example
///
/// ```
/// use gg_archiver::crawler::parse_page;
///
/// let html = r#"<html><body><a href="/t/1" title="Hello">Hello</a></body></html>"#;
/// let parsed = parse_page(html, "https://groups.google.com/forum/");
/// assert_eq!(parsed.anchors[0].href, "https://groups.google.com/t/1");
/// ```
pub fn parse_page(html: &str, page_url: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    ParsedPage {
        anchors: extract_anchors(&document, base.as_ref()),
        count_hint: extract_count_hint(&document),
    }
}

/// Extracts every `<a>` carrying an `href`
fn extract_anchors(document: &Html, base: Option<&Url>) -> Vec<Anchor> {
    let mut anchors = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            let value = element.value();
            if let Some(href) = value.attr("href") {
                anchors.push(Anchor {
                    href: resolve_href(href, base),
                    title: value.attr("title").map(str::to_string),
                    target: value.attr("target").map(str::to_string),
                });
            }
        }
    }

    anchors
}

/// Resolves an href against the page URL, keeping it verbatim on failure
fn resolve_href(href: &str, base: Option<&Url>) -> String {
    let href = href.trim();

    match base.map(|base| base.join(href)) {
        Some(Ok(absolute)) => absolute.to_string(),
        _ => href.to_string(),
    }
}

/// Reads the "1 - 20 of 57" style total from the first `<i>` element
fn extract_count_hint(document: &Html) -> Option<usize> {
    let i_selector = Selector::parse("i").ok()?;
    let text = document
        .select(&i_selector)
        .next()?
        .text()
        .collect::<String>();

    COUNT_HINT_RE
        .captures(text.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
