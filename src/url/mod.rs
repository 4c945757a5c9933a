//! URL handling module for gg-archiver
//!
//! This module validates the user supplied group URL and provides the
//! rewrites between the site's human-facing links and the endpoints the
//! crawler actually requests.

mod rewrite;

use crate::{UrlError, UrlResult};
use regex::Regex;
use std::fmt;

pub use rewrite::{raw_message_url, unescape_bang_url};

/// A validated group listing URL of the form `<base>/forum/#!forum/<name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupUrl {
    url: String,
    name: String,
    base: String,
}

impl GroupUrl {
    /// Validates `input` against the group URL shape for the site at `base`
    ///
    /// No network activity happens here; a URL of any other shape fails
    /// with [`UrlError`].
    ///
    /// # Example
    ///
    /// ```
    /// use gg_archiver::GroupUrl;
    ///
    /// let group = GroupUrl::parse(
    ///     "https://groups.google.com/forum/#!forum/jbrout",
    ///     "https://groups.google.com",
    /// ).unwrap();
    /// assert_eq!(group.name(), "jbrout");
    /// ```
    pub fn parse(input: &str, base: &str) -> UrlResult<Self> {
        let input = input.trim();
        let expected = format!("{}/forum/#!forum/", base);
        let pattern = format!(r"^{}(.+)$", regex::escape(&expected));
        let shape = Regex::new(&pattern).map_err(|_| UrlError::Shape {
            expected: format!("{}GROUPNAME", expected),
            got: input.to_string(),
        })?;

        let name = shape
            .captures(input)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| UrlError::Shape {
                expected: format!("{}GROUPNAME", expected),
                got: input.to_string(),
            })?;

        if !is_url_safe(&name) {
            return Err(UrlError::UnsafeName(name));
        }

        Ok(Self {
            url: input.to_string(),
            name,
            base: base.to_string(),
        })
    }

    /// The group name taken from the last path segment
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The URL as supplied by the user
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The site origin this group belongs to
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The crawlable first listing page
    pub fn listing_url(&self) -> String {
        unescape_bang_url(&self.url, &self.base)
    }
}

impl fmt::Display for GroupUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Group names end up in file names and query strings
fn is_url_safe(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        && name != "."
        && name != ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://groups.google.com";

    #[test]
    fn test_parse_valid_group_url() {
        let group = GroupUrl::parse("https://groups.google.com/forum/#!forum/django-oscar", BASE)
            .unwrap();
        assert_eq!(group.name(), "django-oscar");
        assert_eq!(group.base(), BASE);
        assert_eq!(
            group.listing_url(),
            "https://groups.google.com/forum/?_escaped_fragment_=forum/django-oscar"
        );
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let group = GroupUrl::parse("  https://groups.google.com/forum/#!forum/jbrout\n", BASE)
            .unwrap();
        assert_eq!(group.as_str(), "https://groups.google.com/forum/#!forum/jbrout");
    }

    #[test]
    fn test_reject_other_host() {
        let result = GroupUrl::parse("https://example.com/forum/#!forum/jbrout", BASE);
        assert!(matches!(result, Err(UrlError::Shape { .. })));
    }

    #[test]
    fn test_reject_plain_http() {
        let result = GroupUrl::parse("http://groups.google.com/forum/#!forum/jbrout", BASE);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_topic_url() {
        let result = GroupUrl::parse("https://groups.google.com/forum/#!topic/jbrout/abc", BASE);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_missing_name() {
        let result = GroupUrl::parse("https://groups.google.com/forum/#!forum/", BASE);
        assert!(matches!(result, Err(UrlError::Shape { .. })));
    }

    #[test]
    fn test_reject_unsafe_name() {
        let result = GroupUrl::parse("https://groups.google.com/forum/#!forum/a/../b", BASE);
        assert!(matches!(result, Err(UrlError::UnsafeName(_))));

        let result = GroupUrl::parse("https://groups.google.com/forum/#!forum/..", BASE);
        assert!(matches!(result, Err(UrlError::UnsafeName(_))));
    }

    #[test]
    fn test_custom_base() {
        let group = GroupUrl::parse("http://127.0.0.1:8080/forum/#!forum/test", "http://127.0.0.1:8080")
            .unwrap();
        assert_eq!(
            group.listing_url(),
            "http://127.0.0.1:8080/forum/?_escaped_fragment_=forum/test"
        );
    }

    #[test]
    fn test_display() {
        let input = "https://groups.google.com/forum/#!forum/jbrout";
        let group = GroupUrl::parse(input, BASE).unwrap();
        assert_eq!(group.to_string(), input);
    }
}
