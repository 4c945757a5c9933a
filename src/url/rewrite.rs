//! Pure URL rewrites for the forum's crawlable snapshot endpoints

const BANG: &str = "#!";
const ESCAPED_FRAGMENT: &str = "?_escaped_fragment_=";

/// Rewrites an AJAX "hash bang" URL into the form the site serves a static
/// snapshot for
///
/// * `…#!path` becomes `…?_escaped_fragment_=path` (first marker only)
/// * `<base>/d/topic/…` becomes `<base>/forum/?_escaped_fragment_=topic/…`
/// * anything else is returned unchanged
///
/// See <https://developers.google.com/search/docs/ajax-crawling/docs/getting-started>.
///
/// # Example
///
/// ```
/// use gg_archiver::unescape_bang_url;
///
/// let url = unescape_bang_url("https://x/y#!z", "https://x");
/// assert_eq!(url, "https://x/y?_escaped_fragment_=z");
/// ```
pub fn unescape_bang_url(url: &str, base: &str) -> String {
    if url.contains(BANG) {
        return url.replacen(BANG, ESCAPED_FRAGMENT, 1);
    }

    let topic_prefix = format!("{}/d/topic/", base);
    if url.starts_with(&topic_prefix) {
        let rest = &url[format!("{}/d/", base).len()..];
        return format!("{}/forum/{}{}", base, ESCAPED_FRAGMENT, rest);
    }

    url.to_string()
}

/// Rewrites a human-facing message link into the raw message endpoint
///
/// `…/d/msg/<group>/<topic>/<id>` becomes
/// `…/forum/message/raw?msg=<group>/<topic>/<id>`.
pub fn raw_message_url(url: &str) -> String {
    url.replacen("d/msg/", "forum/message/raw?msg=", 1)
}
