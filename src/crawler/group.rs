//! Paginated walk over a group's topic listing
//!
//! The number of listing pages is unknown up front. Each page is expected to
//! carry titled topic anchors plus at most one untitled anchor: the link to
//! the next page. That "other" bucket alone decides when the walk stops.

use crate::crawler::fetcher::{PageFetcher, Transport};
use crate::crawler::parser::{parse_page, LinkClassifier, LinkKind};
use crate::model::Topic;
use crate::url::unescape_bang_url;
use crate::{ArchiverError, Result};
use std::collections::{HashSet, VecDeque};

/// Walks listing pages and collects topics
pub struct GroupWalker<'a, T> {
    fetcher: &'a PageFetcher<T>,
    classifier: LinkClassifier,
}

impl<'a, T: Transport> GroupWalker<'a, T> {
    pub fn new(fetcher: &'a PageFetcher<T>) -> Self {
        Self {
            classifier: LinkClassifier::new(fetcher.base()),
            fetcher,
        }
    }

    /// Collects every topic reachable from the first listing page
    ///
    /// Returns topics in page order without duplicates. Any listing page with
    /// more than one pagination candidate, or a next link pointing back at an
    /// already visited page, aborts the walk with [`ArchiverError::Layout`]
    /// before anything else is fetched.
    pub async fn crawl(&self, listing_url: &str) -> Result<Vec<Topic>> {
        let base = self.fetcher.base();
        let mut queue = VecDeque::from([unescape_bang_url(listing_url, base)]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut seen_topics: HashSet<String> = HashSet::new();
        let mut topics = Vec::new();
        let mut count_hint = None;
        let mut pages = 0usize;

        while let Some(page_url) = queue.pop_front() {
            let page = self.fetcher.fetch(&page_url).await?;
            visited.insert(page_url);
            visited.insert(page.url.clone());
            pages += 1;

            let parsed = parse_page(&page.body, &page.url);
            if count_hint.is_none() {
                count_hint = parsed.count_hint;
            }

            let mut other = Vec::new();
            for anchor in &parsed.anchors {
                match self.classifier.classify_listing(anchor) {
                    LinkKind::Content { url, label } => {
                        let url = unescape_bang_url(&url, base);
                        if seen_topics.insert(url.clone()) {
                            topics.push(Topic::new(url, label));
                        } else {
                            tracing::debug!("Duplicate topic {} skipped", url);
                        }
                    }
                    LinkKind::Other { url } => {
                        tracing::debug!("other = {}", url);
                        other.push(url);
                    }
                    LinkKind::Excluded => {
                        tracing::debug!("Ignoring welcome message link {}", anchor.href);
                    }
                }
            }

            tracing::info!(
                "Listing page {}: {} topics so far",
                pages,
                topics.len()
            );

            match other.as_slice() {
                [] => tracing::debug!("{} is the last listing page", page.url),
                [next] => {
                    let next = unescape_bang_url(next, base);
                    if visited.contains(&next) {
                        return Err(ArchiverError::Layout {
                            url: page.url,
                            message: format!("next page link {} was already visited", next),
                        });
                    }
                    queue.push_back(next);
                }
                _ => {
                    return Err(ArchiverError::Layout {
                        url: page.url,
                        message: format!(
                            "there must be either one or no link to the next page, found {}",
                            other.len()
                        ),
                    });
                }
            }
        }

        match count_hint {
            Some(hint) if hint != topics.len() => tracing::warn!(
                "Page claims {} topics, found {} (the page count is often wrong)",
                hint,
                topics.len()
            ),
            _ => {}
        }

        Ok(topics)
    }
}
