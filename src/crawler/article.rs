//! Per-article download and normalization

use crate::crawler::fetcher::{PageFetcher, Transport};
use crate::crawler::filter::MessageFilter;
use crate::model::Article;

/// Fetches raw messages and runs them through a [`MessageFilter`]
pub struct ArticleCollector<'a, T> {
    fetcher: &'a PageFetcher<T>,
    filter: &'a dyn MessageFilter,
}

impl<'a, T: Transport> ArticleCollector<'a, T> {
    pub fn new(fetcher: &'a PageFetcher<T>, filter: &'a dyn MessageFilter) -> Self {
        Self { fetcher, filter }
    }

    /// Returns the normalized message, or `None` when the download or the
    /// filter failed. Failures are logged and never abort the crawl.
    pub async fn fetch(&self, article: &Article) -> Option<String> {
        tracing::debug!("Fetching {}", article.url);

        let raw = match self.fetcher.fetch_raw(&article.url).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Exception on downloading {}: {}", article.url, e);
                return None;
            }
        };

        match self.filter.normalize(&raw).await {
            Ok(normalized) => Some(String::from_utf8_lossy(&normalized).into_owned()),
            Err(e) => {
                tracing::warn!("Could not normalize {}: {}", article.url, e);
                None
            }
        }
    }
}
