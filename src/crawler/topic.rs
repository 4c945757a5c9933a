//! Topic page walk: one page, every message link on it

use crate::crawler::fetcher::{PageFetcher, Transport};
use crate::crawler::parser::{parse_page, LinkClassifier, LinkKind};
use crate::model::{Article, Topic};
use crate::url::raw_message_url;
use crate::Result;

/// Collects the articles of a topic
pub struct TopicWalker<'a, T> {
    fetcher: &'a PageFetcher<T>,
    classifier: LinkClassifier,
}

impl<'a, T: Transport> TopicWalker<'a, T> {
    pub fn new(fetcher: &'a PageFetcher<T>) -> Self {
        Self {
            classifier: LinkClassifier::new(fetcher.base()),
            fetcher,
        }
    }

    /// Fetches the topic page and returns one empty [`Article`] per message
    /// link, pointing at the raw message endpoint
    ///
    /// Topics are assumed to fit on a single page.
    pub async fn collect(&self, topic: &Topic) -> Result<Vec<Article>> {
        let page = self.fetcher.fetch(&topic.url).await?;
        let parsed = parse_page(&page.body, &page.url);

        let articles: Vec<Article> = parsed
            .anchors
            .iter()
            .filter_map(|anchor| match self.classifier.classify_topic(anchor) {
                LinkKind::Content { url, .. } => Some(Article::new(raw_message_url(&url))),
                _ => None,
            })
            .collect();

        tracing::debug!("{} articles in topic {}", articles.len(), topic.url);
        Ok(articles)
    }
}
