//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives one complete run:
//! - Validating the group URL before any network activity
//! - Walking the paginated topic listing
//! - Collecting every topic's articles and their messages
//! - Loading or saving the optional snapshot
//! - Handing the finished group to the archive writer and the auditor

use crate::config::Config;
use crate::crawler::article::ArticleCollector;
use crate::crawler::fetcher::{HttpTransport, PageFetcher, Transport};
use crate::crawler::filter::{filter_from_config, MessageFilter};
use crate::crawler::group::GroupWalker;
use crate::crawler::topic::TopicWalker;
use crate::model::Group;
use crate::output::{archive_group, snapshot, RunReport};
use crate::url::GroupUrl;
use crate::Result;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::time::Instant;

/// Main crawler coordinator structure
pub struct Coordinator<T> {
    fetcher: PageFetcher<T>,
    filter: Box<dyn MessageFilter>,
    article_workers: usize,
}

impl Coordinator<HttpTransport> {
    /// Creates a coordinator talking HTTP as described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(&config.fetch)?;
        let fetcher = PageFetcher::with_config(transport, &config.site.base_url, &config.fetch);

        Ok(Self::new(
            fetcher,
            filter_from_config(&config.filter),
            config.fetch.article_workers,
        ))
    }
}

impl<T: Transport> Coordinator<T> {
    pub fn new(
        fetcher: PageFetcher<T>,
        filter: Box<dyn MessageFilter>,
        article_workers: usize,
    ) -> Self {
        Self {
            fetcher,
            filter,
            article_workers: article_workers.max(1),
        }
    }

    /// Crawls the whole group into memory
    ///
    /// Listing pages are walked strictly in sequence. Topic and article
    /// download failures only leave the affected records empty; layout
    /// errors and listing failures abort the run.
    pub async fn collect_group(&self, group_url: &GroupUrl) -> Result<Group> {
        let start_time = Instant::now();
        let mut group = Group::new(group_url.as_str(), group_url.name());

        tracing::info!("Collecting topics of group {}", group.name);
        group.topics = GroupWalker::new(&self.fetcher)
            .crawl(&group_url.listing_url())
            .await?;

        let topic_walker = TopicWalker::new(&self.fetcher);
        let collector = ArticleCollector::new(&self.fetcher, self.filter.as_ref());
        let total = group.topics.len();

        for (index, topic) in group.topics.iter_mut().enumerate() {
            tracing::info!("[{}/{}] downloading \"{}\"", index + 1, total, topic.name);

            let mut articles = match topic_walker.collect(topic).await {
                Ok(articles) => articles,
                Err(e) if e.is_fetch_failure() => {
                    tracing::warn!("Skipping topic \"{}\": {}", topic.name, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let messages: Vec<Option<String>> = stream::iter(articles.iter())
                .map(|article| collector.fetch(article))
                .buffered(self.article_workers)
                .collect()
                .await;

            for (article, message) in articles.iter_mut().zip(messages) {
                if let Some(message) = message {
                    article.raw_message = message;
                }
            }

            topic.articles = articles;
        }

        tracing::info!(
            "Collected {} topics, {} articles ({} missing) in {:?}",
            group.topics.len(),
            group.article_count(),
            group.missing_count(),
            start_time.elapsed()
        );

        Ok(group)
    }
}

/// Runs a complete archive operation
///
/// 1. Validate the group URL (no network activity on failure)
/// 2. Load the group from `snapshot` if that file exists, otherwise crawl it
///    and save the snapshot when a path was given
/// 3. Write `<name>.mbx` and `<name>.cnf` into the output directory
///
/// # Example
///
/// ```no_run
/// use gg_archiver::config::Config;
/// use gg_archiver::crawler::run_archive;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// run_archive(&config, "https://groups.google.com/forum/#!forum/jbrout", None).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_archive(
    config: &Config,
    group_url: &str,
    snapshot_path: Option<&Path>,
) -> Result<RunReport> {
    let group_url = GroupUrl::parse(group_url, &config.site.base_url)?;

    let group = match snapshot_path {
        Some(path) if path.exists() => {
            tracing::info!("Loading state from {}", path.display());
            let group = snapshot::load(path)?;
            if group.name != group_url.name() {
                tracing::warn!(
                    "Snapshot holds group '{}', not '{}'",
                    group.name,
                    group_url.name()
                );
            }
            group
        }
        _ => {
            let coordinator = Coordinator::from_config(config)?;
            let group = coordinator.collect_group(&group_url).await?;
            if let Some(path) = snapshot_path {
                snapshot::save(path, &group)?;
                tracing::info!("Saved state to {}", path.display());
            }
            group
        }
    };

    archive_group(config, &group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::mock::MockTransport;
    use crate::crawler::filter::PassthroughFilter;
    use std::sync::Arc;
    use std::time::Duration;

    const BASE: &str = "https://groups.google.com";
    const GROUP: &str = "https://groups.google.com/forum/#!forum/test";
    const LISTING: &str = "https://groups.google.com/forum/?_escaped_fragment_=forum/test";

    fn topic_url(id: &str) -> String {
        format!("https://groups.google.com/forum/?_escaped_fragment_=topic/test/{}", id)
    }

    fn raw_url(topic: &str, msg: &str) -> String {
        format!(
            "https://groups.google.com/forum/message/raw?msg=test/{}/{}",
            topic, msg
        )
    }

    fn topic_page(topic: &str, msgs: &[&str]) -> String {
        let links: String = msgs
            .iter()
            .map(|m| {
                format!(
                    r#"<a href="https://groups.google.com/d/msg/test/{}/{}">{}</a>"#,
                    topic, m, m
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", links)
    }

    fn coordinator(transport: Arc<MockTransport>, workers: usize) -> Coordinator<Arc<MockTransport>> {
        let fetcher = PageFetcher::new(transport, BASE).with_retries(0, Duration::ZERO);
        Coordinator::new(fetcher, Box::new(PassthroughFilter), workers)
    }

    /// Two topics, three messages; message ids in `broken` fail to download
    fn mock_group(broken: &[&str]) -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::new());
        transport.html(
            LISTING,
            r#"<html><body>
                <a href="https://groups.google.com/d/topic/test/t1" title="One">One</a>
                <a href="https://groups.google.com/d/topic/test/t2" title="Two">Two</a>
            </body></html>"#,
        );
        transport.html(&topic_url("t1"), &topic_page("t1", &["m1", "m2"]));
        transport.html(&topic_url("t2"), &topic_page("t2", &["m3"]));
        for (topic, msg, body) in [
            ("t1", "m1", "Subject: 1\n\none\n"),
            ("t1", "m2", "Subject: 2\n\ntwo\n"),
            ("t2", "m3", "Subject: 3\n\nthree\n"),
        ] {
            if broken.contains(&msg) {
                transport.fail(&raw_url(topic, msg), "connection reset");
            } else {
                transport.html(&raw_url(topic, msg), body);
            }
        }
        transport
    }

    #[tokio::test]
    async fn test_collect_group() {
        let transport = mock_group(&[]);
        let group_url = GroupUrl::parse(GROUP, BASE).unwrap();

        let group = coordinator(transport, 1)
            .collect_group(&group_url)
            .await
            .unwrap();

        assert_eq!(group.name, "test");
        assert_eq!(group.url, GROUP);
        assert_eq!(group.topics.len(), 2);
        let messages: Vec<&str> = group.all_messages().collect();
        assert_eq!(
            messages,
            vec!["Subject: 1\n\none\n", "Subject: 2\n\ntwo\n", "Subject: 3\n\nthree\n"]
        );
    }

    #[tokio::test]
    async fn test_parallel_workers_keep_order() {
        let transport = mock_group(&[]);
        let group_url = GroupUrl::parse(GROUP, BASE).unwrap();

        let group = coordinator(transport, 4)
            .collect_group(&group_url)
            .await
            .unwrap();

        let first: Vec<&str> = group.topics[0]
            .articles
            .iter()
            .map(|a| a.raw_message.as_str())
            .collect();
        assert_eq!(first, vec!["Subject: 1\n\none\n", "Subject: 2\n\ntwo\n"]);
    }

    #[tokio::test]
    async fn test_failed_article_does_not_stop_crawl() {
        let transport = mock_group(&["m1"]);
        let group_url = GroupUrl::parse(GROUP, BASE).unwrap();

        let group = coordinator(transport, 1)
            .collect_group(&group_url)
            .await
            .unwrap();

        assert!(group.topics[0].articles[0].raw_message.is_empty());
        assert_eq!(group.topics[0].articles[1].raw_message, "Subject: 2\n\ntwo\n");
        assert_eq!(group.topics[1].articles[0].raw_message, "Subject: 3\n\nthree\n");
        assert_eq!(group.missing_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_topic_page_is_skipped() {
        let transport = Arc::new(MockTransport::new());
        transport.html(
            LISTING,
            r#"<html><body>
                <a href="https://groups.google.com/d/topic/test/gone" title="Gone">Gone</a>
                <a href="https://groups.google.com/d/topic/test/t2" title="Two">Two</a>
            </body></html>"#,
        );
        transport.html(&topic_url("t2"), &topic_page("t2", &["m3"]));
        transport.html(&raw_url("t2", "m3"), "Subject: 3\n\nthree\n");
        let group_url = GroupUrl::parse(GROUP, BASE).unwrap();

        let group = coordinator(transport, 1)
            .collect_group(&group_url)
            .await
            .unwrap();

        assert_eq!(group.topics.len(), 2);
        assert!(group.topics[0].articles.is_empty());
        assert_eq!(group.article_count(), 1);
    }

    #[tokio::test]
    async fn test_run_archive_rejects_bad_url_before_network() {
        let config = Config::default();
        let result = run_archive(&config, "https://example.com/not-a-group", None).await;
        assert!(matches!(result, Err(crate::ArchiverError::BadUrl(_))));
    }
}
