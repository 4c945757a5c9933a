//! Crawler module for forum page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with the bang-URL rewrite, one redirect hop and retries
//! - HTML parsing and link classification
//! - The paginated group walk, the topic walk and article collection
//! - Message normalization through an external filter
//! - Overall crawl coordination

mod article;
mod coordinator;
mod fetcher;
mod filter;
mod group;
mod parser;
mod topic;

pub use article::ArticleCollector;
pub use coordinator::{run_archive, Coordinator};
pub use fetcher::{
    build_http_client, FetchedPage, HttpTransport, PageFetcher, Transport, TransportResponse,
};
pub use filter::{filter_from_config, CommandFilter, FilterError, MessageFilter, PassthroughFilter};
pub use group::GroupWalker;
pub use parser::{parse_page, Anchor, LinkClassifier, LinkKind, ParsedPage};
pub use topic::TopicWalker;

use crate::config::Config;
use crate::model::Group;
use crate::url::GroupUrl;
use crate::Result;

/// Crawls a group over HTTP and returns the populated aggregate
///
/// The group URL is validated before any request is made.
pub async fn crawl(config: &Config, group_url: &str) -> Result<Group> {
    let group_url = GroupUrl::parse(group_url, &config.site.base_url)?;
    Coordinator::from_config(config)?
        .collect_group(&group_url)
        .await
}
