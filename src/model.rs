//! In-memory aggregate produced by one crawl
//!
//! A [`Group`] owns its [`Topic`]s, each topic owns its [`Article`]s. The
//! records carry data only; fetching and populating them is done by the
//! walkers in [`crate::crawler`].

use serde::{Deserialize, Serialize};

/// Root aggregate of one crawl run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Listing URL as supplied by the user
    pub url: String,

    /// Group name derived from the URL
    pub name: String,

    /// Topics in listing order
    pub topics: Vec<Topic>,
}

impl Group {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            topics: Vec::new(),
        }
    }

    /// Iterates over every article of every topic in traversal order
    pub fn articles(&self) -> impl Iterator<Item = &Article> {
        self.topics.iter().flat_map(|topic| topic.articles.iter())
    }

    /// Iterates over every message body in traversal order, including the
    /// empty ones of articles that could not be fetched
    pub fn all_messages(&self) -> impl Iterator<Item = &str> {
        self.articles().map(|article| article.raw_message.as_str())
    }

    pub fn article_count(&self) -> usize {
        self.topics.iter().map(|topic| topic.articles.len()).sum()
    }

    /// Number of articles whose message is still empty
    pub fn missing_count(&self) -> usize {
        self.articles().filter(|article| !article.is_fetched()).count()
    }
}

/// One discussion thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Crawlable topic page
    pub url: String,

    /// Display name from the listing anchor's title
    pub name: String,

    pub articles: Vec<Article>,
}

impl Topic {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            articles: Vec::new(),
        }
    }
}

/// One message of a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Raw message endpoint
    pub url: String,

    /// Normalized message text, empty until fetched
    #[serde(default)]
    pub raw_message: String,
}

impl Article {
    /// Creates an article from its raw endpoint URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            raw_message: String::new(),
        }
    }

    pub fn is_fetched(&self) -> bool {
        !self.raw_message.is_empty()
    }
}
