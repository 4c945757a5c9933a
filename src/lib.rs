//! gg-archiver: download a Google Group into an mbox archive
//!
//! This crate walks a group's paginated topic listing, fetches the raw form of
//! every message in every topic, normalizes each one through an external mail
//! filter and writes the result into a single mbox file. Partially redacted
//! addresses (`jo...@example.com`) are collected into a correction table that
//! can later be filled in and applied to an archive.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for gg-archiver operations
#[derive(Debug, Error)]
pub enum ArchiverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Bad group URL: {0}")]
    BadUrl(#[from] UrlError),

    #[error("Unexpected page layout at {url}: {message}")]
    Layout { url: String, message: String },

    #[error("Failed to fetch {url}: {source}")]
    Fetch { url: String, source: TransportError },

    #[error("Failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Message filter failed: {0}")]
    Filter(#[from] crawler::FilterError),

    #[error("Correction table error: {0}")]
    Table(#[from] ini::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiverError {
    /// Returns true if the failure only affects the page being fetched
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Status { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Group URL errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("required URL in form '{expected}', got '{got}'")]
    Shape { expected: String, got: String },

    #[error("group name '{0}' is not URL-safe")]
    UnsafeName(String),
}

/// Errors raised by a [`crawler::Transport`] below the HTTP status level
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for gg-archiver operations
pub type Result<T> = std::result::Result<T, ArchiverError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{Article, Group, Topic};
pub use crate::url::{raw_message_url, unescape_bang_url, GroupUrl};
