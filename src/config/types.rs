use serde::Deserialize;

/// Main configuration structure for gg-archiver
///
/// Every section is optional in the TOML file; missing keys fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub fetch: FetchConfig,
    pub filter: FilterConfig,
    pub output: OutputConfig,
    pub audit: AuditConfig,
}

/// Where the group lives
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Origin of the forum site, without trailing slash
    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://groups.google.com".to_string(),
        }
    }
}

/// HTTP behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Deadline for a single request attempt (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Extra attempts after a transient failure
    pub retries: u32,

    /// Delay before the first retry, grows linearly (milliseconds)
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Number of articles of one topic fetched at the same time
    #[serde(rename = "article-workers")]
    pub article_workers: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("gg-archiver/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            retries: 2,
            retry_backoff_ms: 500,
            article_workers: 1,
        }
    }
}

/// External message normalization filter
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Program reading a raw message on stdin and writing it to stdout.
    /// Empty means messages are stored as downloaded.
    pub command: String,

    pub args: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            command: "/usr/bin/formail".to_string(),
            args: Vec::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving `<group>.mbx` and `<group>.cnf`
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
        }
    }
}

/// Correction table generation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub order: AuditOrder,
}

/// Ordering of the entries in a generated correction table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditOrder {
    /// Most frequent address first, ties alphabetical
    #[default]
    Frequency,
    Alphabetical,
}
