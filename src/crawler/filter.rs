//! Message normalization filters
//!
//! Raw messages are piped through an external mail filter (by default
//! procmail's `formail`) before they are archived. The whole exchange is one
//! scoped operation: write all of stdin, close it, read all of stdout, wait.

use crate::config::FilterConfig;
use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Errors raised by a [`MessageFilter`]
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("pipe to '{program}' failed: {source}")]
    Pipe {
        program: String,
        source: std::io::Error,
    },
}

/// Transforms one raw message into its normalized form
#[async_trait]
pub trait MessageFilter: Send + Sync {
    async fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, FilterError>;
}

/// Keeps messages exactly as downloaded
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFilter;

#[async_trait]
impl MessageFilter for PassthroughFilter {
    async fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, FilterError> {
        Ok(raw.to_vec())
    }
}

/// Runs an external program as a stdin-to-stdout filter
#[derive(Debug, Clone)]
pub struct CommandFilter {
    program: String,
    args: Vec<String>,
}

impl CommandFilter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl MessageFilter for CommandFilter {
    async fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, FilterError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FilterError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| FilterError::Pipe {
            program: self.program.clone(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin not captured"),
        })?;

        // Feed stdin while draining stdout so a large message cannot deadlock
        let feed = async move {
            stdin.write_all(raw).await?;
            stdin.shutdown().await
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|source| FilterError::Pipe {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(FilterError::Exit {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        fed.map_err(|source| FilterError::Pipe {
            program: self.program.clone(),
            source,
        })?;

        Ok(output.stdout)
    }
}

/// Builds the filter described by the configuration
pub fn filter_from_config(config: &FilterConfig) -> Box<dyn MessageFilter> {
    if config.command.is_empty() {
        Box::new(PassthroughFilter)
    } else {
        Box::new(CommandFilter::new(config.command.clone(), config.args.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passthrough() {
        let out = PassthroughFilter.normalize(b"Subject: hi\n\nbody\n").await.unwrap();
        assert_eq!(out, b"Subject: hi\n\nbody\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_filter_pipes_through() {
        let filter = CommandFilter::new("cat", Vec::new());
        let out = filter.normalize(b"Subject: hi\n\nbody\n").await.unwrap();
        assert_eq!(out, b"Subject: hi\n\nbody\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_filter_large_input() {
        let filter = CommandFilter::new("cat", Vec::new());
        let input = vec![b'x'; 1 << 20];
        let out = filter.normalize(&input).await.unwrap();
        assert_eq!(out.len(), input.len());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_filter_with_args() {
        let filter = CommandFilter::new("tr", vec!["a-z".to_string(), "A-Z".to_string()]);
        let out = filter.normalize(b"hello").await.unwrap();
        assert_eq!(out, b"HELLO");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_filter_failure_status() {
        let filter = CommandFilter::new("false", Vec::new());
        let result = filter.normalize(b"").await;
        assert!(matches!(result, Err(FilterError::Exit { .. })));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let filter = CommandFilter::new("/nonexistent/gg-archiver-filter", Vec::new());
        let result = filter.normalize(b"x").await;
        assert!(matches!(result, Err(FilterError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_filter_from_config() {
        let config = FilterConfig {
            command: String::new(),
            args: Vec::new(),
        };
        let filter = filter_from_config(&config);
        assert_eq!(filter.normalize(b"same").await.unwrap(), b"same");
    }
}
