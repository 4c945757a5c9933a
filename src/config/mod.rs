//! Configuration module for gg-archiver
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Without a file every setting takes its default.
//!
//! # Example
//!
//! ```no_run
//! use gg_archiver::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("gg-archiver.toml")).unwrap();
//! println!("Archives go to: {}", config.output.directory);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AuditConfig, AuditOrder, Config, FetchConfig, FilterConfig, OutputConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{load_config, load_or_default, parse_config};
pub use validation::validate;
