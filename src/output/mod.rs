//! Output module for archives, address tables and run reports
//!
//! This module handles:
//! - Writing the mbox archive with backup and locking
//! - Auditing redacted addresses into a correction table
//! - Applying a filled-in table to an existing archive
//! - Saving and loading crawl snapshots

pub mod audit;
pub mod demangle;
pub mod mbox;
pub mod snapshot;
pub mod stats;

pub use audit::{audit_group, audit_messages, find_mangled_addresses, CorrectionTable};
pub use demangle::{demangle, demangle_messages, DemangleReport};
pub use mbox::{
    parse_mbox, read_mbox, write_group, ArchiveWriter, DotLock, MboxMessage, MboxWriter,
    WriteReport,
};
pub use stats::{print_demangle_report, print_run_report, RunReport};

use crate::config::Config;
use crate::model::Group;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of the mbox archive
pub const ARCHIVE_EXTENSION: &str = "mbx";

/// Extension of the correction table
pub const TABLE_EXTENSION: &str = "cnf";

/// Path of `<name>.<extension>` inside the configured output directory
pub fn output_path(config: &Config, name: &str, extension: &str) -> PathBuf {
    Path::new(&config.output.directory).join(format!("{}.{}", name, extension))
}

/// Writes the archive and the correction scaffold for a crawled group
///
/// # Arguments
///
/// * `config` - Provides the output directory and the audit order
/// * `group` - The crawled group
///
/// # Returns
///
/// * `Ok(RunReport)` - Both files were written
/// * `Err(ArchiverError)` - Writing either file failed
pub fn archive_group(config: &Config, group: &Group) -> Result<RunReport> {
    fs::create_dir_all(&config.output.directory)?;

    let archive = write_group(
        &output_path(config, &group.name, ARCHIVE_EXTENSION),
        group,
    )?;

    let table = audit_group(group, config.audit.order);
    let table_path = output_path(config, &group.name, TABLE_EXTENSION);
    table.save(&table_path)?;
    tracing::info!(
        "Wrote {} redacted addresses to {}",
        table.len(),
        table_path.display()
    );

    Ok(RunReport::new(group, archive, table_path, table.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Article, Topic};
    use tempfile::TempDir;

    #[test]
    fn test_archive_group_writes_both_files() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.directory = dir.path().join("out").to_string_lossy().into_owned();

        let mut group = Group::new("https://groups.google.com/forum/#!forum/test", "test");
        let mut topic = Topic::new("https://t/1", "One");
        topic.articles.push(Article {
            url: "https://a/1".to_string(),
            raw_message: "From: jo...@example.com\n\nhello\n".to_string(),
        });
        group.topics.push(topic);

        let report = archive_group(&config, &group).unwrap();

        assert_eq!(report.archive.path, dir.path().join("out/test.mbx"));
        assert_eq!(report.archive.written, 1);
        assert_eq!(report.table_entries, 1);

        let table = CorrectionTable::load(&report.table_path).unwrap();
        assert_eq!(table.get("jo...@example.com"), Some(""));
    }
}
