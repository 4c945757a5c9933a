//! Run statistics
//!
//! This module collects what one `run` produced and prints it once the
//! archive and the correction table are on disk.

use crate::model::Group;
use crate::output::demangle::DemangleReport;
use crate::output::mbox::WriteReport;
use std::path::PathBuf;

/// Summary of one archive run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Group short name
    pub group: String,

    /// Number of topics found in the listing
    pub topics: usize,

    /// Number of articles found across all topics
    pub articles: usize,

    /// Articles whose message could not be downloaded
    pub missing: usize,

    /// Archive write outcome
    pub archive: WriteReport,

    /// Where the correction scaffold was written
    pub table_path: PathBuf,

    /// Distinct redacted addresses in the scaffold
    pub table_entries: usize,
}

impl RunReport {
    /// Builds the report for a group that has been written out
    ///
    /// # Arguments
    ///
    /// * `group` - The crawled group
    /// * `archive` - Outcome of writing the mbox file
    /// * `table_path` - Location of the correction table
    /// * `table_entries` - Number of addresses in that table
    pub fn new(
        group: &Group,
        archive: WriteReport,
        table_path: PathBuf,
        table_entries: usize,
    ) -> Self {
        Self {
            group: group.name.clone(),
            topics: group.topics.len(),
            articles: group.article_count(),
            missing: group.missing_count(),
            archive,
            table_path,
            table_entries,
        }
    }

    /// Share of articles that made it into the archive, in percent
    pub fn completeness(&self) -> f64 {
        if self.articles == 0 {
            return 100.0;
        }
        ((self.articles - self.missing) as f64 / self.articles as f64) * 100.0
    }
}

/// Prints a run report to stdout
pub fn print_run_report(report: &RunReport) {
    println!("=== Archive of {} ===\n", report.group);

    println!("Crawl:");
    println!("  Topics: {}", report.topics);
    println!("  Articles: {}", report.articles);
    if report.missing > 0 {
        println!("  Missing messages: {}", report.missing);
    }
    println!("  Completeness: {:.1}%", report.completeness());
    println!();

    println!("Output:");
    println!(
        "  Archive: {} ({} messages)",
        report.archive.path.display(),
        report.archive.written
    );
    if let Some(backup) = &report.archive.backup {
        println!("  Previous archive: {}", backup.display());
    }
    println!(
        "  Address table: {} ({} addresses)",
        report.table_path.display(),
        report.table_entries
    );
}

/// Prints a demangle report to stdout
pub fn print_demangle_report(report: &DemangleReport) {
    println!(
        "Change counter = {} ({} of {} messages rewritten)",
        report.substitutions, report.rewritten, report.messages
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Article, Topic};

    fn report_for(messages: &[&str]) -> RunReport {
        let mut group = Group::new("https://groups.google.com/forum/#!forum/test", "test");
        let mut topic = Topic::new("https://t/1", "One");
        for (i, message) in messages.iter().enumerate() {
            topic.articles.push(Article {
                url: format!("https://a/{}", i),
                raw_message: message.to_string(),
            });
        }
        group.topics.push(topic);

        let archive = WriteReport {
            path: PathBuf::from("test.mbx"),
            backup: None,
            written: messages.iter().filter(|m| !m.is_empty()).count() as u64,
            skipped: messages.iter().filter(|m| m.is_empty()).count(),
        };
        RunReport::new(&group, archive, PathBuf::from("test.cnf"), 0)
    }

    #[test]
    fn test_run_report_counts() {
        let report = report_for(&["Subject: 1\n\none\n", "", "Subject: 3\n\nthree\n"]);

        assert_eq!(report.group, "test");
        assert_eq!(report.topics, 1);
        assert_eq!(report.articles, 3);
        assert_eq!(report.missing, 1);
        assert_eq!(report.archive.written, 2);
    }

    #[test]
    fn test_completeness() {
        let report = report_for(&["a", "", "b", "c"]);
        assert!((report.completeness() - 75.0).abs() < f64::EPSILON);

        let empty = report_for(&[]);
        assert!((empty.completeness() - 100.0).abs() < f64::EPSILON);
    }
}
