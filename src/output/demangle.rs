//! Applying a filled-in correction table to an archive

use crate::output::audit::{CorrectionTable, MANGLED_ADDR_RE};
use crate::output::mbox::{read_mbox, ArchiveWriter, MboxMessage};
use crate::Result;
use regex::{Captures, Regex};
use std::path::Path;

/// Outcome of one demangle run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemangleReport {
    pub messages: usize,

    /// Messages that had at least one substitution
    pub rewritten: usize,

    /// Replacements actually performed
    pub substitutions: usize,
}

struct Substitution {
    pattern: Regex,
    replacement: String,
}

/// Word-bounded, case-insensitive patterns for every filled-in entry
///
/// An entry never matches the front of a longer address, so
/// `jo...@example.com` leaves `jo...@example.com.au` alone.
fn compile(table: &CorrectionTable) -> Vec<Substitution> {
    table
        .entries()
        .iter()
        .filter(|(_, replacement)| !replacement.trim().is_empty())
        .filter_map(|(address, replacement)| {
            // Group 1 catches a longer domain continuing past the entry
            let pattern = format!(r"(?i)\b{}\b(\.[a-z0-9-]+)?", regex::escape(address));
            match Regex::new(&pattern) {
                Ok(pattern) => Some(Substitution {
                    pattern,
                    replacement: replacement.trim().to_string(),
                }),
                Err(e) => {
                    tracing::warn!("Ignoring table entry {}: {}", address, e);
                    None
                }
            }
        })
        .collect()
}

/// Rewrites redacted addresses in message contents
///
/// Only messages containing a redacted address are touched; envelope lines
/// are never rewritten.
pub fn demangle_messages(
    table: &CorrectionTable,
    messages: &mut [MboxMessage],
) -> DemangleReport {
    let substitutions = compile(table);
    let mut report = DemangleReport {
        messages: messages.len(),
        ..Default::default()
    };

    for message in messages.iter_mut() {
        if !MANGLED_ADDR_RE.is_match(&message.content) {
            continue;
        }

        let mut changed = 0;
        for substitution in &substitutions {
            let mut hits = 0;
            let rewritten = substitution
                .pattern
                .replace_all(&message.content, |caps: &Captures| {
                    if caps.get(1).is_some() {
                        caps[0].to_string()
                    } else {
                        hits += 1;
                        substitution.replacement.clone()
                    }
                })
                .into_owned();

            if hits > 0 {
                message.content = rewritten;
                changed += hits;
            }
        }

        if changed > 0 {
            report.rewritten += 1;
            report.substitutions += changed;
        }
    }

    report
}

/// Applies the table at `table_path` to `input`, writing `output`
///
/// An existing `output` is backed up first, exactly like a crawl archive.
pub fn demangle(table_path: &Path, input: &Path, output: &Path) -> Result<DemangleReport> {
    let table = CorrectionTable::load(table_path)?;
    let filled = table
        .entries()
        .iter()
        .filter(|(_, replacement)| !replacement.trim().is_empty())
        .count();
    tracing::info!(
        "Loaded {} corrections ({} filled in) from {}",
        table.len(),
        filled,
        table_path.display()
    );

    let mut messages = read_mbox(input)?;
    let report = demangle_messages(&table, &mut messages);

    let mut archive = ArchiveWriter::create(output)?;
    for message in &messages {
        archive.append_entry(message)?;
    }
    archive.finish()?;

    tracing::info!(
        "Change counter = {} ({} of {} messages rewritten)",
        report.substitutions,
        report.rewritten,
        report.messages
    );
    Ok(report)
}
