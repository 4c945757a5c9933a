//! Redacted address audit and the correction table
//!
//! The forum hides part of every address it shows (`jo...@example.com`).
//! The audit collects those fragments into an INI file with one empty value
//! per address; a human fills in the real addresses and `demangle` applies
//! them to an archive.

use crate::config::AuditOrder;
use crate::model::Group;
use crate::Result;
use ini::Ini;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// INI section holding the table
pub const ADDRESS_SECTION: &str = "addresses";

/// An address whose local part ends in a run of dots
pub static MANGLED_ADDR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[a-z0-9_+-][a-z0-9_.+-]*?\.+@[a-z0-9-]+(?:\.[a-z0-9-]+)+")
        .expect("valid regex")
});

/// Ordered mapping from redacted address to its replacement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionTable {
    entries: Vec<(String, String)>,
}

impl CorrectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the replacement for `address`, keeping its position if present
    pub fn insert(&mut self, address: impl Into<String>, replacement: impl Into<String>) {
        let address = address.into();
        let replacement = replacement.into();
        match self.entries.iter_mut().find(|(key, _)| *key == address) {
            Some(entry) => entry.1 = replacement,
            None => self.entries.push((address, replacement)),
        }
    }

    pub fn get(&self, address: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == address)
            .map(|(_, value)| value.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the table as an INI file with a single `[addresses]` section
    pub fn save(&self, path: &Path) -> Result<()> {
        // rust-ini drops sections without keys
        if self.entries.is_empty() {
            fs::write(path, format!("[{}]\n", ADDRESS_SECTION))?;
            return Ok(());
        }

        let mut ini = Ini::new();
        ini.with_section(Some(ADDRESS_SECTION));
        for (address, replacement) in &self.entries {
            ini.set_to(Some(ADDRESS_SECTION), address.clone(), replacement.clone());
        }
        ini.write_to_file(path)?;
        Ok(())
    }

    /// Reads a table written by [`CorrectionTable::save`] or by hand
    ///
    /// A file without an `[addresses]` section yields an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        let ini = Ini::load_from_file(path)?;
        let mut table = Self::new();

        if let Some(section) = ini.section(Some(ADDRESS_SECTION)) {
            for (address, replacement) in section.iter() {
                table.insert(address, replacement);
            }
        }

        Ok(table)
    }
}

/// Finds every redacted address in `text`
pub fn find_mangled_addresses(text: &str) -> impl Iterator<Item = &str> {
    MANGLED_ADDR_RE.find_iter(text).map(|m| m.as_str())
}

/// Builds a correction scaffold from message bodies
///
/// Each distinct address appears once with an empty replacement, however
/// often it occurs.
pub fn audit_messages<'a>(
    messages: impl IntoIterator<Item = &'a str>,
    order: AuditOrder,
) -> CorrectionTable {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for message in messages {
        for address in find_mangled_addresses(message) {
            *counts.entry(address).or_insert(0) += 1;
        }
    }

    let mut addresses: Vec<(&str, usize)> = counts.into_iter().collect();
    match order {
        AuditOrder::Frequency => {
            addresses.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        }
        AuditOrder::Alphabetical => addresses.sort_by(|a, b| a.0.cmp(b.0)),
    }

    let mut table = CorrectionTable::new();
    for (address, count) in addresses {
        tracing::debug!("{} seen {} times", address, count);
        table.insert(address, "");
    }
    table
}

/// Audits every message of a crawled group
pub fn audit_group(group: &Group, order: AuditOrder) -> CorrectionTable {
    audit_messages(group.all_messages(), order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_finds_redacted_addresses() {
        let text = "Reply from jo...@example.com and al...@mail.example.org.\n\
                    Plain john@example.com is ignored.";
        let found: Vec<&str> = find_mangled_addresses(text).collect();
        assert_eq!(found, vec!["jo...@example.com", "al...@mail.example.org"]);
    }

    #[test]
    fn test_finds_dotted_local_part() {
        let found: Vec<&str> = find_mangled_addresses("<first.la...@example.com>").collect();
        assert_eq!(found, vec!["first.la...@example.com"]);
    }

    #[test]
    fn test_audit_deduplicates() {
        let messages = [
            "jo...@example.com wrote: al...@example.com",
            "jo...@example.com again, and jo...@example.com",
        ];
        let table = audit_messages(messages, AuditOrder::Alphabetical);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("jo...@example.com"), Some(""));
        assert_eq!(table.get("al...@example.com"), Some(""));
    }

    #[test]
    fn test_alphabetical_order() {
        let table = audit_messages(
            ["zz...@example.com jo...@example.com al...@example.com"],
            AuditOrder::Alphabetical,
        );
        let keys: Vec<&str> = table.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["al...@example.com", "jo...@example.com", "zz...@example.com"]
        );
    }

    #[test]
    fn test_frequency_order() {
        let table = audit_messages(
            [
                "zz...@example.com",
                "jo...@example.com jo...@example.com",
                "al...@example.com",
            ],
            AuditOrder::Frequency,
        );
        let keys: Vec<&str> = table.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["jo...@example.com", "al...@example.com", "zz...@example.com"]
        );
    }

    #[test]
    fn test_no_addresses() {
        let table = audit_messages(["nothing to see", ""], AuditOrder::Frequency);
        assert!(table.is_empty());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut table = CorrectionTable::new();
        table.insert("a...@x.com", "");
        table.insert("b...@x.com", "");
        table.insert("a...@x.com", "alice@x.com");

        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[0], ("a...@x.com".to_string(), "alice@x.com".to_string()));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.cnf");

        let mut table = CorrectionTable::new();
        table.insert("jo...@example.com", "");
        table.insert("al...@example.com", "alice@example.com");
        table.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[addresses]"));

        let loaded = CorrectionTable::load(&path).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_save_empty_table_keeps_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.cnf");

        CorrectionTable::new().save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[addresses]"));
        assert!(CorrectionTable::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_hand_written_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixed.cnf");
        std::fs::write(
            &path,
            "[addresses]\njo...@example.com = john@example.com\nal...@example.com =\n",
        )
        .unwrap();

        let table = CorrectionTable::load(&path).unwrap();
        assert_eq!(table.get("jo...@example.com"), Some("john@example.com"));
        assert_eq!(table.get("al...@example.com"), Some(""));
    }

    #[test]
    fn test_load_without_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.cnf");
        std::fs::write(&path, "[other]\nkey = value\n").unwrap();

        assert!(CorrectionTable::load(&path).unwrap().is_empty());
    }
}
