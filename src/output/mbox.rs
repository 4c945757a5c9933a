//! MBOX format handling
//!
//! Messages are concatenated behind `From ` separator lines. Writing an
//! archive never appends to an old one: any existing file is first moved to
//! a `.bak` sibling, and a `.lock` sibling is held while the new file is
//! written.

use crate::model::Group;
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const BACKUP_SUFFIX: &str = ".bak";
const LOCK_SUFFIX: &str = ".lock";

/// One message of an mbox file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MboxMessage {
    /// Envelope separator line, without line ending
    pub from_line: String,

    /// Headers and body as stored (escaped `>From ` lines stay escaped)
    pub content: String,
}

/// Outcome of writing one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub path: PathBuf,

    /// Where the previous archive went, if there was one
    pub backup: Option<PathBuf>,

    pub written: u64,

    /// Empty messages left out of the archive
    pub skipped: usize,
}

/// `<path><suffix>`, e.g. `group.mbx.bak`
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Moves an existing file at `path` to `<path>.bak`, replacing an older backup
pub fn backup_existing(path: &Path) -> io::Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let backup = sibling_path(path, BACKUP_SUFFIX);
    if backup.exists() {
        fs::remove_file(&backup)?;
    }
    fs::rename(path, &backup)?;
    tracing::info!("Moved {} to {}", path.display(), backup.display());

    Ok(Some(backup))
}

/// Exclusive dot-lock next to an archive, removed when dropped
#[derive(Debug)]
pub struct DotLock {
    path: PathBuf,
    released: bool,
}

impl DotLock {
    /// Creates `<target>.lock`; fails if another writer holds it
    pub fn acquire(target: &Path) -> io::Result<Self> {
        let path = sibling_path(target, LOCK_SUFFIX);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    io::Error::new(
                        e.kind(),
                        format!("{} is locked by another writer", target.display()),
                    )
                } else {
                    e
                }
            })?;
        writeln!(file, "{}", std::process::id())?;

        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        fs::remove_file(&self.path)
    }
}

impl Drop for DotLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Removes a lock left behind by an interrupted run
pub fn remove_stale_lock(target: &Path) -> io::Result<()> {
    let lock = sibling_path(target, LOCK_SUFFIX);
    if lock.exists() {
        tracing::warn!("Removing stale lock {}", lock.display());
        fs::remove_file(&lock)?;
    }
    Ok(())
}

/// Serializes messages in mbox format
pub struct MboxWriter<W: Write> {
    writer: W,
    message_count: u64,
}

impl<W: Write> MboxWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            message_count: 0,
        }
    }

    /// Writes a message, keeping its own `From ` line if it starts with one
    pub fn write_message(&mut self, message: &str) -> io::Result<()> {
        match split_envelope(message) {
            (Some(from_line), content) => self.write_entry(from_line, content),
            (None, content) => self.write_entry(&default_from_line(), content),
        }
    }

    /// Writes a message under the given envelope line
    pub fn write_entry(&mut self, from_line: &str, content: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", from_line)?;

        // Escape From_ lines so they are not read back as separators
        for line in content.split_inclusive('\n') {
            if line.starts_with("From ") {
                self.writer.write_all(b">")?;
            }
            self.writer.write_all(line.as_bytes())?;
        }
        if !content.is_empty() && !content.ends_with('\n') {
            self.writer.write_all(b"\n")?;
        }

        // Blank line separator
        writeln!(self.writer)?;

        self.message_count += 1;
        Ok(())
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Splits a leading `From ` envelope line off a message
fn split_envelope(message: &str) -> (Option<&str>, &str) {
    if !message.starts_with("From ") {
        return (None, message);
    }

    match message.split_once('\n') {
        Some((first, rest)) => (Some(first.trim_end_matches('\r')), rest),
        None => (Some(message.trim_end_matches('\r')), ""),
    }
}

fn default_from_line() -> String {
    format!(
        "From MAILER-DAEMON {}",
        Utc::now().format("%a %b %e %H:%M:%S %Y")
    )
}

/// Backup-then-recreate writer for one archive file
///
/// The lock is held from creation until [`ArchiveWriter::finish`]; on early
/// return the lock file is removed when the writer is dropped.
pub struct ArchiveWriter {
    path: PathBuf,
    backup: Option<PathBuf>,
    writer: MboxWriter<BufWriter<File>>,
    lock: DotLock,
    skipped: usize,
}

impl ArchiveWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        let backup = backup_existing(path)?;
        remove_stale_lock(path)?;

        let lock = DotLock::acquire(path)?;
        let file = File::create(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            backup,
            writer: MboxWriter::new(BufWriter::new(file)),
            lock,
            skipped: 0,
        })
    }

    /// Appends a message; empty ones are logged and skipped
    pub fn append(&mut self, message: &str) -> io::Result<bool> {
        if message.trim().is_empty() {
            tracing::warn!("Skipping empty message in {}", self.path.display());
            self.skipped += 1;
            return Ok(false);
        }

        self.writer.write_message(message)?;
        Ok(true)
    }

    /// Appends a message read from another archive
    pub fn append_entry(&mut self, message: &MboxMessage) -> io::Result<()> {
        self.writer.write_entry(&message.from_line, &message.content)
    }

    /// Flushes and syncs the file, then releases the lock
    pub fn finish(self) -> io::Result<WriteReport> {
        let written = self.writer.message_count();
        let file = self
            .writer
            .into_inner()
            .into_inner()
            .map_err(|e| e.into_error())?;
        file.sync_all()?;
        self.lock.release()?;
        drop(file);

        Ok(WriteReport {
            path: self.path,
            backup: self.backup,
            written,
            skipped: self.skipped,
        })
    }
}

/// Writes every message of `group` in traversal order to a fresh archive
pub fn write_group(path: &Path, group: &Group) -> io::Result<WriteReport> {
    let mut archive = ArchiveWriter::create(path)?;
    for message in group.all_messages() {
        archive.append(message)?;
    }
    let report = archive.finish()?;

    tracing::info!(
        "Wrote {} messages to {} ({} skipped)",
        report.written,
        report.path.display(),
        report.skipped
    );
    Ok(report)
}

/// Splits mbox text into messages
///
/// A `From ` line starts a new message at the top of the file or after a
/// blank line.
pub fn parse_mbox(text: &str) -> Vec<MboxMessage> {
    let mut messages = Vec::new();
    let mut current: Option<MboxMessage> = None;
    let mut previous_blank = true;

    for line in text.split_inclusive('\n') {
        let bare = line.trim_end_matches(&['\r', '\n'][..]);

        if previous_blank && bare.starts_with("From ") {
            if let Some(message) = current.take() {
                messages.push(strip_separator(message));
            }
            current = Some(MboxMessage {
                from_line: bare.to_string(),
                content: String::new(),
            });
        } else if let Some(message) = current.as_mut() {
            message.content.push_str(line);
        }

        previous_blank = bare.is_empty();
    }

    if let Some(message) = current {
        messages.push(strip_separator(message));
    }

    messages
}

/// Drops the blank line the writer puts after each message
fn strip_separator(mut message: MboxMessage) -> MboxMessage {
    if message.content.ends_with("\r\n\r\n") {
        message.content.truncate(message.content.len() - 2);
    } else if message.content.ends_with("\n\n") {
        message.content.pop();
    }
    message
}

/// Reads and splits an mbox file
pub fn read_mbox(path: &Path) -> io::Result<Vec<MboxMessage>> {
    let bytes = fs::read(path)?;
    Ok(parse_mbox(&String::from_utf8_lossy(&bytes)))
}
