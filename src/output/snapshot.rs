//! Checkpoint of a fully crawled group
//!
//! Saving happens once, after a complete crawl; there is no partial resume.

use crate::model::Group;
use crate::output::mbox::sibling_path;
use crate::Result;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Writes `group` as JSON, replacing `path` only once the write succeeded
pub fn save(path: &Path, group: &Group) -> Result<()> {
    let partial = sibling_path(path, ".part");
    {
        let mut writer = BufWriter::new(File::create(&partial)?);
        serde_json::to_writer(&mut writer, group)?;
        writer.flush()?;
    }
    fs::rename(&partial, path)?;
    Ok(())
}

/// Reads a group saved by [`save`]
pub fn load(path: &Path) -> Result<Group> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
