//! Record archiving functionality
//!
//! Records are written as rows of a CSV file, one file per archived stream.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    writer: Writer<File>,
    path: PathBuf,
    num_records: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot open the archive file {0:?}: {1}")]
    CannotOpen(PathBuf, std::io::Error),

    #[error("Cannot write a record to the archive: {0}")]
    CannotWrite(csv::Error),

    #[error("Cannot flush the archive: {0}")]
    CannotFlush(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(session: &Session, path: P) -> Result<Self, ArchiveError> {
        Self::create(session.arch_root.join(path))
    }

    /// Create a new archiver writing to the given file, truncating it if it
    /// already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ArchiveError::CannotOpen(path.clone(), e))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&path)
            .map_err(|e| ArchiveError::CannotOpen(path.clone(), e))?;

        let writer = WriterBuilder::new().has_headers(true).from_writer(file);

        Ok(Self {
            writer,
            path,
            num_records: 0,
        })
    }

    /// Serialise a record into the archive.
    ///
    /// The header row is derived from the first record written.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        self.writer
            .serialize(record)
            .map_err(ArchiveError::CannotWrite)?;
        self.writer.flush().map_err(ArchiveError::CannotFlush)?;
        self.num_records += 1;

        Ok(())
    }

    /// Path of the archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far.
    pub fn num_records(&self) -> usize {
        self.num_records
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        theta_steps: i32,
        phi_steps: i32,
        value: f64,
    }

    #[test]
    fn test_archiver_writes_header_and_rows() {
        let path = std::env::temp_dir()
            .join(format!("gonio_archive_test_{}", std::process::id()))
            .join("rows.csv");

        let mut arch = Archiver::create(&path).unwrap();
        arch.serialise(Row {
            theta_steps: 0,
            phi_steps: 0,
            value: 1.5,
        })
        .unwrap();
        arch.serialise(Row {
            theta_steps: 1,
            phi_steps: 2,
            value: 0.25,
        })
        .unwrap();
        assert_eq!(arch.num_records(), 2);

        let text = std::fs::read_to_string(arch.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["theta_steps,phi_steps,value", "0,0,1.5", "1,2,0.25"]);

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
