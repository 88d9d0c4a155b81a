//! CSV archiving functionality
//!
//! An [`Archiver`] writes one CSV row per call to [`Archiver::serialise`], into a file under the
//! session's archive root. Rows are flushed immediately so that archives survive an abrupt
//! shutdown of the executable.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    path: PathBuf,
    writer: Writer<File>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Could not create the archive file {0:?}: {1}")]
    CreateError(PathBuf, std::io::Error),

    #[error("Could not write a record to {0:?}: {1}")]
    WriteError(PathBuf, csv::Error),

    #[error("Could not flush the archive {0:?}: {1}")]
    FlushError(PathBuf, std::io::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    ///
    /// Any missing parent directories are created, and an existing file is truncated.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, ArchiveError> {
        Self::create(session.arch_root.join(path))
    }

    /// Create a new archiver writing to an explicit file path.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ArchiveError::CreateError(path.clone(), e))?;
        }

        let file = File::create(&path)
            .map_err(|e| ArchiveError::CreateError(path.clone(), e))?;

        let writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            path,
            writer
        })
    }

    /// The path of the archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialise a record into the archive.
    ///
    /// The header row is written before the first record, using the record's field names.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        self.writer
            .serialize(record)
            .map_err(|e| ArchiveError::WriteError(self.path.clone(), e))?;

        self.writer
            .flush()
            .map_err(|e| ArchiveError::FlushError(self.path.clone(), e))
    }
}
