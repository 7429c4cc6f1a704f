//! Zip packaging of generated documents

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::Compression;
use crate::error::GenerationError;

/// In-memory zip accumulator owned by one batch
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    entries: usize,
}

impl ArchiveBuilder {
    pub fn new(compression: Compression) -> Self {
        let method = match compression {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflated => CompressionMethod::Deflated,
        };
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(method),
            entries: 0,
        }
    }

    /// Append one file; names must already be unique within the batch
    pub fn add(&mut self, name: &str, bytes: &[u8]) -> Result<(), GenerationError> {
        self.writer
            .start_file(name, self.options)
            .map_err(|e| GenerationError::Archive(format!("{}: {}", name, e)))?;
        self.writer
            .write_all(bytes)
            .map_err(|e| GenerationError::Archive(format!("{}: {}", name, e)))?;
        self.entries += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn finish(self) -> Result<Vec<u8>, GenerationError> {
        let cursor = self
            .writer
            .finish()
            .map_err(|e| GenerationError::Archive(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}
