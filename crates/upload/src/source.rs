//! Byte sources and chunk windowing.
//!
//! A [`ByteSource`] is read in bounded windows so memory stays
//! proportional to the chunk size regardless of total payload size.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::UploadError;

/// Computes the byte window for the next chunk.
///
/// Returns `(offset, min(offset + chunk_size, total))`.
pub fn chunk_window(offset: i64, total: i64, chunk_size: i64) -> (i64, i64) {
    (offset, std::cmp::min(offset + chunk_size, total))
}

/// A byte-addressable upload source with a known total length.
pub trait ByteSource: Send {
    /// Total length in bytes.
    fn len(&self) -> i64;

    /// Returns `true` when the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Display name, used for progress events and ticket requests.
    fn name(&self) -> &str;

    /// MIME type announced to the server.
    fn mime_type(&self) -> &str;

    /// Reads exactly the bytes in `[start, end)`.
    ///
    /// The returned slice never includes bytes outside the window.
    fn read_range(&mut self, start: i64, end: i64) -> Result<Vec<u8>, UploadError>;
}

fn check_window(start: i64, end: i64, len: i64) -> Result<(), UploadError> {
    if start < 0 || start > end || end > len {
        return Err(UploadError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("byte range [{start}, {end}) outside source of {len} bytes"),
        )));
    }
    Ok(())
}

/// A source backed by a file on disk. Reads are windowed via seek; the
/// file is never loaded into memory wholesale.
pub struct FileSource {
    file: File,
    len: i64,
    name: String,
    mime_type: String,
}

impl FileSource {
    /// Opens `path` for windowed reading.
    pub fn open(path: &Path, mime_type: &str) -> Result<Self, UploadError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as i64;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            file,
            len,
            name,
            mime_type: mime_type.to_string(),
        })
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> i64 {
        self.len
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn read_range(&mut self, start: i64, end: i64) -> Result<Vec<u8>, UploadError> {
        check_window(start, end, self.len)?;
        self.file.seek(SeekFrom::Start(start as u64))?;
        let mut buf = vec![0u8; (end - start) as usize];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// An in-memory source, mainly for small payloads and tests.
pub struct MemorySource {
    data: Vec<u8>,
    name: String,
    mime_type: String,
}

impl MemorySource {
    pub fn new(data: Vec<u8>, name: &str, mime_type: &str) -> Self {
        Self {
            data,
            name: name.to_string(),
            mime_type: mime_type.to_string(),
        }
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> i64 {
        self.data.len() as i64
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn read_range(&mut self, start: i64, end: i64) -> Result<Vec<u8>, UploadError> {
        check_window(start, end, self.len())?;
        Ok(self.data[start as usize..end as usize].to_vec())
    }
}
