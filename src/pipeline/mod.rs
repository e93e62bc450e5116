//! Output Pipeline (spec.md §4.B): artifact naming and the writer that owns
//! an in-progress dump file end to end.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

use crate::error::BackupError;

/// Make a database name safe to embed in a filename (spec.md §4.B):
/// replace any character outside `[A-Za-z0-9_-]` with `_`, collapse runs of
/// `_`, trim leading/trailing `_`, and fall back to `unknown` if nothing
/// survives.
pub fn sanitize_database_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        } else {
            out.push('_');
        }
    }

    let mut collapsed = String::with_capacity(out.len());
    let mut prev_underscore = false;
    for c in out.chars() {
        if c == '_' {
            if !prev_underscore {
                collapsed.push(c);
            }
            prev_underscore = true;
        } else {
            collapsed.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Build `<db>_<YYYYMMDD>_<HHMMSS>.sql[.gz]`, UTC, second precision.
pub fn artifact_file_name(database: &str, at: DateTime<Utc>, compressed: bool) -> String {
    let stem = format!(
        "{}_{}",
        sanitize_database_name(database),
        at.format("%Y%m%d_%H%M%S")
    );
    if compressed {
        format!("{stem}.sql.gz")
    } else {
        format!("{stem}.sql")
    }
}

enum Sink {
    Plain(File),
    Gzip(Box<GzEncoder<File>>),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Sink::Plain(f) => f.write(buf),
            Sink::Gzip(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Sink::Plain(f) => f.flush(),
            Sink::Gzip(e) => e.flush(),
        }
    }
}

/// Owns one in-progress artifact file. Every byte written also feeds a
/// running SHA-256 digest, so [`ArtifactWriter::finish`] returns a checksum
/// for free instead of requiring a second read pass over the file.
///
/// If dropped without calling [`ArtifactWriter::finish`], the partial file
/// is deleted — an interrupted dump must never leave a half-written
/// artifact behind for a destination or the retention sweeper to pick up.
pub struct ArtifactWriter {
    path: PathBuf,
    sink: Option<Sink>,
    hasher: Sha256,
    bytes_written: u64,
    finished: bool,
}

impl ArtifactWriter {
    pub fn create(path: impl Into<PathBuf>, compress: bool) -> Result<Self, BackupError> {
        let path = path.into();
        let file = File::create(&path).map_err(BackupError::WriteFailed)?;
        let sink = if compress {
            Sink::Gzip(Box::new(GzEncoder::new(file, Compression::default())))
        } else {
            Sink::Plain(file)
        };
        Ok(Self {
            path,
            sink: Some(sink),
            hasher: Sha256::new(),
            bytes_written: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_all(&mut self, buf: &[u8]) -> Result<(), BackupError> {
        self.hasher.update(buf);
        self.bytes_written += buf.len() as u64;
        self.sink
            .as_mut()
            .expect("write after finish")
            .write_all(buf)
            .map_err(BackupError::WriteFailed)
    }

    /// Flush, close, and return the on-disk byte size and hex SHA-256 digest
    /// computed while writing.
    pub fn finish(mut self) -> Result<(u64, String), BackupError> {
        let mut sink = self.sink.take().expect("finish called twice");
        match &mut sink {
            Sink::Plain(f) => f.flush().map_err(BackupError::WriteFailed)?,
            Sink::Gzip(e) => {
                e.flush().map_err(BackupError::WriteFailed)?;
            }
        }
        if let Sink::Gzip(encoder) = sink {
            encoder.finish().map_err(BackupError::CompressionFailed)?;
        }
        self.finished = true;
        let digest = hex::encode(self.hasher.clone().finalize());
        Ok((self.bytes_written, digest))
    }
}

impl Write for ArtifactWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.hasher.update(buf);
        self.bytes_written += buf.len() as u64;
        self.sink.as_mut().expect("write after finish").write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.sink.as_mut().expect("write after finish").flush()
    }
}

impl Drop for ArtifactWriter {
    fn drop(&mut self) {
        if !self.finished {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-05T14:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn sanitizes_unsafe_characters() {
        assert_eq!(sanitize_database_name("My App/DB"), "My_App_DB");
        assert_eq!(sanitize_database_name(""), "unknown");
    }

    #[test]
    fn collapses_runs_and_trims_leading_trailing_underscores() {
        assert_eq!(sanitize_database_name("  weird//name!!"), "weird_name");
        assert_eq!(sanitize_database_name("***"), "unknown");
    }

    #[test]
    fn file_name_follows_naming_convention() {
        assert_eq!(
            artifact_file_name("app", at(), false),
            "app_20260305_143000.sql"
        );
        assert_eq!(
            artifact_file_name("app", at(), true),
            "app_20260305_143000.sql.gz"
        );
    }

    #[test]
    fn finish_reports_accurate_size_and_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.sql");
        let mut writer = ArtifactWriter::create(&path, false).unwrap();
        writer.write_all(b"hello world").unwrap();
        let (size, digest) = writer.finish().unwrap();
        assert_eq!(size, 11);
        let mut expected = Sha256::new();
        expected.update(b"hello world");
        assert_eq!(digest, hex::encode(expected.finalize()));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn compressed_output_decompresses_back_to_original() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.sql.gz");
        let mut writer = ArtifactWriter::create(&path, true).unwrap();
        writer.write_all(b"some dump content").unwrap();
        writer.finish().unwrap();

        let raw = std::fs::read(&path).unwrap();
        let mut decoder = flate2::read::GzDecoder::new(raw.as_slice());
        let mut decompressed = String::new();
        std::io::Read::read_to_string(&mut decoder, &mut decompressed).unwrap();
        assert_eq!(decompressed, "some dump content");
    }

    #[test]
    fn dropping_without_finish_deletes_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.sql");
        {
            let mut writer = ArtifactWriter::create(&path, false).unwrap();
            writer.write_all(b"partial").unwrap();
        }
        assert!(!path.exists());
    }
}
