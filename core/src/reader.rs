//! Incremental tailing of the game log.
//!
//! The game appends to its log while we read it, and truncates it whenever
//! it restarts. [`LogTailReader`] remembers how far it has read, hands back
//! only complete lines appended since the last poll, and reports a rotation
//! when the file shrinks below that offset.

use encoding_rs::UTF_8;
use memchr::memchr_iter;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Byte-level access to a growing file.
///
/// `size` returns `None` when the file does not exist (yet).
pub trait LogSource {
    fn size(&self) -> io::Result<Option<u64>>;
    fn read_from(&self, offset: u64, len: u64) -> io::Result<Vec<u8>>;
    fn describe(&self) -> String;
}

/// A log file on disk, reopened on every poll so a replaced file is picked up.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSource for FileSource {
    fn size(&self) -> io::Result<Option<u64>> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read_from(&self, offset: u64, len: u64) -> io::Result<Vec<u8>> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(len as usize);
        file.take(len).read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Result of a single poll.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TailBatch {
    /// The file shrank since the previous poll; tailing restarted at 0.
    pub rotated: bool,
    /// Complete lines appended since the previous poll, without terminators.
    pub lines: Vec<String>,
}

impl TailBatch {
    pub fn is_empty(&self) -> bool {
        !self.rotated && self.lines.is_empty()
    }
}

pub struct LogTailReader<S: LogSource> {
    source: S,
    offset: u64,
    /// Bytes after the last newline seen, waiting for the rest of their line.
    pending: Vec<u8>,
}

impl<S: LogSource> LogTailReader<S> {
    /// Tail from the beginning of the file.
    pub fn new(source: S) -> Self {
        Self::with_offset(source, 0)
    }

    pub fn with_offset(source: S, offset: u64) -> Self {
        Self {
            source,
            offset,
            pending: Vec::new(),
        }
    }

    /// Tail from the current end of the file, skipping existing history.
    pub fn at_end(source: S) -> Self {
        let offset = match source.size() {
            Ok(len) => len.unwrap_or(0),
            Err(e) => {
                tracing::warn!(source = %source.describe(), error = %e, "Failed to stat log, tailing from start");
                0
            }
        };
        Self::with_offset(source, offset)
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Read whatever was appended since the last poll.
    ///
    /// Never fails: a missing file or an unreadable one yields an empty batch
    /// and is retried on the next poll.
    pub fn poll(&mut self) -> TailBatch {
        let mut batch = TailBatch::default();

        let size = match self.source.size() {
            Ok(Some(size)) => size,
            Ok(None) => return batch,
            Err(e) => {
                tracing::warn!(source = %self.source.describe(), error = %e, "Failed to stat log");
                return batch;
            }
        };

        if size < self.offset {
            tracing::info!(
                source = %self.source.describe(),
                previous_offset = self.offset,
                size,
                "Log shrank, restarting from the beginning"
            );
            self.offset = 0;
            self.pending.clear();
            batch.rotated = true;
        }

        if size == self.offset {
            return batch;
        }

        let bytes = match self.source.read_from(self.offset, size - self.offset) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(source = %self.source.describe(), error = %e, "Failed to read log");
                return batch;
            }
        };
        // The file may have been truncated between stat and read.
        self.offset += bytes.len() as u64;
        self.pending.extend_from_slice(&bytes);

        batch.lines = self.drain_complete_lines();
        batch
    }

    fn drain_complete_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;
        for end in memchr_iter(b'\n', &self.pending) {
            let raw = &self.pending[start..end];
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            lines.push(decode_lossy(raw));
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }
}

/// Decode UTF-8, replacing invalid sequences with U+FFFD.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let (text, _had_errors) = UTF_8.decode_without_bom_handling(bytes);
    text.into_owned()
}


#[cfg(test)]
mod tests {
    use super::memory::MemorySource;
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_no_data() {
        let source = MemorySource::missing();
        let mut reader = LogTailReader::new(source.clone());
        assert!(reader.poll().is_empty());

        source.append(b"hello\n");
        assert_eq!(reader.poll().lines, vec!["hello"]);
    }

    #[test]
    fn test_only_new_lines_are_returned() {
        let source = MemorySource::with(b"one\ntwo\n");
        let mut reader = LogTailReader::new(source.clone());
        assert_eq!(reader.poll().lines, vec!["one", "two"]);
        assert!(reader.poll().is_empty());

        source.append(b"three\r\n");
        assert_eq!(reader.poll().lines, vec!["three"]);
        assert_eq!(reader.offset(), 15);
    }

    #[test]
    fn test_partial_line_waits_for_newline() {
        let source = MemorySource::with(b"MARK CHUNK:abc:1:{\"ty");
        let mut reader = LogTailReader::new(source.clone());
        assert!(reader.poll().lines.is_empty());

        source.append(b"pe\":1}\nnext");
        assert_eq!(reader.poll().lines, vec!["MARK CHUNK:abc:1:{\"type\":1}"]);

        source.append(b"\n");
        assert_eq!(reader.poll().lines, vec!["next"]);
    }

    #[test]
    fn test_shrink_resets_offset() {
        let source = MemorySource::with(&[b'x'; 1000]);
        let mut reader = LogTailReader::at_end(source.clone());
        assert_eq!(reader.offset(), 1000);

        let mut fresh = b"restarted\n".to_vec();
        fresh.resize(200, b'y');
        source.replace(&fresh);

        let batch = reader.poll();
        assert!(batch.rotated);
        assert_eq!(batch.lines, vec!["restarted"]);
        assert_eq!(reader.offset(), 200);
    }

    #[test]
    fn test_shrink_discards_pending_fragment() {
        let source = MemorySource::with(b"half a li");
        let mut reader = LogTailReader::new(source.clone());
        assert!(reader.poll().lines.is_empty());

        source.replace(b"new\n");
        let batch = reader.poll();
        assert!(batch.rotated);
        assert_eq!(batch.lines, vec!["new"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let source = MemorySource::with(b"ok \xff\xfe done\n");
        let mut reader = LogTailReader::new(source);
        let lines = reader.poll().lines;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ok "));
        assert!(lines[0].ends_with(" done"));
        assert!(lines[0].contains('\u{FFFD}'));
    }

    #[test]
    fn test_at_end_skips_history() {
        let source = MemorySource::with(b"old line\n");
        let mut reader = LogTailReader::at_end(source.clone());
        assert!(reader.poll().is_empty());

        source.append(b"new line\n");
        assert_eq!(reader.poll().lines, vec!["new line"]);
    }

    #[test]
    fn test_file_source_tails_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Lua.log");
        let mut reader = LogTailReader::new(FileSource::new(&path));
        assert!(reader.poll().is_empty());

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "first").unwrap();
        assert_eq!(reader.poll().lines, vec!["first"]);

        writeln!(file, "second").unwrap();
        assert_eq!(reader.poll().lines, vec!["second"]);
    }
}
