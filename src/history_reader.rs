//! Reverse reading of the package manager history log
//!
//! The history log is append-only and grows without bound, so it is read from
//! the end in fixed-size chunks. Only one chunk plus the unfinished line that
//! straddles a chunk boundary is held in memory at any time.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Default amount of bytes pulled from the file per read
pub const CHUNK_SIZE: usize = 64 * 1024; // 64KB chunks

/// Iterator over the lines of a file, last line first
///
/// Lines are split on `\n`, a trailing `\r` is dropped and the bytes are
/// decoded as UTF-8 (invalid sequences are replaced). A final newline at the
/// end of the file terminates the last line rather than starting an empty one.
pub struct ReverseLines<R> {
    reader: R,
    offset: u64,
    file_size: u64,
    chunk_size: usize,
    buffer: Vec<u8>,
    done: bool,
}

impl<R: Read + Seek> ReverseLines<R> {
    pub fn new(reader: R) -> io::Result<Self> {
        Self::with_chunk_size(reader, CHUNK_SIZE)
    }

    pub fn with_chunk_size(mut reader: R, chunk_size: usize) -> io::Result<Self> {
        let file_size = reader.seek(SeekFrom::End(0))?;

        Ok(Self {
            reader,
            offset: file_size,
            file_size,
            chunk_size: chunk_size.max(1),
            buffer: Vec::new(),
            done: file_size == 0,
        })
    }

    /// Prepend the chunk preceding the current offset to the buffer
    fn fill(&mut self) -> io::Result<()> {
        let read_size = (self.chunk_size as u64).min(self.offset);
        let is_tail = self.offset == self.file_size;
        self.offset -= read_size;

        self.reader.seek(SeekFrom::Start(self.offset))?;
        let mut chunk = vec![0u8; read_size as usize];
        self.reader.read_exact(&mut chunk)?;

        if is_tail && chunk.last() == Some(&b'\n') {
            chunk.pop();
        }

        chunk.append(&mut self.buffer);
        self.buffer = chunk;
        Ok(())
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().rposition(|&b| b == b'\n') {
                let line = self.buffer.split_off(pos + 1);
                self.buffer.truncate(pos);
                return Ok(Some(decode_line(&line)));
            }

            if self.offset == 0 {
                // The remaining bytes are the first line of the file
                self.done = true;
                let line = std::mem::take(&mut self.buffer);
                return Ok(Some(decode_line(&line)));
            }

            self.fill()?;
        }
    }
}

impl<R: Read + Seek> Iterator for ReverseLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_line() {
            Ok(line) => line.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// One history entry: every `Tag: value...` line of a blank-line separated group
///
/// The tag keeps its trailing colon (`Commandline:`), the value is the rest of
/// the line split on whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogBlock {
    fields: HashMap<String, Vec<String>>,
}

impl LogBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a block from lines given in file order
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut block = Self::new();
        for line in lines {
            block.insert_line(line);
        }
        block
    }

    /// Add one line to the block, returns false for a blank line
    ///
    /// A tag that is already present is overwritten.
    pub fn insert_line(&mut self, line: &str) -> bool {
        let mut tokens = line.split_whitespace();
        let Some(tag) = tokens.next() else {
            return false;
        };

        self.fields
            .insert(tag.to_string(), tokens.map(String::from).collect());
        true
    }

    pub fn get(&self, tag: &str) -> Option<&[String]> {
        self.fields.get(tag).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Iterator over history blocks, most recently appended block first
///
/// A blank line closes the block read so far. A blank line with nothing
/// accumulated (two blank lines in a row, or a blank last line) ends the
/// iteration just like the start of the file does.
///
/// Owns the underlying file handle, which is closed once the iterator is
/// dropped, whether it was exhausted or not.
pub struct HistoryBlocks<R> {
    lines: ReverseLines<R>,
    done: bool,
}

impl HistoryBlocks<File> {
    /// Open a history log for reverse block iteration
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> HistoryBlocks<R> {
    pub fn new(reader: R) -> io::Result<Self> {
        Ok(Self {
            lines: ReverseLines::new(reader)?,
            done: false,
        })
    }

    pub fn with_chunk_size(reader: R, chunk_size: usize) -> io::Result<Self> {
        Ok(Self {
            lines: ReverseLines::with_chunk_size(reader, chunk_size)?,
            done: false,
        })
    }
}

impl<R: Read + Seek> Iterator for HistoryBlocks<R> {
    type Item = io::Result<LogBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut block = LogBlock::new();

        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    if !block.insert_line(&line) {
                        if block.is_empty() {
                            self.done = true;
                            return None;
                        }
                        return Some(Ok(block));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return (!block.is_empty()).then_some(Ok(block));
                }
            }
        }
    }
}
