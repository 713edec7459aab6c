//src/seqio.rs

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::types::{ReadRecord, RefRecord};

/// Open a possibly gzip-compressed file for buffered reading. Compression
/// is detected by the `.gz` extension.
fn open_reader(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let f = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", path.display())))?;

    let is_gz = path.extension().map(|ext| ext == "gz").unwrap_or(false);

    Ok(if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    })
}

/// Split a FASTA/FASTQ header into id (first word) and comment (the rest).
fn split_header(header: &str) -> (String, String) {
    match header.split_once(char::is_whitespace) {
        Some((id, rest)) => (id.to_string(), rest.trim().to_string()),
        None => (header.to_string(), String::new()),
    }
}

/// Streaming FASTA reader. Sequences may span multiple lines; records are
/// yielded one at a time so large reference sets never sit in memory.
pub struct FastaReader {
    reader: Box<dyn BufRead>,
    pending_header: Option<String>,
    done: bool,
}

impl std::fmt::Debug for FastaReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastaReader")
            .field("pending_header", &self.pending_header)
            .field("done", &self.done)
            .finish()
    }
}

impl FastaReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self {
            reader: open_reader(path.as_ref())?,
            pending_header: None,
            done: false,
        })
    }
}

impl Iterator for FastaReader {
    type Item = io::Result<RefRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut line = String::new();

        // Scan forward to the next header unless one is already buffered
        // from the previous record.
        while self.pending_header.is_none() {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {
                    if let Some(h) = line.trim_end().strip_prefix('>') {
                        self.pending_header = Some(h.to_string());
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        let header = self.pending_header.take().unwrap_or_default();
        let mut seq = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim_end();
                    if let Some(h) = trimmed.strip_prefix('>') {
                        self.pending_header = Some(h.to_string());
                        break;
                    }
                    seq.push_str(trimmed);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        let (id, comment) = split_header(&header);
        Some(Ok(RefRecord { id, comment, seq }))
    }
}

/// Streaming FASTQ reader over 4-line records. A truncated trailing record
/// is dropped.
pub struct FastqReader {
    reader: Box<dyn BufRead>,
    done: bool,
}

impl FastqReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self {
            reader: open_reader(path.as_ref())?,
            done: false,
        })
    }

    fn read_trimmed(&mut self, line: &mut String) -> io::Result<Option<usize>> {
        line.clear();
        match self.reader.read_line(line) {
            Ok(0) => Ok(None),
            Ok(n) => {
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Ok(Some(n))
            }
            Err(e) => Err(e),
        }
    }
}

impl Iterator for FastqReader {
    type Item = io::Result<ReadRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut line = String::new();

        // 1) header, skipping anything that does not start a record
        let header = loop {
            match self.read_trimmed(&mut line) {
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Ok(Some(_)) => {
                    if let Some(h) = line.strip_prefix('@') {
                        break h.to_string();
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        };

        // 2) sequence, 3) separator, 4) quality
        let mut fields = Vec::with_capacity(3);
        for _ in 0..3 {
            match self.read_trimmed(&mut line) {
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Ok(Some(_)) => fields.push(line.clone()),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        let (id, _comment) = split_header(&header);
        let quals = fields.pop().unwrap_or_default();
        let seq = fields.swap_remove(0);
        Some(Ok(ReadRecord { id, seq, quals }))
    }
}
