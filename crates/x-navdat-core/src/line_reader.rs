// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Line-oriented reader over an apt.dat stream with a single slot of
/// lookahead.
///
/// Record groups in apt.dat only reveal their end when the next group's
/// header line has already been consumed; handlers return that line to the
/// reader with [`push_back`](Self::push_back) so the dispatcher can re-read
/// it. Exactly one line of pushback is supported.
///
/// The reader also keeps progress counters: `line_number` counts lines read
/// from the underlying stream (a pushed-back line is not counted twice) and
/// `bytes_processed` tracks consumed bytes against `file_size`.
pub struct LookaheadLineReader<R> {
    inner: R,
    path: PathBuf,
    current: String,
    buffered: Option<String>,
    // Token spans into `current`, recomputed on every advance.
    spans: Vec<(usize, usize)>,
    row_code: i32,
    line_number: u64,
    bytes_processed: u64,
    file_size: u64,
}

impl LookaheadLineReader<BufReader<File>> {
    /// Opens `path` in binary mode and captures its size for progress
    /// accounting.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self::new(BufReader::new(file), path.to_path_buf(), file_size))
    }
}

impl<R: BufRead> LookaheadLineReader<R> {
    /// Wraps an arbitrary buffered stream. `path` is only used to annotate
    /// parse errors; `file_size` may be 0 when unknown.
    pub fn new(inner: R, path: PathBuf, file_size: u64) -> Self {
        Self {
            inner,
            path,
            current: String::new(),
            buffered: None,
            spans: Vec::new(),
            row_code: -1,
            line_number: 0,
            bytes_processed: 0,
            file_size,
        }
    }

    /// Makes the next line current. Pops the pushback slot if one is
    /// buffered, otherwise reads from the stream. Returns `false` at EOF.
    pub fn advance(&mut self) -> io::Result<bool> {
        if let Some(line) = self.buffered.take() {
            self.current = line;
        } else {
            self.current.clear();
            let read = self.inner.read_line(&mut self.current)?;
            if read == 0 {
                self.spans.clear();
                self.row_code = -1;
                return Ok(false);
            }
            // Tolerate both LF and CRLF endings.
            if self.current.ends_with('\n') {
                self.current.pop();
                if self.current.ends_with('\r') {
                    self.current.pop();
                }
            }
            self.line_number += 1;
        }

        self.bytes_processed += self.current.len() as u64 + 1;
        self.tokenize();
        Ok(true)
    }

    /// Returns the current line to the reader; the next [`advance`] will
    /// yield it again. A second pushback without an intervening advance is a
    /// programming error.
    ///
    /// # Panics
    ///
    /// Panics if a line is already buffered.
    pub fn push_back(&mut self) {
        assert!(
            self.buffered.is_none(),
            "cannot push back more than one line at a time"
        );
        self.bytes_processed = self
            .bytes_processed
            .saturating_sub(self.current.len() as u64 + 1);
        self.buffered = Some(std::mem::take(&mut self.current));
        self.spans.clear();
        self.row_code = -1;
    }

    fn tokenize(&mut self) {
        self.spans.clear();
        let bytes = self.current.as_bytes();
        let mut start = None;
        for (i, &b) in bytes.iter().enumerate() {
            if b == b' ' || b == b'\t' {
                if let Some(s) = start.take() {
                    self.spans.push((s, i));
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            self.spans.push((s, bytes.len()));
        }

        self.row_code = match self.spans.first() {
            Some(&(s, e)) => {
                let token = &self.current[s..e];
                if token.as_bytes()[0].is_ascii_digit() {
                    token.parse().unwrap_or(-1)
                } else {
                    -1
                }
            }
            None => -1,
        };
    }

    /// Whitespace-split tokens of the current line, empty runs skipped.
    pub fn tokens(&self) -> Vec<&str> {
        self.spans
            .iter()
            .map(|&(s, e)| &self.current[s..e])
            .collect()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.spans.get(index).map(|&(s, e)| &self.current[s..e])
    }

    pub fn token_count(&self) -> usize {
        self.spans.len()
    }

    /// Integer value of the first token when it begins with a digit,
    /// otherwise -1.
    pub fn row_code(&self) -> i32 {
        self.row_code
    }

    pub fn line(&self) -> &str {
        &self.current
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
