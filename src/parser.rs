//! FASTA and FASTQ record parsers driven by a [`CacheManager`].
//!
//! Both parsers track a look-ahead line across calls so a multi-line
//! sequence body doesn't require re-reading the next record's header, and
//! both hand off the unconsumed tail of a record that starts mid-segment
//! via `CacheManager::split_at` so the neighboring thread doesn't see a
//! torn record.

use crate::cache::CacheManager;
use crate::counters::ParserCounters;
use crate::error::{KmerGraphError, Result};
use crate::read::Read;

const LINE_BUFFER_SIZE: usize = 4096;

struct LineCursor {
    buffer: Vec<u8>,
    pos: usize,
    rem: usize,
    at_start: bool,
    need_new_line: bool,
    fill_id: u64,
    line: String,
}

impl LineCursor {
    fn new() -> Self {
        Self {
            buffer: vec![0u8; LINE_BUFFER_SIZE],
            pos: 0,
            rem: 0,
            at_start: true,
            need_new_line: true,
            fill_id: 0,
            line: String::new(),
        }
    }

    /// Refills `self.line` from the cache, one text line at a time,
    /// tracking whether the bytes just consumed crossed into a freshly
    /// filled segment (`at_start`).
    fn copy_line(&mut self, cache: &CacheManager, thread_id: u32, unithreaded: bool) -> Result<()> {
        self.line.clear();
        loop {
            if !self.at_start {
                self.at_start = !unithreaded
                    && self.fill_id != cache.get_fill_id(thread_id)?
                    && self.rem <= cache.whereis_cursor(thread_id)? as usize;
            }

            let mut i = 0;
            let mut hit = false;
            while i < self.rem {
                if self.buffer[self.pos + i] == b'\n' {
                    hit = true;
                    break;
                }
                i += 1;
            }
            self.line
                .push_str(&String::from_utf8_lossy(&self.buffer[self.pos..self.pos + i]));

            if hit {
                self.rem -= i + 1;
                self.pos += i + 1;
                return Ok(());
            }
            self.rem = 0;
            self.pos += i;

            if cache.has_more_data(thread_id)? {
                let n = cache.get_bytes(thread_id, &mut self.buffer)? as usize;
                self.rem = n;
                self.pos = 0;
            } else {
                return Ok(());
            }
        }
    }
}

fn starts_with(line: &str, b: u8) -> bool {
    line.as_bytes().first() == Some(&b)
}

/// Parses FASTA records from a cache-backed stream on thread `thread_id`.
pub struct FastaParser<'a> {
    cache: &'a CacheManager,
    thread_id: u32,
    unithreaded: bool,
    cursor: LineCursor,
    counters: ParserCounters,
}

impl<'a> FastaParser<'a> {
    pub fn new(cache: &'a CacheManager, thread_id: u32) -> Self {
        Self {
            cache,
            thread_id,
            unithreaded: cache.number_of_threads() == 1,
            cursor: LineCursor::new(),
            counters: ParserCounters::default(),
        }
    }

    pub fn counters(&self) -> ParserCounters {
        self.counters
    }

    pub fn is_complete(&self) -> Result<bool> {
        Ok(self.cursor.rem == 0 && !self.cache.has_more_data(self.thread_id)?)
    }

    /// Returns the next valid (N-free) read, or `None` at end of stream.
    /// Reads containing `N`/`n` are silently discarded.
    pub fn next_read(&mut self) -> Result<Option<Read>> {
        loop {
            if self.is_complete()? {
                return Ok(None);
            }

            if self.cursor.need_new_line {
                self.cursor.copy_line(self.cache, self.thread_id, self.unithreaded)?;
            }
            self.cursor.need_new_line = true;

            if self.cursor.at_start {
                self.cursor.fill_id = self.cache.get_fill_id(self.thread_id)?;
            }

            // Bytes skipped before the next real header, accumulated so the
            // eventual split_at call hands the lower neighbor exactly the
            // span it doesn't own, not just the length of the last line
            // skipped.
            let mut split_pos: u64 = 0;

            while !starts_with(&self.cursor.line, b'>') {
                if self.cursor.at_start && self.cursor.fill_id == 0 {
                    return Err(KmerGraphError::InvalidFasta(
                        "expected '>' at start of file".into(),
                    ));
                }
                split_pos += self.cursor.line.len() as u64 + 1;
                if self.is_complete()? {
                    return Ok(None);
                }
                self.cursor.copy_line(self.cache, self.thread_id, self.unithreaded)?;
            }

            // Pair-skip quirk: a header landing exactly on a segment
            // boundary whose *previous* record ends in "/2" belongs to a
            // mate pair started in the prior segment; keep consuming until
            // the next real header. The suffix match is exact ("/2" must
            // be the final two characters, with nothing trailing it) —
            // "/2 annotations" or similar decorated names are treated as
            // ordinary headers, not mate markers.
            if self.cursor.at_start && self.cursor.fill_id != 0 && self.cursor.line.ends_with("/2") {
                loop {
                    if self.is_complete()? {
                        break;
                    }
                    split_pos += self.cursor.line.len() as u64 + 1;
                    self.cursor.copy_line(self.cache, self.thread_id, self.unithreaded)?;
                    if starts_with(&self.cursor.line, b'>') {
                        break;
                    }
                }
            }

            if self.cursor.at_start && self.cursor.fill_id != 0 {
                self.cache.split_at(self.thread_id, split_pos)?;
            }
            self.cursor.at_start = false;

            let mut the_read = Read {
                name: self.cursor.line[1..].to_string(),
                ..Default::default()
            };

            self.cursor.need_new_line = false;
            loop {
                if self.is_complete()? {
                    break;
                }
                self.cursor.copy_line(self.cache, self.thread_id, self.unithreaded)?;
                if self.cursor.at_start || starts_with(&self.cursor.line, b'>') {
                    break;
                }
                the_read.sequence.push_str(&self.cursor.line);
            }

            self.counters.parsed_total += 1;
            if the_read.sequence.bytes().any(|b| b == b'N' || b == b'n') {
                continue;
            }
            self.counters.parsed_valid += 1;
            return Ok(Some(the_read));
        }
    }
}

/// Parses FASTQ records (`@name` / sequence / `+` / quality) from a
/// cache-backed stream on thread `thread_id`.
pub struct FastqParser<'a> {
    cache: &'a CacheManager,
    thread_id: u32,
    unithreaded: bool,
    cursor: LineCursor,
    counters: ParserCounters,
}

impl<'a> FastqParser<'a> {
    pub fn new(cache: &'a CacheManager, thread_id: u32) -> Self {
        Self {
            cache,
            thread_id,
            unithreaded: cache.number_of_threads() == 1,
            cursor: LineCursor::new(),
            counters: ParserCounters::default(),
        }
    }

    pub fn counters(&self) -> ParserCounters {
        self.counters
    }

    pub fn is_complete(&self) -> Result<bool> {
        Ok(self.cursor.rem == 0 && !self.cache.has_more_data(self.thread_id)?)
    }

    pub fn next_read(&mut self) -> Result<Option<Read>> {
        loop {
            if self.is_complete()? {
                return Ok(None);
            }

            if self.cursor.need_new_line {
                self.cursor.copy_line(self.cache, self.thread_id, self.unithreaded)?;
            }
            self.cursor.need_new_line = true;

            if self.cursor.at_start {
                self.cursor.fill_id = self.cache.get_fill_id(self.thread_id)?;
            }

            if !starts_with(&self.cursor.line, b'@') {
                if self.cursor.at_start && self.cursor.fill_id == 0 {
                    return Err(KmerGraphError::InvalidFastq(
                        "expected '@' at start of record".into(),
                    ));
                }
                continue;
            }

            if self.cursor.at_start && self.cursor.fill_id != 0 {
                // The header line itself is the start of this record; there
                // is nothing upstream of it in this segment to hand off.
                self.cache.split_at(self.thread_id, 0)?;
            }
            self.cursor.at_start = false;

            let name = self.cursor.line[1..].to_string();

            self.cursor.copy_line(self.cache, self.thread_id, self.unithreaded)?;
            let sequence = self.cursor.line.clone();

            self.cursor.copy_line(self.cache, self.thread_id, self.unithreaded)?;
            if !starts_with(&self.cursor.line, b'+') {
                return Err(KmerGraphError::InvalidFastq(
                    "expected '+' separator line".into(),
                ));
            }

            self.cursor.copy_line(self.cache, self.thread_id, self.unithreaded)?;
            let accuracy = self.cursor.line.clone();

            self.cursor.need_new_line = true;

            self.counters.parsed_total += 1;
            if sequence.bytes().any(|b| b == b'N' || b == b'n') {
                continue;
            }
            self.counters.parsed_valid += 1;
            return Ok(Some(Read {
                name,
                annotations: String::new(),
                sequence,
                accuracy,
            }));
        }
    }
}
