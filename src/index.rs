//! Multi-table Bloom-style k-mer presence index.
//!
//! N independent bit arrays, packed as bytes behind owned `Box<[AtomicU8]>`
//! storage. A k-mer is present once every table's bit is set; a single
//! table's collisions can false-positive, but the AND across independent
//! tables keeps that one-sided. Concurrent inserts use atomic byte-wise OR
//! (`AtomicU8::fetch_or`) since more than one parser thread may insert at
//! once.

use crate::codec::HashCodec;
use crate::error::{KmerGraphError, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read as IoRead, Write as IoWrite};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};

fn bytes_for_bits(bits: u64) -> usize {
    ((bits + 7) / 8) as usize
}

pub struct PresenceIndex {
    codec: HashCodec,
    table_sizes: Vec<u64>,
    tables: Vec<Box<[AtomicU8]>>,
}

impl PresenceIndex {
    pub fn new(k: usize, table_sizes: Vec<u64>) -> Result<Self> {
        if table_sizes.is_empty() {
            return Err(KmerGraphError::InvalidParameter(
                "table_sizes must not be empty".into(),
            ));
        }
        if let Some(&bad) = table_sizes.iter().find(|&&bits| bits < 1) {
            return Err(KmerGraphError::InvalidParameter(format!(
                "table size must be >= 1 bit, got {bad}"
            )));
        }
        let codec = HashCodec::new(k)?;
        let tables = table_sizes
            .iter()
            .map(|&bits| {
                (0..bytes_for_bits(bits))
                    .map(|_| AtomicU8::new(0))
                    .collect::<Vec<_>>()
                    .into_boxed_slice()
            })
            .collect();
        Ok(Self {
            codec,
            table_sizes,
            tables,
        })
    }

    pub fn k(&self) -> usize {
        self.codec.k()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    fn set_bit(table: &[AtomicU8], bit: u64) -> bool {
        let byte = (bit / 8) as usize;
        let mask = 1u8 << (bit % 8);
        let prev = table[byte].fetch_or(mask, Ordering::SeqCst);
        prev & mask == 0
    }

    fn test_bit(table: &[AtomicU8], bit: u64) -> bool {
        let byte = (bit / 8) as usize;
        let mask = 1u8 << (bit % 8);
        table[byte].load(Ordering::SeqCst) & mask != 0
    }

    /// Tests a single already-canonical hash against every table. `1` means
    /// present under all tables (a possible false positive); `0` means
    /// definitely absent.
    pub fn count_hash(&self, hash: u64) -> u8 {
        for (table, &size) in self.tables.iter().zip(&self.table_sizes) {
            if !Self::test_bit(table, hash % size) {
                return 0;
            }
        }
        1
    }

    fn insert_hash(&self, hash: u64) -> bool {
        let mut any_new = false;
        for (table, &size) in self.tables.iter().zip(&self.table_sizes) {
            if Self::set_bit(table, hash % size) {
                any_new = true;
            }
        }
        any_new
    }

    /// Tests whether a single k-mer-length sequence is present.
    pub fn test(&self, seq: &str) -> Result<bool> {
        let (fwd, rc) = self.codec.hash(seq.as_bytes())?;
        Ok(self.count_hash(HashCodec::canonical(fwd, rc)) == 1)
    }

    /// Inserts every k-mer window of `seq`. Returns the number of k-mer
    /// positions that flipped at least one bit from 0 to 1 — an
    /// approximate "newly seen" count under concurrent insertion, since two
    /// threads can race on the same bit between the check and the set.
    pub fn add(&self, seq: &str) -> Result<u64> {
        let k = self.codec.k();
        let bytes = seq.as_bytes();
        if bytes.len() < k {
            return Ok(0);
        }
        let (mut fwd, mut rc) = self.codec.hash(bytes)?;
        let mut newly_set = 0u64;
        if self.insert_hash(HashCodec::canonical(fwd, rc)) {
            newly_set += 1;
        }
        for &base in &bytes[k..] {
            let (f2, r2) = self.codec.shift_next(fwd, rc, base)?;
            fwd = f2;
            rc = r2;
            if self.insert_hash(HashCodec::canonical(fwd, rc)) {
                newly_set += 1;
            }
        }
        Ok(newly_set)
    }

    /// Per-table histogram of live neighbor-agnostic occupancy: the number
    /// of bits set in each table, a rough proxy for the index's current
    /// false-positive risk (the denser a table, the more likely `AND`ing
    /// across tables still returns a spurious hit).
    pub fn abundance_distribution(&self) -> Vec<u64> {
        self.tables
            .iter()
            .map(|table| {
                table
                    .iter()
                    .map(|byte| byte.load(Ordering::SeqCst).count_ones() as u64)
                    .sum()
            })
            .collect()
    }

    /// Convenience wrapper; the real sweep lives in [`crate::graph`] since
    /// it needs to walk all 8 neighbors of every k-mer position, not just
    /// inspect this index's own bits.
    pub fn connectivity_distribution(&self, reads: &[String]) -> Result<[u64; 9]> {
        crate::graph::connectivity_distribution(self, reads)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        w.write_all(&(self.codec.k() as u32).to_le_bytes())?;
        for (table, &bits) in self.tables.iter().zip(&self.table_sizes) {
            w.write_all(&bits.to_le_bytes())?;
            let raw: Vec<u8> = table.iter().map(|b| b.load(Ordering::SeqCst)).collect();
            w.write_all(&raw)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn load(path: &Path, expected_k: usize) -> Result<Self> {
        let mut r = BufReader::new(File::open(path)?);
        let mut u32buf = [0u8; 4];
        let mut u64buf = [0u8; 8];

        r.read_exact(&mut u32buf)?;
        let on_disk_k = u32::from_le_bytes(u32buf);
        if on_disk_k as usize != expected_k {
            return Err(KmerGraphError::VersionMismatch {
                on_disk: on_disk_k,
                requested: expected_k as u32,
            });
        }

        let mut table_sizes = Vec::new();
        let mut tables = Vec::new();
        loop {
            match r.read(&mut u64buf)? {
                0 => break,
                n if n == u64buf.len() => {
                    let bits = u64::from_le_bytes(u64buf);
                    let mut raw = vec![0u8; bytes_for_bits(bits)];
                    r.read_exact(&mut raw)?;
                    table_sizes.push(bits);
                    tables.push(
                        raw.into_iter()
                            .map(AtomicU8::new)
                            .collect::<Vec<_>>()
                            .into_boxed_slice(),
                    );
                }
                _ => {
                    return Err(KmerGraphError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "truncated index snapshot",
                    )))
                }
            }
        }

        Ok(Self {
            codec: HashCodec::new(expected_k)?,
            table_sizes,
            tables,
        })
    }
}
