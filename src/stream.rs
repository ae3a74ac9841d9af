//! Decompressing byte source for the cache manager.
//!
//! Dispatches on a file's extension and wraps the underlying file in the
//! matching decompressor. Concatenated bzip2 streams (multiple compressed
//! blocks back to back in one file) are handled transparently by
//! `bzip2::read::MultiBzDecoder`.

use crate::error::{KmerGraphError, Result};
use bzip2::read::MultiBzDecoder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read as IoRead;
use std::path::Path;

/// The compression variant detected (or forced) for a given input path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Raw,
    Gzip,
    Bzip2,
}

// TODO: sniff magic bytes instead of trusting the extension, the way a
// hardened version of this would have to for piped input.
pub fn detect_compression(path: &Path) -> Compression {
    match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => Compression::Gzip,
        Some("bz2") => Compression::Bzip2,
        _ => Compression::Raw,
    }
}

/// Strips a compression extension (if any) so format detection (FASTA vs.
/// FASTQ) can inspect the extension underneath it, mirroring
/// `IParser::get_parser`'s two-stage extension stripping.
pub fn strip_compression_extension(path: &Path) -> std::path::PathBuf {
    match detect_compression(path) {
        Compression::Raw => path.to_path_buf(),
        Compression::Gzip | Compression::Bzip2 => path.with_extension(""),
    }
}

enum Source {
    Raw(File),
    Gzip(GzDecoder<File>),
    Bzip2(MultiBzDecoder<File>),
}

impl IoRead for Source {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Source::Raw(f) => f.read(buf),
            Source::Gzip(d) => d.read(buf),
            Source::Bzip2(d) => d.read(buf),
        }
    }
}

/// A single decompressing byte source, shared by all cache segments.
/// `at_eos` latches once a `read` call returns zero bytes.
pub struct StreamReader {
    source: Source,
    at_eos: bool,
}

impl StreamReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| KmerGraphError::InvalidStreamBuffer(format!("{}: {e}", path.display())))?;
        let source = match detect_compression(path) {
            Compression::Raw => Source::Raw(file),
            Compression::Gzip => Source::Gzip(GzDecoder::new(file)),
            Compression::Bzip2 => Source::Bzip2(MultiBzDecoder::new(file)),
        };
        Ok(Self {
            source,
            at_eos: false,
        })
    }

    pub fn is_at_eos(&self) -> bool {
        self.at_eos
    }

    /// Fills `buf` as completely as possible, looping over short reads from
    /// the underlying decompressor, and returns the number of bytes
    /// actually placed. Returns `0` exactly when the stream has no more
    /// data to give (`is_at_eos()` becomes true as a result).
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<u64> {
        let mut total = 0usize;
        while total < buf.len() && !self.at_eos {
            let n = self
                .source
                .read(&mut buf[total..])
                .map_err(KmerGraphError::StreamReadError)?;
            if n == 0 {
                self.at_eos = true;
                break;
            }
            total += n;
        }
        Ok(total as u64)
    }
}
