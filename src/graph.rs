//! De Bruijn graph traversal over a [`PresenceIndex`].
//!
//! Traversal uses an explicit work queue rather than recursion: a long,
//! low-branching genomic contig can recurse deep enough to overflow a
//! thread's stack otherwise. `graphsize_distribution` deliberately does not
//! deduplicate seeds against k-mers an earlier seed already counted; see
//! its doc comment for why that can't be "fixed" without changing its
//! meaning.

use crate::codec::HashCodec;
use crate::error::Result;
use crate::index::PresenceIndex;
use fxhash::FxHashSet;
use rayon::prelude::*;
use std::collections::VecDeque;

pub struct GraphWalker<'a> {
    index: &'a PresenceIndex,
    codec: HashCodec,
}

impl<'a> GraphWalker<'a> {
    pub fn new(index: &'a PresenceIndex) -> Result<Self> {
        Ok(Self {
            index,
            codec: HashCodec::new(index.k())?,
        })
    }

    /// Size of the connected component reachable from `seed`, with no cap.
    pub fn component_size(&self, seed: &str) -> Result<u64> {
        Ok(self.component_size_bounded(seed, 0)?.0)
    }

    /// Size of the connected component reachable from `seed`, stopping
    /// early once `threshold` distinct k-mers have been counted (`0` means
    /// unbounded). Returns both the count and the set of canonical hashes
    /// visited, so callers like `trim_reads` can reuse the traversal.
    pub fn component_size_bounded(
        &self,
        seed: &str,
        threshold: u64,
    ) -> Result<(u64, FxHashSet<u64>)> {
        let (f0, r0) = self.codec.hash(seed.as_bytes())?;
        let mut keeper: FxHashSet<u64> = FxHashSet::default();
        let mut queue: VecDeque<(u64, u64)> = VecDeque::new();
        queue.push_back((f0, r0));
        let mut count = 0u64;

        while let Some((fwd, rc)) = queue.pop_front() {
            let kmer = HashCodec::canonical(fwd, rc);
            if self.index.count_hash(kmer) == 0 {
                continue;
            }
            if !keeper.insert(kmer) {
                continue;
            }
            count += 1;
            if threshold != 0 && count >= threshold {
                break;
            }
            for &base in &[b'A', b'C', b'G', b'T'] {
                queue.push_back(self.codec.shift_next(fwd, rc, base)?);
            }
            for &base in &[b'A', b'C', b'G', b'T'] {
                queue.push_back(self.codec.shift_prev(fwd, rc, base)?);
            }
        }

        Ok((count, keeper))
    }

    /// Keeps only the reads whose first k-mer's component reaches at least
    /// `min_size`, stopping each traversal as soon as that's established.
    pub fn trim_reads<'r>(&self, reads: &'r [String], min_size: u64) -> Vec<&'r str> {
        reads
            .iter()
            .filter(|seq| {
                if seq.len() < self.codec.k() {
                    return false;
                }
                let first_kmer = &seq[..self.codec.k()];
                matches!(self.component_size_bounded(first_kmer, min_size), Ok((size, _)) if size >= min_size)
            })
            .map(|s| s.as_str())
            .collect()
    }

    /// Histogram of component sizes reachable from each of `seeds`, each
    /// bucketed and capped at `max_size`. Like the source this is grounded
    /// on, a k-mer reachable from more than one seed is counted once per
    /// seed whose traversal reaches it — seeds are not deduplicated against
    /// each other's visited sets, so overlapping components are
    /// double-counted by design, not by oversight.
    pub fn graphsize_distribution(&self, seeds: &[String], max_size: usize) -> Result<Vec<u64>> {
        let mut histogram = vec![0u64; max_size + 1];
        for seed in seeds {
            if seed.len() < self.codec.k() {
                continue;
            }
            let (size, _) = self.component_size_bounded(seed, max_size as u64)?;
            let bucket = (size as usize).min(max_size);
            histogram[bucket] += 1;
        }
        Ok(histogram)
    }
}

/// 9-bucket histogram (0..=8 live neighbors) over every k-mer position of
/// every valid read. Parallelized per-read with `rayon`, following the
/// teacher's `par_iter().map(...)`-then-reduce orchestration style.
pub fn connectivity_distribution(index: &PresenceIndex, reads: &[String]) -> Result<[u64; 9]> {
    let codec = HashCodec::new(index.k())?;
    let k = codec.k();

    let per_read: Vec<[u64; 9]> = reads
        .par_iter()
        .map(|seq| -> Result<[u64; 9]> {
            let mut hist = [0u64; 9];
            if !crate::read::is_valid_sequence(seq) || seq.len() < k {
                return Ok(hist);
            }
            let bytes = seq.as_bytes();
            let (mut fwd, mut rc) = codec.hash(bytes)?;
            let windows = bytes.len() - k + 1;
            for i in 0..windows {
                if i > 0 {
                    let base = bytes[i + k - 1];
                    let (f2, r2) = codec.shift_next(fwd, rc, base)?;
                    fwd = f2;
                    rc = r2;
                }
                let mut neighbors = 0usize;
                for &base in &[b'A', b'C', b'G', b'T'] {
                    let (nf, nr) = codec.shift_next(fwd, rc, base)?;
                    if index.count_hash(HashCodec::canonical(nf, nr)) == 1 {
                        neighbors += 1;
                    }
                }
                for &base in &[b'A', b'C', b'G', b'T'] {
                    let (pf, pr) = codec.shift_prev(fwd, rc, base)?;
                    if index.count_hash(HashCodec::canonical(pf, pr)) == 1 {
                        neighbors += 1;
                    }
                }
                hist[neighbors] += 1;
            }
            Ok(hist)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut total = [0u64; 9];
    for hist in per_read {
        for i in 0..9 {
            total[i] += hist[i];
        }
    }
    Ok(total)
}
