//! Anchor k-mer tagging and union-find partitioning.
//!
//! `TagStore` places an anchor roughly every `density` k-mers along a read
//! (resetting its since-last-tag counter on a hit or once it reaches
//! `density`) behind an `fxhash` set guarded by a `Mutex` so multiple
//! parser threads can tag concurrently. `Partitioner` assigns partition ids
//! to sets of anchors crossed by a read, merging existing partitions to
//! their lowest id via path-compressed union-find.

use crate::codec::HashCodec;
use crate::error::{KmerGraphError, Result};
use fxhash::{FxHashMap, FxHashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read as IoRead, Write as IoWrite};
use std::path::Path;
use std::sync::Mutex;

/// Anchor k-mers placed roughly every `density` k-mers along a read.
pub struct TagStore {
    density: u32,
    tags: Mutex<FxHashSet<u64>>,
}

impl TagStore {
    pub fn new(density: u32) -> Result<Self> {
        if density == 0 {
            return Err(KmerGraphError::InvalidParameter(
                "tag density must be nonzero".into(),
            ));
        }
        Ok(Self {
            density,
            tags: Mutex::new(FxHashSet::default()),
        })
    }

    pub fn density(&self) -> u32 {
        self.density
    }

    pub fn len(&self) -> usize {
        self.tags.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.tags.lock().unwrap().contains(&hash)
    }

    pub fn assert_tag(&self, hash: u64) {
        self.tags.lock().unwrap().insert(hash);
    }

    /// Walks every k-mer of `seq`, inserting a new anchor whenever `density`
    /// k-mers have passed since the last tag (or since a k-mer that was
    /// already tagged, which resets the counter the same way a fresh tag
    /// would).
    pub fn observe_read(&self, seq: &str, codec: &HashCodec) -> Result<()> {
        let k = codec.k();
        let bytes = seq.as_bytes();
        if bytes.len() < k {
            return Ok(());
        }
        let (mut fwd, mut rc) = codec.hash(bytes)?;
        let mut since = self.density;
        let mut tags = self.tags.lock().unwrap();
        let mut observe = |hash: u64, since: &mut u32| {
            if tags.contains(&hash) {
                *since = 0;
            } else {
                *since += 1;
            }
            if *since >= self.density {
                tags.insert(hash);
                *since = 0;
            }
        };
        observe(HashCodec::canonical(fwd, rc), &mut since);
        for &base in &bytes[k..] {
            let (f2, r2) = codec.shift_next(fwd, rc, base)?;
            fwd = f2;
            rc = r2;
            observe(HashCodec::canonical(fwd, rc), &mut since);
        }
        Ok(())
    }

    /// Pre-partitioned ingestion: asserts every `density`-th k-mer position
    /// of `seq` as a tag (unconditionally, unlike `observe_read`'s
    /// since-last-tag schedule) and, when `pid` is given, assigns that
    /// partition id to each one directly via `partitioner.set_partition_id`
    /// rather than discovering it through union-find.
    pub fn ingest_partitioned_read(
        &self,
        seq: &str,
        codec: &HashCodec,
        partitioner: &Partitioner,
        pid: Option<u64>,
    ) -> Result<()> {
        let k = codec.k();
        let bytes = seq.as_bytes();
        if bytes.len() < k {
            return Ok(());
        }
        let windows = bytes.len() - k + 1;
        let density = self.density as usize;
        let (mut fwd, mut rc) = codec.hash(bytes)?;

        let mut assert_at = |hash: u64| {
            self.assert_tag(hash);
            if let Some(pid) = pid {
                partitioner.set_partition_id(hash, pid);
            }
        };
        assert_at(HashCodec::canonical(fwd, rc));

        for i in 1..windows {
            let (f2, r2) = codec.shift_next(fwd, rc, bytes[k - 1 + i])?;
            fwd = f2;
            rc = r2;
            if i % density == 0 {
                assert_at(HashCodec::canonical(fwd, rc));
            }
        }
        Ok(())
    }

    /// Read-only scan returning the set of anchors `seq` crosses, without
    /// inserting new ones. Used to collect the tags a read should join
    /// together under a single partition.
    pub fn tags_crossed(&self, seq: &str, codec: &HashCodec) -> Result<FxHashSet<u64>> {
        let k = codec.k();
        let bytes = seq.as_bytes();
        let mut crossed = FxHashSet::default();
        if bytes.len() < k {
            return Ok(crossed);
        }
        let (mut fwd, mut rc) = codec.hash(bytes)?;
        let tags = self.tags.lock().unwrap();
        let mut check = |hash: u64| {
            if tags.contains(&hash) {
                crossed.insert(hash);
            }
        };
        check(HashCodec::canonical(fwd, rc));
        for &base in &bytes[k..] {
            let (f2, r2) = codec.shift_next(fwd, rc, base)?;
            fwd = f2;
            rc = r2;
            check(HashCodec::canonical(fwd, rc));
        }
        Ok(crossed)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let tags = self.tags.lock().unwrap();
        let mut w = BufWriter::new(File::create(path)?);
        w.write_all(&(tags.len() as u32).to_le_bytes())?;
        w.write_all(&self.density.to_le_bytes())?;
        for &hash in tags.iter() {
            w.write_all(&hash.to_le_bytes())?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut r = BufReader::new(File::open(path)?);
        let mut u32buf = [0u8; 4];
        let mut u64buf = [0u8; 8];

        r.read_exact(&mut u32buf)?;
        let tagset_size = u32::from_le_bytes(u32buf);
        r.read_exact(&mut u32buf)?;
        let density = u32::from_le_bytes(u32buf);

        let mut tags = FxHashSet::default();
        for _ in 0..tagset_size {
            r.read_exact(&mut u64buf)?;
            tags.insert(u64::from_le_bytes(u64buf));
        }

        Ok(Self {
            density,
            tags: Mutex::new(tags),
        })
    }
}

/// Union-find partition assignment over anchor k-mers.
pub struct Partitioner {
    next_id: Mutex<u64>,
    anchor_id: Mutex<FxHashMap<u64, u64>>,
    parent: Mutex<FxHashMap<u64, u64>>,
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl Partitioner {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(1),
            anchor_id: Mutex::new(FxHashMap::default()),
            parent: Mutex::new(FxHashMap::default()),
        }
    }

    fn find(parent: &mut FxHashMap<u64, u64>, id: u64) -> u64 {
        let mut root = id;
        while let Some(&p) = parent.get(&root) {
            if p == root {
                break;
            }
            root = p;
        }
        let mut cur = id;
        while let Some(&p) = parent.get(&cur) {
            if p == root {
                break;
            }
            parent.insert(cur, root);
            cur = p;
        }
        root
    }

    fn union(parent: &mut FxHashMap<u64, u64>, a: u64, b: u64) -> u64 {
        let ra = Self::find(parent, a);
        let rb = Self::find(parent, b);
        if ra == rb {
            return ra;
        }
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent.insert(hi, lo);
        lo
    }

    /// Assigns every anchor in `anchors` to a single partition. If any of
    /// them already carry a partition, all members adopt the smallest such
    /// id (ties resolved by union-find, lowest id wins). Otherwise, mints a
    /// fresh id when `join_new` is true; returns `None` without allocating
    /// one otherwise.
    pub fn assign_partition(&self, anchors: &FxHashSet<u64>, join_new: bool) -> Option<u64> {
        if anchors.is_empty() {
            return None;
        }
        let mut anchor_id = self.anchor_id.lock().unwrap();
        let mut parent = self.parent.lock().unwrap();

        let mut existing: Vec<u64> = anchors
            .iter()
            .filter_map(|a| anchor_id.get(a).map(|&id| Self::find(&mut parent, id)))
            .collect();

        let target = if !existing.is_empty() {
            existing.sort_unstable();
            existing.dedup();
            let mut root = existing[0];
            for &id in &existing[1..] {
                root = Self::union(&mut parent, root, id);
            }
            root
        } else if join_new {
            let mut next = self.next_id.lock().unwrap();
            let id = *next;
            *next += 1;
            id
        } else {
            return None;
        };

        for &a in anchors {
            anchor_id.insert(a, target);
        }
        Some(target)
    }

    /// Directly assigns an anchor's partition id, used by pre-partitioned
    /// FASTA ingestion where the id comes from the input file rather than
    /// being minted here.
    pub fn set_partition_id(&self, anchor: u64, id: u64) {
        self.anchor_id.lock().unwrap().insert(anchor, id);
    }

    /// The resolved (union-find root) partition id for an anchor, or `0` if
    /// it has never been assigned one.
    pub fn partition_of(&self, anchor: u64) -> u64 {
        let mut anchor_id = self.anchor_id.lock().unwrap();
        let mut parent = self.parent.lock().unwrap();
        match anchor_id.get(&anchor).copied() {
            Some(id) => {
                let root = Self::find(&mut parent, id);
                anchor_id.insert(anchor, root);
                root
            }
            None => 0,
        }
    }

    /// Number of anchors currently assigned to each resolved partition.
    pub fn partition_sizes(&self) -> FxHashMap<u64, usize> {
        let anchor_id = self.anchor_id.lock().unwrap();
        let mut parent = self.parent.lock().unwrap();
        let mut sizes = FxHashMap::default();
        for &id in anchor_id.values() {
            let root = Self::find(&mut parent, id);
            *sizes.entry(root).or_insert(0) += 1;
        }
        sizes
    }

    /// Anchors belonging to partitions smaller than `threshold`.
    pub fn discard_small_partitions(&self, threshold: usize) -> FxHashSet<u64> {
        let sizes = self.partition_sizes();
        let anchor_id = self.anchor_id.lock().unwrap();
        let mut parent = self.parent.lock().unwrap();
        anchor_id
            .iter()
            .filter_map(|(&anchor, &id)| {
                let root = Self::find(&mut parent, id);
                if sizes.get(&root).copied().unwrap_or(0) < threshold {
                    Some(anchor)
                } else {
                    None
                }
            })
            .collect()
    }
}
