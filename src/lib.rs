pub mod cache;
pub mod codec;
pub mod counters;
pub mod error;
pub mod graph;
pub mod index;
pub mod parser;
pub mod read;
pub mod stream;
pub mod tags;

pub use codec::HashCodec;
pub use counters::ParserCounters;
pub use error::{KmerGraphError, Result};
pub use graph::GraphWalker;
pub use index::PresenceIndex;
pub use read::Read;
pub use tags::{Partitioner, TagStore};

use cache::CacheManager;
use parser::{FastaParser, FastqParser};
use read::parse_trailing_partition_id;
use std::path::Path;
use std::sync::Mutex;

/// Record format selected by file extension, after stripping any
/// compression suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Fasta,
    Fastq,
}

pub fn detect_format(path: &Path) -> RecordFormat {
    let stripped = stream::strip_compression_extension(path);
    match stripped.extension().and_then(|e| e.to_str()) {
        Some("fq") | Some("fastq") => RecordFormat::Fastq,
        _ => RecordFormat::Fasta,
    }
}

/// Tags and, where possible, partitions one valid read: a read whose name
/// carries a trailing `"\t<pid>"` is pre-partitioned ingestion (every
/// `density`-th k-mer is asserted as a tag under that partition id
/// directly); any other read goes through the normal tagging pass followed
/// by threaded tagging, unifying the partitions of every tag it crosses.
fn tag_and_partition(
    read: &Read,
    codec: &HashCodec,
    tags: &TagStore,
    partitioner: &Partitioner,
) -> Result<()> {
    match parse_trailing_partition_id(&read.name) {
        Some(pid) => {
            tags.ingest_partitioned_read(&read.sequence, codec, partitioner, Some(pid))?;
        }
        None => {
            tags.observe_read(&read.sequence, codec)?;
            let crossed = tags.tags_crossed(&read.sequence, codec)?;
            partitioner.assign_partition(&crossed, false);
        }
    }
    Ok(())
}

/// Streams every record in `path` through `threads` worker threads sharing
/// one [`CacheManager`], inserting each valid read's k-mers into `index`,
/// tagging it in `tags`, and assigning/unifying its partition in
/// `partitioner`. Fans out over a fixed thread pool with explicit `0..N`
/// thread ids rather than a native-thread-id lookup table.
pub fn ingest_file(
    path: &Path,
    threads: u32,
    cache_size: u64,
    index: &PresenceIndex,
    tags: &TagStore,
    partitioner: &Partitioner,
) -> Result<ParserCounters> {
    let format = detect_format(path);
    let stream = stream::StreamReader::open(path)?;
    let cache = CacheManager::new(stream, threads, cache_size)?;
    let codec = HashCodec::new(index.k())?;
    let totals = Mutex::new(ParserCounters::default());

    std::thread::scope(|scope| -> Result<()> {
        let mut handles = Vec::new();
        for thread_id in 0..threads {
            let cache = &cache;
            let totals = &totals;
            handles.push(scope.spawn(move || -> Result<()> {
                let mut local = ParserCounters::default();
                match format {
                    RecordFormat::Fasta => {
                        let mut parser = FastaParser::new(cache, thread_id);
                        while let Some(read) = parser.next_read()? {
                            index.add(&read.sequence)?;
                            tag_and_partition(&read, &codec, tags, partitioner)?;
                        }
                        local += parser.counters();
                    }
                    RecordFormat::Fastq => {
                        let mut parser = FastqParser::new(cache, thread_id);
                        while let Some(read) = parser.next_read()? {
                            index.add(&read.sequence)?;
                            tag_and_partition(&read, &codec, tags, partitioner)?;
                        }
                        local += parser.counters();
                    }
                }
                *totals.lock().unwrap() += local;
                Ok(())
            }));
        }
        for handle in handles {
            handle.join().expect("worker thread panicked")?;
        }
        Ok(())
    })?;

    let result = *totals.lock().unwrap();
    Ok(result)
}
