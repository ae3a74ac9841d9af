use thiserror::Error;

/// Tagged error kinds surfaced across the crate's public API.
///
/// Every variant names a distinct failure condition so callers can match on
/// `kind` rather than parse a message. I/O failures keep their underlying
/// `std::io::Error` via `#[source]` for display, but are not auto-converted
/// with `?` because `invalid_stream_buffer` and `stream_read_error` need to
/// be told apart at the call site.
#[derive(Debug, Error)]
pub enum KmerGraphError {
    #[error("invalid stream buffer: {0}")]
    InvalidStreamBuffer(String),

    #[error("stream read error: {0}")]
    StreamReadError(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid FASTA data: {0}")]
    InvalidFasta(String),

    #[error("invalid FASTQ data: {0}")]
    InvalidFastq(String),

    #[error("invalid sequence: base outside ACGTacgt")]
    InvalidSequence,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("cache size ({cache_size}) is smaller than the thread count ({threads})")]
    InvalidCacheSize { cache_size: u64, threads: u32 },

    #[error("thread id {requested} exceeds configured pool of {configured}")]
    TooManyThreads { requested: u32, configured: u32 },

    #[error("invalid performance metrics key: {0}")]
    InvalidPerformanceMetricsKey(u32),

    #[error("snapshot k ({on_disk}) does not match the requested k ({requested})")]
    VersionMismatch { on_disk: u32, requested: u32 },
}

pub type Result<T> = std::result::Result<T, KmerGraphError>;
