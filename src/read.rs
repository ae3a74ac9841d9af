//! The sequencing-read record type shared by the FASTA and FASTQ parsers.

/// One parsed record. `accuracy` is empty for FASTA input. `annotations` has
/// no source syntax in either format and is always empty; the field exists
/// so callers that build a `Read` by hand have somewhere to put metadata
/// without reaching for a second type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Read {
    pub name: String,
    pub annotations: String,
    pub sequence: String,
    pub accuracy: String,
}

/// A sequence is valid iff every byte is one of `ACGTacgt`. Reads containing
/// `N`/`n` (or anything else) are discarded by the parsers rather than
/// passed downstream.
pub fn is_valid_sequence(seq: &str) -> bool {
    seq.bytes()
        .all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'a' | b'c' | b'g' | b't'))
}

/// Parses the `\t<pid>` partition-id annotation a pre-partitioned FASTA
/// input trails its read names with. Returns `None` if there is no tab or
/// the suffix after it does not parse as a `u64`.
pub fn parse_trailing_partition_id(name: &str) -> Option<u64> {
    let tab = name.rfind('\t')?;
    name[tab + 1..].trim().parse().ok()
}

impl Read {
    pub fn is_valid(&self) -> bool {
        is_valid_sequence(&self.sequence)
    }
}
