use kmergraph::{ingest_file, Partitioner, PresenceIndex, TagStore};
use std::io::Write;
use tempfile::NamedTempFile;

fn make_fasta(records: usize) -> (NamedTempFile, usize) {
    let mut file = NamedTempFile::new().unwrap();
    let mut valid = 0;
    for i in 0..records {
        if i % 7 == 0 {
            // Every 7th record carries an N and gets discarded downstream.
            writeln!(file, ">r{i}\nACGTNACGTACGTACGTACGT").unwrap();
        } else {
            writeln!(file, ">r{i}\nACGTACGTACGTACGTACGTACGTACGT").unwrap();
            valid += 1;
        }
    }
    file.flush().unwrap();
    (file, valid)
}

#[test]
fn single_threaded_ingest_counts_every_record() {
    let (file, valid) = make_fasta(40);
    let index = PresenceIndex::new(8, vec![100_003, 100_019, 100_043]).unwrap();
    let tags = TagStore::new(11).unwrap();

    let partitioner = Partitioner::new();
    let counters = ingest_file(file.path(), 1, 4096, &index, &tags, &partitioner).unwrap();
    assert_eq!(counters.parsed_total, 40);
    assert_eq!(counters.parsed_valid, valid as u64);
    assert!(index.test("ACGTACGT").unwrap());
}

#[test]
fn multi_threaded_ingest_matches_single_threaded_totals() {
    let (file, valid) = make_fasta(200);
    let index = PresenceIndex::new(8, vec![100_003, 100_019, 100_043]).unwrap();
    let tags = TagStore::new(11).unwrap();

    // Small cache size relative to file size forces several refills and
    // at least one segment boundary to fall inside a record.
    let partitioner = Partitioner::new();
    let counters = ingest_file(file.path(), 4, 512, &index, &tags, &partitioner).unwrap();
    assert_eq!(counters.parsed_total, 200);
    assert_eq!(counters.parsed_valid, valid as u64);
}

#[test]
fn pre_partitioned_ingest_reports_the_partition_sizes_from_the_input() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, ">r1\t5\nACGTACGT").unwrap();
    writeln!(file, ">r2\t5\nTTTTCCCC").unwrap();
    writeln!(file, ">r3\t7\nGGGGAAAA").unwrap();
    file.flush().unwrap();

    let index = PresenceIndex::new(4, vec![1009, 1013]).unwrap();
    let tags = TagStore::new(1000).unwrap();
    let partitioner = Partitioner::new();

    ingest_file(file.path(), 1, 4096, &index, &tags, &partitioner).unwrap();

    let sizes = partitioner.partition_sizes();
    let mut counts: Vec<usize> = sizes.values().copied().collect();
    counts.sort_unstable();
    assert_eq!(counts, vec![1, 2]);
}
