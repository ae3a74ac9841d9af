use kmergraph::cache::CacheManager;
use kmergraph::parser::{FastaParser, FastqParser};
use kmergraph::stream::StreamReader;
use std::io::Write;
use tempfile::NamedTempFile;

fn make_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn fasta_parser_reads_every_record_single_threaded() {
    let content = ">r1\nACGTACGT\n>r2\nTTTTGGGG\nCCCC\n";
    let file = make_file(content);
    let stream = StreamReader::open(file.path()).unwrap();
    let cache = CacheManager::new(stream, 1, 4096).unwrap();

    let mut parser = FastaParser::new(&cache, 0);
    let r1 = parser.next_read().unwrap().unwrap();
    assert_eq!(r1.name, "r1");
    assert_eq!(r1.sequence, "ACGTACGT");

    let r2 = parser.next_read().unwrap().unwrap();
    assert_eq!(r2.name, "r2");
    assert_eq!(r2.sequence, "TTTTGGGGCCCC");

    assert!(parser.next_read().unwrap().is_none());
    assert_eq!(parser.counters().parsed_total, 2);
    assert_eq!(parser.counters().parsed_valid, 2);
}

#[test]
fn fasta_parser_discards_reads_containing_n() {
    let content = ">r1\nACGTNACGT\n>r2\nACGTACGT\n";
    let file = make_file(content);
    let stream = StreamReader::open(file.path()).unwrap();
    let cache = CacheManager::new(stream, 1, 4096).unwrap();

    let mut parser = FastaParser::new(&cache, 0);
    let only = parser.next_read().unwrap().unwrap();
    assert_eq!(only.name, "r2");
    assert!(parser.next_read().unwrap().is_none());
    assert_eq!(parser.counters().parsed_total, 2);
    assert_eq!(parser.counters().parsed_valid, 1);
}

#[test]
fn fastq_parser_reads_four_line_records() {
    let content = "@r1\nACGTACGT\n+\nIIIIIIII\n@r2\nTTTTGGGG\n+\nIIIIIIII\n";
    let file = make_file(content);
    let stream = StreamReader::open(file.path()).unwrap();
    let cache = CacheManager::new(stream, 1, 4096).unwrap();

    let mut parser = FastqParser::new(&cache, 0);
    let r1 = parser.next_read().unwrap().unwrap();
    assert_eq!(r1.name, "r1");
    assert_eq!(r1.sequence, "ACGTACGT");
    assert_eq!(r1.accuracy, "IIIIIIII");

    let r2 = parser.next_read().unwrap().unwrap();
    assert_eq!(r2.name, "r2");

    assert!(parser.next_read().unwrap().is_none());
    assert_eq!(parser.counters().parsed_total, 2);
}
