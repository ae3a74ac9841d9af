use flate2::write::GzEncoder;
use flate2::Compression;
use kmergraph::stream::{detect_compression, strip_compression_extension, StreamReader};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn detects_compression_from_extension() {
    use kmergraph::stream::Compression as Kind;
    assert_eq!(detect_compression(Path::new("reads.fa")), Kind::Raw);
    assert_eq!(detect_compression(Path::new("reads.fa.gz")), Kind::Gzip);
    assert_eq!(detect_compression(Path::new("reads.fa.bz2")), Kind::Bzip2);
}

#[test]
fn strips_the_compression_extension_but_not_the_format_one() {
    assert_eq!(
        strip_compression_extension(Path::new("reads.fq.gz")),
        Path::new("reads.fq")
    );
    assert_eq!(
        strip_compression_extension(Path::new("reads.fa")),
        Path::new("reads.fa")
    );
}

#[test]
fn raw_stream_reads_back_exact_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plain.fa");
    std::fs::write(&path, b"some plain content").unwrap();

    let mut stream = StreamReader::open(&path).unwrap();
    let mut buf = [0u8; 64];
    let n = stream.read_into(&mut buf).unwrap() as usize;
    assert_eq!(&buf[..n], b"some plain content");
    assert!(stream.is_at_eos());
}

#[test]
fn gzip_stream_decompresses_transparently() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reads.fa.gz");

    let payload = b">r1\nACGTACGTACGT\n".repeat(50);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&payload).unwrap();
    let compressed = encoder.finish().unwrap();
    std::fs::write(&path, &compressed).unwrap();

    let mut stream = StreamReader::open(&path).unwrap();
    let mut collected = Vec::new();
    loop {
        let mut buf = [0u8; 256];
        let n = stream.read_into(&mut buf).unwrap() as usize;
        collected.extend_from_slice(&buf[..n]);
        if stream.is_at_eos() {
            break;
        }
    }
    assert_eq!(collected, payload);
}
