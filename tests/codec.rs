use kmergraph::HashCodec;

#[test]
fn forward_and_reverse_complement_agree_on_a_palindrome() {
    let codec = HashCodec::new(4).unwrap();
    // AATT is its own reverse complement.
    let (fwd, rc) = codec.hash(b"AATT").unwrap();
    assert_eq!(fwd, rc);
}

#[test]
fn canonical_picks_the_smaller_of_forward_and_reverse() {
    let codec = HashCodec::new(3).unwrap();
    let (fwd, rc) = codec.hash(b"GGG").unwrap();
    // GGG's reverse complement is CCC, which encodes smaller.
    assert_eq!(HashCodec::canonical(fwd, rc), fwd.min(rc));
    assert!(rc < fwd);
}

#[test]
fn shift_next_matches_a_fresh_hash_of_the_shifted_window() {
    let codec = HashCodec::new(4).unwrap();
    let (f0, r0) = codec.hash(b"ACGT").unwrap();
    let (f1, r1) = codec.shift_next(f0, r0, b'A').unwrap();
    let (expect_f, expect_r) = codec.hash(b"CGTA").unwrap();
    assert_eq!(f1, expect_f);
    assert_eq!(r1, expect_r);
}

#[test]
fn shift_prev_undoes_shift_next() {
    let codec = HashCodec::new(4).unwrap();
    let (f0, r0) = codec.hash(b"ACGT").unwrap();
    let (f1, r1) = codec.shift_next(f0, r0, b'A').unwrap();
    let (f2, r2) = codec.shift_prev(f1, r1, b'A').unwrap();
    assert_eq!((f0, r0), (f2, r2));
}

#[test]
fn decode_round_trips_through_hash() {
    let codec = HashCodec::new(6).unwrap();
    let (fwd, _) = codec.hash(b"ACGTAC").unwrap();
    assert_eq!(codec.decode(fwd), "ACGTAC");
}

#[test]
fn lowercase_bases_are_accepted() {
    let codec = HashCodec::new(3).unwrap();
    let (upper, _) = codec.hash(b"ACG").unwrap();
    let (lower, _) = codec.hash(b"acg").unwrap();
    assert_eq!(upper, lower);
}

#[test]
fn non_acgt_bases_are_rejected() {
    let codec = HashCodec::new(3).unwrap();
    assert!(codec.hash(b"ACN").is_err());
}

#[test]
fn k_out_of_range_is_rejected() {
    assert!(HashCodec::new(0).is_err());
    assert!(HashCodec::new(33).is_err());
    assert!(HashCodec::new(32).is_ok());
}
