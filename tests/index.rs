use kmergraph::PresenceIndex;
use tempfile::NamedTempFile;

#[test]
fn inserted_kmers_test_present_and_others_absent() {
    let index = PresenceIndex::new(4, vec![9973, 9967, 9949]).unwrap();
    index.add("ACGTACGT").unwrap();
    assert!(index.test("ACGT").unwrap());
    assert!(index.test("CGTA").unwrap());
    assert!(index.test("GTAC").unwrap());
    assert!(index.test("TACG").unwrap());
}

#[test]
fn add_reports_first_insertion_as_newly_set_and_reinsertion_as_not() {
    let index = PresenceIndex::new(4, vec![9973, 9967]).unwrap();
    let first = index.add("ACGTACGT").unwrap();
    assert!(first > 0);
    let second = index.add("ACGTACGT").unwrap();
    assert_eq!(second, 0);
}

#[test]
fn snapshot_round_trips_through_save_and_load() {
    let index = PresenceIndex::new(5, vec![10007, 10009]).unwrap();
    index.add("ACGTACGTAC").unwrap();

    let file = NamedTempFile::new().unwrap();
    index.save(file.path()).unwrap();

    let loaded = PresenceIndex::load(file.path(), 5).unwrap();
    assert!(loaded.test("ACGTA").unwrap());
    assert_eq!(loaded.table_count(), index.table_count());
}

#[test]
fn loading_with_the_wrong_k_is_rejected() {
    let index = PresenceIndex::new(5, vec![1009]).unwrap();
    let file = NamedTempFile::new().unwrap();
    index.save(file.path()).unwrap();

    assert!(PresenceIndex::load(file.path(), 4).is_err());
}

#[test]
fn abundance_distribution_has_one_entry_per_table() {
    let index = PresenceIndex::new(4, vec![997, 991, 983]).unwrap();
    index.add("ACGTACGT").unwrap();
    assert_eq!(index.abundance_distribution().len(), 3);
}
