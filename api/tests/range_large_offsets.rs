use api::range::{align_chunks, parse_range_header};
use api::CHUNK_SIZE;

const FOUR_GIB: u64 = 1 << 32;

#[test]
fn parses_an_explicit_range_starting_beyond_4_gib() {
    let file_size = FOUR_GIB * 2;
    let from = FOUR_GIB + 123;
    let to = from + 999;
    let header = format!("bytes={from}-{to}");

    let range = parse_range_header(Some(&header), file_size).unwrap().unwrap();
    assert_eq!(range.from, from);
    assert_eq!(range.to, to);
}

#[test]
fn parses_a_suffix_range_on_a_file_larger_than_4_gib() {
    let file_size = FOUR_GIB + 10;
    let range = parse_range_header(Some("bytes=-10"), file_size).unwrap().unwrap();
    assert_eq!(range.from, file_size - 10);
    assert_eq!(range.to, file_size - 1);
}

#[test]
fn align_chunks_handles_offsets_beyond_4_gib_without_truncating() {
    let from = FOUR_GIB + 42;
    let to = from + (3 * CHUNK_SIZE) - 1;

    let plan = align_chunks(from, to, CHUNK_SIZE);

    assert_eq!(plan.offset % CHUNK_SIZE, 0);
    assert!(plan.offset >= FOUR_GIB);
    assert_eq!(plan.body_length, to - from + 1);
}
