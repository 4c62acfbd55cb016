use api::range::{align_chunks, parse_range_header};
use api::CHUNK_SIZE;
use proptest::prelude::*;

proptest! {
    /// The parser must never panic, regardless of how malformed the input is.
    #[test]
    fn parse_range_header_never_panics(header in ".*", file_size in 0u64..1_000_000u64) {
        let _ = parse_range_header(Some(&header), file_size);
    }

    /// Every satisfiable parse must land fully inside `[0, file_size)`.
    #[test]
    fn satisfiable_ranges_stay_in_bounds(
        from in 0u64..10_000u64,
        len in 1u64..10_000u64,
        file_size in 1u64..20_000u64,
    ) {
        let to = from + len - 1;
        let header = format!("bytes={from}-{to}");
        if let Ok(Some(range)) = parse_range_header(Some(&header), file_size) {
            prop_assert!(range.from <= range.to);
            prop_assert!(range.to < file_size);
        }
    }

    /// `align_chunks` must reconstruct exactly the requested span once its
    /// trims are applied to the concatenated upstream chunks, for any
    /// in-bounds `(from, to)` pair, not just the handful of fixed cases the
    /// unit tests cover.
    #[test]
    fn align_chunks_always_reconstructs_the_requested_span(
        from in 0u64..(100 * CHUNK_SIZE),
        len in 1u64..(20 * CHUNK_SIZE),
    ) {
        let to = from + len - 1;
        let plan = align_chunks(from, to, CHUNK_SIZE);

        prop_assert_eq!(plan.body_length, len);
        prop_assert_eq!(plan.offset % CHUNK_SIZE, 0);
        prop_assert!(plan.offset <= from);

        let fetched = plan.part_count * CHUNK_SIZE;
        let trimmed = if plan.part_count == 1 {
            plan.tail_trim - plan.head_trim
        } else {
            fetched - plan.head_trim - (CHUNK_SIZE - plan.tail_trim)
        };
        prop_assert_eq!(trimmed, plan.body_length);
    }
}
