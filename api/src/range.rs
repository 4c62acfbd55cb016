//! Byte-range parsing and upstream chunk-fetch alignment math.
//!
//! Kept dependency-free and pure so it can be exhaustively proptested in
//! isolation, the same way the reference range-math crate in this codebase's
//! lineage keeps alignment arithmetic out of the HTTP layer.

use thiserror::Error;

/// Fixed upstream read unit.
pub const CHUNK_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum RangeError {
    #[error("range unit must be bytes")]
    BadUnit,
    #[error("malformed range header")]
    Malformed,
    #[error("range not satisfiable")]
    NotSatisfiable,
    #[error("multiple ranges are not supported")]
    MultipleRanges,
}

/// A parsed, validated `(from, to)` pair, both inclusive and zero-indexed,
/// with `from <= to < file_size`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ByteRange {
    pub from: u64,
    pub to: u64,
}

/// Parse a `Range: bytes=...` header value against a known file size.
///
/// Returns `Ok(None)` when no `Range` header was supplied at all (the caller
/// passes `None` for `header`), meaning the whole object should be served
/// with a 200. Returns `Ok(Some(range))` for a satisfiable explicit range
/// (207/206 path). Returns `Err` for anything that should become a 416.
pub fn parse_range_header(header: Option<&str>, file_size: u64) -> Result<Option<ByteRange>, RangeError> {
    let Some(header) = header else {
        return Ok(None);
    };

    let spec = header.strip_prefix("bytes=").ok_or(RangeError::BadUnit)?;

    let mut parts = spec.split(',');
    let first = parts.next().ok_or(RangeError::Malformed)?;
    if parts.next().is_some() {
        return Err(RangeError::MultipleRanges);
    }

    let (start_str, end_str) = first.split_once('-').ok_or(RangeError::Malformed)?;

    let (from, to) = match (start_str.trim(), end_str.trim()) {
        ("", "") => return Err(RangeError::Malformed),
        ("", suffix_len) => {
            // "-N": last N bytes.
            let n: u64 = suffix_len.parse().map_err(|_| RangeError::Malformed)?;
            if n == 0 || n > file_size {
                return Err(RangeError::NotSatisfiable);
            }
            (file_size - n, file_size - 1)
        }
        (start, "") => {
            // "N-": from N to EOF.
            let from: u64 = start.parse().map_err(|_| RangeError::Malformed)?;
            (from, file_size.saturating_sub(1))
        }
        (start, end) => {
            let from: u64 = start.parse().map_err(|_| RangeError::Malformed)?;
            let to: u64 = end.parse().map_err(|_| RangeError::Malformed)?;
            (from, to)
        }
    };

    if from > to || to >= file_size {
        return Err(RangeError::NotSatisfiable);
    }

    Ok(Some(ByteRange { from, to }))
}

/// The instructions handed to the Chunk Generator: where to start fetching,
/// how much to trim off the first and last upstream chunks, how many chunks
/// to fetch, and the exact body length those trims must add up to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChunkPlan {
    pub offset: u64,
    pub head_trim: u64,
    pub tail_trim: u64,
    pub part_count: u64,
    pub body_length: u64,
}

/// Compute the aligned chunk-fetch plan for `range_from..=range_to` against
/// a fixed `chunk_size`. `part_count` is
/// `ceil((range_to+1)/chunk_size) - floor(offset/chunk_size)`: the number of
/// chunk-sized reads needed to cover the last requested byte, not just the
/// count up to (but excluding) it.
pub fn align_chunks(range_from: u64, range_to: u64, chunk_size: u64) -> ChunkPlan {
    debug_assert!(range_from <= range_to);
    debug_assert!(chunk_size > 0);

    let offset = range_from - (range_from % chunk_size);
    let head_trim = range_from - offset;
    let tail_trim = (range_to % chunk_size) + 1;
    let part_count = (range_to + 1).div_ceil(chunk_size) - offset / chunk_size;
    let body_length = range_to - range_from + 1;

    ChunkPlan {
        offset,
        head_trim,
        tail_trim,
        part_count,
        body_length,
    }
}
