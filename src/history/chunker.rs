// src/history/chunker.rs
//
// Splits incoming byte buffers into row-sized pieces.
// Newline boundaries are honoured first, then an optional length limit.

const NEWLINE: u8 = b'\n';

/// Split on line terminators, consuming them.
///
/// Empty input yields one empty line. A terminator at the very end closes the
/// last line instead of opening an empty one, so `b"ab\n"` is `["ab"]` while
/// `b"ab\n\n"` is `["ab", ""]`.
fn lines(data: &[u8]) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = data.split(|&b| b == NEWLINE).collect();
    if lines.len() > 1 && data.last() == Some(&NEWLINE) {
        lines.pop();
    }
    lines
}

/// Split on line terminators only. Each line, however long, is one piece.
pub fn split_lines(data: &[u8]) -> Vec<Vec<u8>> {
    lines(data).into_iter().map(|line| line.to_vec()).collect()
}

/// Split on line terminators, then cut every line into windows of at most
/// `subsequent_max` bytes.
///
/// The first line is special: its first piece holds at most `first_max`
/// bytes (so it can top up a partially filled row) and its leftover is cut
/// into `subsequent_max` windows like every other line.
///
/// Requires `subsequent_max > 0` and `first_max <= subsequent_max`.
pub fn split_by_length(data: &[u8], first_max: usize, subsequent_max: usize) -> Vec<Vec<u8>> {
    debug_assert!(subsequent_max > 0, "chunk length must be positive");
    debug_assert!(
        first_max <= subsequent_max,
        "first chunk cannot be longer than the chunk length"
    );

    let mut pieces = Vec::new();

    for (i, line) in lines(data).into_iter().enumerate() {
        let rest = if i == 0 {
            let head = first_max.min(line.len());
            pieces.push(line[..head].to_vec());
            &line[head..]
        } else if line.is_empty() {
            pieces.push(Vec::new());
            continue;
        } else {
            line
        };

        pieces.extend(rest.chunks(subsequent_max).map(<[u8]>::to_vec));
    }

    pieces
}

/// Dispatch to length-limited or newline-only splitting.
pub fn split_data(
    data: &[u8],
    limit_by_length: bool,
    chunk_length: usize,
    first_chunk_length: usize,
) -> Vec<Vec<u8>> {
    if limit_by_length {
        split_by_length(data, first_chunk_length, chunk_length)
    } else {
        split_lines(data)
    }
}
