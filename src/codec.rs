//! Payload codec and chunker.
//!
//! The engine's automation channel rejects commands longer than a fixed
//! limit (254 characters, of which 35 are consumed by the command verb and
//! quoting). Variable lists routinely exceed that, so every `Import` and
//! `Export` is split into balanced, order-preserving chunks.
//!
//! # Chunking algorithm
//!
//! 1. `total` = space-joined length of all items
//! 2. `chunks = ceil(total / max_len)`, `target = ceil(total / chunks)`
//! 3. Walk the items in order; close the current chunk once its joined
//!    length reaches `target`. A chunk is also closed early when the next
//!    item would push it past `max_len`.
//! 4. The trailing partial chunk is emitted if it holds anything.
//!
//! Concatenating the chunks reproduces the input. No chunk is longer than
//! `max_len` unless a single item already is.

use std::ops::Range;

/// Hard limit on a rendered command.
pub const PROTOCOL_COMMAND_LIMIT: usize = 254;

/// Characters taken by the verb, quoting and brackets of `Import`/`Export`.
pub const COMMAND_OVERHEAD: usize = 35;

/// Usable command length after the fixed command overhead.
pub const DEFAULT_MAX_COMMAND_LEN: usize = PROTOCOL_COMMAND_LIMIT - COMMAND_OVERHEAD;

// ============================================================================
// Chunking
// ============================================================================

/// Splits an ordered list of names into protocol-safe chunks.
///
/// Used for `Export` requests, where only the names travel in the command.
///
/// # Examples
///
/// ```
/// use u_simopt::codec::chunk_names;
///
/// let names = ["alpha", "beta", "gamma", "delta"];
/// let chunks = chunk_names(&names, 11);
/// assert_eq!(chunks, vec![&names[..2], &names[2..]]);
/// ```
pub fn chunk_names<S: AsRef<str>>(names: &[S], max_len: usize) -> Vec<&[S]> {
    let lens: Vec<usize> = names.iter().map(|n| n.as_ref().len()).collect();
    chunk_ranges(&lens, max_len)
        .into_iter()
        .map(|r| &names[r])
        .collect()
}

/// Splits an ordered name/value list into protocol-safe chunks.
///
/// Each item is sized as `"<name> <value>"`, so a chunk fits the limit
/// whether the values travel inline or as a separate payload.
pub fn chunk_inputs(inputs: &[(String, f64)], max_len: usize) -> Vec<&[(String, f64)]> {
    let lens: Vec<usize> = inputs
        .iter()
        .map(|(name, value)| name.len() + 1 + format_value(*value).len())
        .collect();
    chunk_ranges(&lens, max_len)
        .into_iter()
        .map(|r| &inputs[r])
        .collect()
}

/// Space-joined length of items with the given individual lengths.
pub fn serialized_len(lens: &[usize]) -> usize {
    if lens.is_empty() {
        return 0;
    }
    lens.iter().sum::<usize>() + lens.len() - 1
}

/// Computes chunk boundaries over items of the given lengths.
fn chunk_ranges(lens: &[usize], max_len: usize) -> Vec<Range<usize>> {
    if lens.is_empty() {
        return Vec::new();
    }

    let max_len = max_len.max(1);
    let total = serialized_len(lens);
    let num_chunks = total.div_ceil(max_len).max(1);
    let target = total.div_ceil(num_chunks);

    let mut ranges = Vec::with_capacity(num_chunks);
    let mut start = 0;
    let mut current = 0usize;

    for (i, &len) in lens.iter().enumerate() {
        if i > start && current + 1 + len > max_len {
            ranges.push(start..i);
            start = i;
            current = 0;
        }

        current = if i == start { len } else { current + 1 + len };

        if current >= target {
            ranges.push(start..i + 1);
            start = i + 1;
            current = 0;
        }
    }

    if start < lens.len() {
        ranges.push(start..lens.len());
    }

    ranges
}

// ============================================================================
// Serialization
// ============================================================================

/// Formats a value for the wire using the shortest round-trip representation.
///
/// Exponent notation is used whenever it is shorter than the plain form.
pub fn format_value(value: f64) -> String {
    let plain = format!("{value}");
    let exp = format!("{value:e}");
    if exp.len() < plain.len() {
        exp
    } else {
        plain
    }
}

/// Joins names with single spaces.
pub fn join_names<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Joins formatted values with single spaces.
pub fn join_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format_value(*v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits an engine reply into tokens.
///
/// The engine separates exported values with tabs and terminates rows with
/// CRLF; any run of whitespace is a separator.
pub fn tokenize(reply: &str) -> Vec<&str> {
    reply.split_whitespace().collect()
}

// ============================================================================
// Tests
// ============================================================================
