//! Bit manipulation used for directory addressing and bucket splitting.
//!
//! Hash values are treated as plain `u32`, so the high bit carries no sign
//! and every shift is logical.
use crate::consts::*;

/// The `n` leftmost bits of `value` as an integer.
pub fn leftmost_bits(value: u32, n: u8) -> u32 {
    if n == 0 {
        return 0;
    }
    value >> (HASH_BITS - n)
}

/// The `n` rightmost bits of `value` as an integer.
pub fn rightmost_bits(value: u32, n: u8) -> u32 {
    if n == 0 {
        return 0;
    }
    value & ((1_u32 << n) - 1)
}

pub fn append_bit0(pattern: u32) -> u32 {
    pattern << 1
}

pub fn append_bit1(pattern: u32) -> u32 {
    (pattern << 1) + 1
}

/// Renders `pattern` as a zero padded binary string of `depth` digits.
///
/// A depth of 0 has no pattern yet and renders as [NO_PATTERN].
pub fn format_pattern(pattern: Option<u32>, depth: u8) -> String {
    match pattern {
        Some(pattern) if depth > 0 => format!("{:0width$b}", pattern, width = depth as usize),
        _ => NO_PATTERN.to_string(),
    }
}
