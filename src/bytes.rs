use crate::consts::HEADER_CELL_SIZE;

/// Number of bytes something occupies once packed into a bucket.
pub trait ByteLength {
    fn byte_len(&self) -> usize;
}

impl ByteLength for [u8] {
    fn byte_len(&self) -> usize {
        HEADER_CELL_SIZE + self.len()
    }
}

impl ByteLength for str {
    fn byte_len(&self) -> usize {
        self.as_bytes().byte_len()
    }
}

/// Moves `buf[start..end]` left by `n` positions and zeroes the cells the
/// range vacated.
///
/// `start` must be at least `n`.
pub fn shift_left(buf: &mut [u8], start: usize, end: usize, n: usize) {
    if n == 0 || start >= end {
        return;
    }
    buf.copy_within(start..end, start - n);
    erase(buf, start.max(end - n), end);
}

/// Moves `buf[start..end]` right by `n` positions and zeroes the cells the
/// range vacated.
///
/// `end + n` must not exceed the buffer length.
pub fn shift_right(buf: &mut [u8], start: usize, end: usize, n: usize) {
    if n == 0 || start >= end {
        return;
    }
    buf.copy_within(start..end, start + n);
    erase(buf, start, end.min(start + n));
}

pub fn erase(buf: &mut [u8], start: usize, end: usize) {
    buf[start..end].fill(0);
}
