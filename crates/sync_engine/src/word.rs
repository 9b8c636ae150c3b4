//! Little-endian sample words.
//!
//! Samples are at most eight bytes wide, so every read goes through a fixed
//! eight byte scratch array.

/// Decode the first `width` bytes of `bytes` as a little-endian integer.
///
/// Caller guarantees `width <= 8` and `bytes.len() >= width`.
#[inline]
pub fn read_word(bytes: &[u8], width: usize) -> u64 {
    let mut scratch = [0u8; 8];
    scratch[..width].copy_from_slice(&bytes[..width]);
    u64::from_le_bytes(scratch)
}

/// Encode `value` into the first `width` bytes of `out`, dropping high bytes.
#[inline]
pub fn write_word(value: u64, out: &mut [u8], width: usize) {
    out[..width].copy_from_slice(&value.to_le_bytes()[..width]);
}

/// Keep only the low `width` bytes of `value`.
#[inline]
pub fn truncate(value: u64, width: usize) -> u64 {
    if width >= 8 {
        value
    } else {
        value & ((1u64 << (width * 8)) - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_partial_width() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0xAA];
        assert_eq!(read_word(&bytes, 2), 0x0201);
        assert_eq!(read_word(&bytes, 4), 0x0403_0201);
    }

    #[test]
    fn test_write_drops_high_bytes() {
        let mut out = [0xFFu8; 4];
        write_word(0x1122_3344_5566, &mut out, 2);
        assert_eq!(out, [0x66, 0x55, 0xFF, 0xFF]);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate(0x1_0000_00FF, 1), 0xFF);
        assert_eq!(truncate(0x1_0000_00FF, 4), 0xFF);
        assert_eq!(truncate(u64::MAX, 8), u64::MAX);
    }
}
