//! # Variable-Length Integer Encoding and Zigzag Sign Rotation
//!
//! This module provides the numeric codec for the sparse region: a standard
//! 7-bits-per-byte varuint (least-significant group first, MSB continuation
//! bit) plus the zigzag transform that maps signed integers onto small
//! unsigned values so negative numbers encode compactly.
//!
//! ## Varuint Format
//!
//! | Value range            | Bytes |
//! |------------------------|-------|
//! | 0 - 127                | 1     |
//! | 128 - 16383            | 2     |
//! | 16384 - 2097151        | 3     |
//! | ...                    | ...   |
//! | > 2^56 - 1             | 9-10  |
//!
//! Each byte carries 7 payload bits; bit 7 set means "more bytes follow".
//! A `u64` needs at most 10 bytes and the 10th byte may only carry a single
//! significant bit. `decode_varuint` rejects longer (overlong) encodings and
//! 10th bytes that would overflow 64 bits.
//!
//! ## Zigzag Sign Rotation
//!
//! `rotate_sign_to_lsb` moves the sign bit into the least-significant bit so
//! small-magnitude negatives become small unsigned values:
//!
//! ```text
//!  0 -> 0,  -1 -> 1,  1 -> 2,  -2 -> 3,  2 -> 4, ...
//! ```
//!
//! `rotate_sign_to_msb` is the exact inverse; the round-trip law
//! `rotate_sign_to_msb(rotate_sign_to_lsb(x)) == x` holds for every value in
//! range and is tested exhaustively over the 16-bit domain.
//!
//! ## Zero-Copy Design
//!
//! All functions operate on byte slices directly and perform no heap
//! allocation. `decode_varuint` returns `eyre::Result` with descriptive
//! messages for truncated or overlong input.

use eyre::{ensure, Result};

/// Maximum encoded size of a `u64` varuint.
pub const MAX_VARUINT_LEN: usize = 10;

pub fn varuint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

pub fn encode_varuint(mut value: u64, buf: &mut [u8]) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    i + 1
}

pub fn decode_varuint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &b) in buf.iter().enumerate() {
        ensure!(i < MAX_VARUINT_LEN, "overlong varuint encoding");
        if i == MAX_VARUINT_LEN - 1 {
            ensure!(b <= 0x01, "varuint overflows 64 bits");
        }
        value |= u64::from(b & 0x7F) << shift;
        if b & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    eyre::bail!("truncated varuint");
}

pub fn rotate_sign_to_lsb_i16(value: i16) -> u16 {
    ((value << 1) ^ (value >> 15)) as u16
}

pub fn rotate_sign_to_msb_i16(value: u16) -> i16 {
    ((value >> 1) as i16) ^ -((value & 1) as i16)
}

pub fn rotate_sign_to_lsb_i32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub fn rotate_sign_to_msb_i32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

pub fn rotate_sign_to_lsb(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn rotate_sign_to_msb(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varuint_len_boundaries() {
        assert_eq!(varuint_len(0), 1);
        assert_eq!(varuint_len(127), 1);
        assert_eq!(varuint_len(128), 2);
        assert_eq!(varuint_len(16383), 2);
        assert_eq!(varuint_len(16384), 3);
        assert_eq!(varuint_len(u32::MAX as u64), 5);
        assert_eq!(varuint_len(u64::MAX), 10);
    }

    #[test]
    fn varuint_roundtrip_boundary_values() {
        let values = [
            0u64,
            1,
            127,
            128,
            255,
            16383,
            16384,
            2097151,
            2097152,
            u32::MAX as u64,
            u32::MAX as u64 + 1,
            u64::MAX >> 1,
            u64::MAX,
        ];

        for &value in &values {
            let mut buf = [0u8; MAX_VARUINT_LEN];
            let written = encode_varuint(value, &mut buf);
            assert_eq!(written, varuint_len(value), "len mismatch for {}", value);
            let (decoded, read) = decode_varuint(&buf).unwrap();
            assert_eq!(decoded, value, "value mismatch for {}", value);
            assert_eq!(read, written, "read mismatch for {}", value);
        }
    }

    #[test]
    fn decode_varuint_rejects_empty_and_truncated() {
        assert!(decode_varuint(&[]).is_err());
        assert!(decode_varuint(&[0x80]).is_err());
        assert!(decode_varuint(&[0xFF, 0xFF]).is_err());
    }

    #[test]
    fn decode_varuint_rejects_overlong_encoding() {
        // 11 continuation bytes can never be a valid u64.
        let buf = [0x80u8; 11];
        assert!(decode_varuint(&buf).is_err());

        // 10th byte with more than one significant bit overflows 64 bits.
        let mut buf = [0x80u8; 10];
        buf[9] = 0x02;
        assert!(decode_varuint(&buf).is_err());
    }

    #[test]
    fn decode_varuint_accepts_maximal_u64() {
        let mut buf = [0u8; MAX_VARUINT_LEN];
        let written = encode_varuint(u64::MAX, &mut buf);
        assert_eq!(written, 10);
        let (decoded, read) = decode_varuint(&buf).unwrap();
        assert_eq!(decoded, u64::MAX);
        assert_eq!(read, 10);
    }

    #[test]
    fn zigzag_small_values_map_compactly() {
        assert_eq!(rotate_sign_to_lsb(0), 0);
        assert_eq!(rotate_sign_to_lsb(-1), 1);
        assert_eq!(rotate_sign_to_lsb(1), 2);
        assert_eq!(rotate_sign_to_lsb(-2), 3);
        assert_eq!(rotate_sign_to_lsb(2), 4);
    }

    #[test]
    fn zigzag_roundtrip_exhaustive_i16() {
        for value in i16::MIN..=i16::MAX {
            assert_eq!(rotate_sign_to_msb_i16(rotate_sign_to_lsb_i16(value)), value);
        }
    }

    #[test]
    fn zigzag_roundtrip_i32_boundaries() {
        for value in [i32::MIN, i32::MIN + 1, -1, 0, 1, i32::MAX - 1, i32::MAX] {
            assert_eq!(rotate_sign_to_msb_i32(rotate_sign_to_lsb_i32(value)), value);
        }
    }

    #[test]
    fn zigzag_roundtrip_i64_boundaries() {
        let values = [
            i64::MIN,
            i64::MIN + 1,
            -(1i64 << 62),
            -1,
            0,
            1,
            1i64 << 62,
            i64::MAX - 1,
            i64::MAX,
        ];
        for &value in &values {
            assert_eq!(rotate_sign_to_msb(rotate_sign_to_lsb(value)), value);
        }
    }

    #[test]
    fn zigzag_then_varuint_roundtrip() {
        for &value in &[-1000i64, -42, -1, 0, 1, 42, 1000, i64::MIN, i64::MAX] {
            let mut buf = [0u8; MAX_VARUINT_LEN];
            let written = encode_varuint(rotate_sign_to_lsb(value), &mut buf);
            let (decoded, read) = decode_varuint(&buf).unwrap();
            assert_eq!(read, written);
            assert_eq!(rotate_sign_to_msb(decoded), value);
        }
    }
}
