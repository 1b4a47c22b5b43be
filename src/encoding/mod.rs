//! # Encoding Module
//!
//! Numeric codecs shared by the fixed, variable, and sparse regions:
//!
//! - **Varuint encoding**: 7-bit group varint for lengths, counts, path
//!   tokens, and `VarUInt`-typed values
//! - **Zigzag sign rotation**: signed-to-unsigned mapping for `VarInt`-typed
//!   values so small negatives stay small on the wire

pub mod varint;

pub use varint::{
    decode_varuint, encode_varuint, rotate_sign_to_lsb, rotate_sign_to_lsb_i16,
    rotate_sign_to_lsb_i32, rotate_sign_to_msb, rotate_sign_to_msb_i16, rotate_sign_to_msb_i32,
    varuint_len, MAX_VARUINT_LEN,
};
