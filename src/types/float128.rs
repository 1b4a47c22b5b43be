//! # 128-bit and Object-Id Value Types
//!
//! Two fixed-width scalar carriers that the row format stores verbatim:
//!
//! - `Float128`: an IEEE-754-2008 decimal128 value in BID encoding, held as
//!   two `i64` words. The codec round-trips the 16 bytes exactly and performs
//!   no decimal arithmetic.
//! - `MongoDbObjectId`: the fixed 12-byte identifier (4-byte big-endian
//!   timestamp + 8 opaque bytes). Equality is byte-exact.

/// IEEE-754-2008 decimal128 (BID) payload, stored as two 64-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Float128 {
    /// High-order 64 bits of the BID encoding.
    pub high: i64,
    /// Low-order 64 bits of the BID encoding.
    pub low: i64,
}

impl Float128 {
    pub const SIZE: usize = 16;

    pub fn new(high: i64, low: i64) -> Self {
        Self { high, low }
    }

    /// Wire layout: low word then high word, each little-endian.
    pub fn to_le_bytes(self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[..8].copy_from_slice(&self.low.to_le_bytes());
        bytes[8..].copy_from_slice(&self.high.to_le_bytes());
        bytes
    }

    pub fn from_le_bytes(bytes: [u8; Self::SIZE]) -> Self {
        let low = i64::from_le_bytes(bytes[..8].try_into().unwrap());
        let high = i64::from_le_bytes(bytes[8..].try_into().unwrap());
        Self { high, low }
    }
}

/// Fixed 12-byte Mongo-style object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MongoDbObjectId {
    /// First 8 bytes: 4-byte big-endian timestamp + 4 machine/process bytes.
    pub high: u64,
    /// Last 4 bytes: counter.
    pub low: u32,
}

impl MongoDbObjectId {
    pub const SIZE: usize = 12;

    pub fn new(high: u64, low: u32) -> Self {
        Self { high, low }
    }

    /// Wire layout: the 12 identifier bytes in big-endian order, so encoded
    /// ids sort by timestamp.
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[..8].copy_from_slice(&self.high.to_be_bytes());
        bytes[8..].copy_from_slice(&self.low.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        let high = u64::from_be_bytes(bytes[..8].try_into().unwrap());
        let low = u32::from_be_bytes(bytes[8..].try_into().unwrap());
        Self { high, low }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float128_byte_roundtrip() {
        let values = [
            Float128::default(),
            Float128::new(0x3040_0000_0000_0000u64 as i64, 42),
            Float128::new(-1, -1),
            Float128::new(i64::MIN, i64::MAX),
        ];
        for v in values {
            assert_eq!(Float128::from_le_bytes(v.to_le_bytes()), v);
        }
    }

    #[test]
    fn object_id_byte_roundtrip_and_equality() {
        let a = MongoDbObjectId::new(0x0102_0304_0506_0708, 0x090A_0B0C);
        let b = MongoDbObjectId::from_bytes(a.to_bytes());
        assert_eq!(a, b);
        assert_eq!(
            a.to_bytes(),
            [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C]
        );
    }

    #[test]
    fn object_ids_sort_by_timestamp_bytes() {
        let older = MongoDbObjectId::new(0x0000_0001_0000_0000, 0);
        let newer = MongoDbObjectId::new(0x0000_0002_0000_0000, 0);
        assert!(older.to_bytes() < newer.to_bytes());
    }
}
