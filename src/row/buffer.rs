//! # RowBuffer - The Mutable Row Primitive
//!
//! `RowBuffer` owns one contiguous byte region holding a single row:
//!
//! ```text
//! +---------+-----------+---------------------+------------------+---------------+
//! | version | schema id | bit + fixed region  | variable region  | sparse region |
//! | u8      | i32 LE    | sized by the Layout | varuint-framed   | self-tagged   |
//! +---------+-----------+---------------------+------------------+---------------+
//! 0         1           5 (HEADER_SIZE)
//! ```
//!
//! Every size-changing mutation routes through the single splice primitive
//! (`insert_bytes` / `delete_bytes`), which shifts the tail by the exact
//! delta and grows the storage through the `BufferResizer` when the logical
//! length exceeds capacity. The buffer never shrinks its allocation, only
//! its logical length.
//!
//! ## Cursor Staleness
//!
//! A `RowCursor` is a value snapshot of offsets into this buffer. Any
//! structural mutation that is not performed *through* a given cursor
//! logically invalidates every cursor positioned at or after the mutation
//! point; such cursors must be re-derived via `RowCursor::create` / `find`.
//! No generation counter is maintained; staleness is the documented,
//! caller-enforced contract of the format.
//!
//! ## Thread Safety
//!
//! None. A buffer and its cursors are single-threaded; only the
//! immutable `Layout` / `LayoutResolver` may be shared across threads.

use crate::encoding::varint::{decode_varuint, encode_varuint, varuint_len, MAX_VARUINT_LEN};
use crate::error::{RowError, RowResult};
use crate::layout::resolver::LayoutResolver;
use crate::layout::{Layout, LayoutBit, LayoutColumn};
use crate::row::cursor::RowCursor;
use crate::schema::StorageKind;
use crate::types::{Float128, LayoutType, MongoDbObjectId, SchemaId};

/// Row header: version byte + schema id.
pub const HEADER_SIZE: usize = 5;

/// Current wire version.
pub const ROW_VERSION: u8 = 1;

/// Strategy for growing the underlying storage. Implementations must copy
/// the existing content into the returned buffer.
pub trait BufferResizer {
    fn resize(&self, minimum: usize, existing: Vec<u8>) -> Vec<u8>;
}

/// Grows to `max(minimum, existing.len())`, zero-filling new bytes.
#[derive(Debug, Default)]
pub struct DefaultResizer;

impl BufferResizer for DefaultResizer {
    fn resize(&self, minimum: usize, mut existing: Vec<u8>) -> Vec<u8> {
        if existing.len() < minimum {
            existing.resize(minimum, 0);
        }
        existing
    }
}

/// A single row over a growable byte region.
pub struct RowBuffer<'r> {
    pub(crate) buf: Vec<u8>,
    pub(crate) len: usize,
    pub(crate) resolver: &'r dyn LayoutResolver,
    resizer: Box<dyn BufferResizer>,
}

impl<'r> std::fmt::Debug for RowBuffer<'r> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowBuffer")
            .field("len", &self.len)
            .field("capacity", &self.buf.len())
            .finish()
    }
}

impl<'r> RowBuffer<'r> {
    pub fn new(capacity: usize, resolver: &'r dyn LayoutResolver) -> Self {
        Self {
            buf: vec![0; capacity],
            len: 0,
            resolver,
            resizer: Box::new(DefaultResizer),
        }
    }

    pub fn with_resizer(
        capacity: usize,
        resolver: &'r dyn LayoutResolver,
        resizer: Box<dyn BufferResizer>,
    ) -> Self {
        Self {
            buf: vec![0; capacity],
            len: 0,
            resolver,
            resizer,
        }
    }

    /// Attaches to an existing serialized row (byte-for-byte).
    pub fn from_bytes(bytes: Vec<u8>, resolver: &'r dyn LayoutResolver) -> Self {
        let len = bytes.len();
        Self {
            buf: bytes,
            len,
            resolver,
            resizer: Box::new(DefaultResizer),
        }
    }

    /// The serialized row: `[0, length)`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn length(&self) -> usize {
        self.len
    }

    pub fn resolver(&self) -> &'r dyn LayoutResolver {
        self.resolver
    }

    /// Resets the header and zero-fills the fixed region for `layout`,
    /// setting every null bit so a fresh row reads as all-absent.
    pub fn init_layout(&mut self, version: u8, layout: &Layout) {
        let len = HEADER_SIZE + layout.size();
        self.ensure_capacity(len);
        self.buf[..len].fill(0);
        self.len = len;
        self.buf[0] = version;
        self.write_schema_id(layout.schema_id());
        for col in layout.columns() {
            if col.null_bit().is_valid() {
                self.set_bit(HEADER_SIZE, col.null_bit());
            }
        }
    }

    pub fn header_version(&self) -> u8 {
        self.buf[0]
    }

    pub fn read_schema_id(&self) -> SchemaId {
        SchemaId::from_le_bytes(self.buf[1..HEADER_SIZE].try_into().unwrap())
    }

    pub fn write_schema_id(&mut self, schema_id: SchemaId) {
        self.buf[1..HEADER_SIZE].copy_from_slice(&schema_id.to_le_bytes());
    }

    // ---- splice primitive -------------------------------------------------

    /// Opens a `count`-byte gap at `offset`, shifting the tail right. The
    /// gap's content is unspecified; callers overwrite it immediately.
    pub fn insert_bytes(&mut self, offset: usize, count: usize) {
        debug_assert!(offset <= self.len);
        let new_len = self.len + count;
        self.ensure_capacity(new_len);
        self.buf.copy_within(offset..self.len, offset + count);
        self.len = new_len;
    }

    /// Removes `count` bytes at `offset`, shifting the tail left.
    pub fn delete_bytes(&mut self, offset: usize, count: usize) {
        debug_assert!(offset + count <= self.len);
        self.buf.copy_within(offset + count..self.len, offset);
        self.len -= count;
    }

    /// Replaces an `old` byte span at `offset` with a `new`-byte gap,
    /// splicing the difference through the insert/delete primitive.
    pub(crate) fn resize_span(&mut self, offset: usize, old: usize, new: usize) {
        if new > old {
            self.insert_bytes(offset + old, new - old);
        } else if old > new {
            self.delete_bytes(offset + new, old - new);
        }
    }

    pub(crate) fn write_bytes_at(&mut self, offset: usize, bytes: &[u8]) {
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn ensure_capacity(&mut self, needed: usize) {
        if needed > self.buf.len() {
            let existing = std::mem::take(&mut self.buf);
            self.buf = self.resizer.resize(needed, existing);
        }
    }

    // ---- scalar peek/poke -------------------------------------------------

    pub(crate) fn read_u8_at(&self, offset: usize) -> u8 {
        self.buf[offset]
    }

    pub(crate) fn write_u8_at(&mut self, offset: usize, value: u8) {
        self.buf[offset] = value;
    }

    pub(crate) fn read_u16_at(&self, offset: usize) -> u16 {
        u16::from_le_bytes(self.buf[offset..offset + 2].try_into().unwrap())
    }

    pub(crate) fn write_u16_at(&mut self, offset: usize, value: u16) {
        self.buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn read_u32_at(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.buf[offset..offset + 4].try_into().unwrap())
    }

    pub(crate) fn write_u32_at(&mut self, offset: usize, value: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn read_u64_at(&self, offset: usize) -> u64 {
        u64::from_le_bytes(self.buf[offset..offset + 8].try_into().unwrap())
    }

    pub(crate) fn write_u64_at(&mut self, offset: usize, value: u64) {
        self.buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn read_f128_at(&self, offset: usize) -> Float128 {
        Float128::from_le_bytes(self.buf[offset..offset + Float128::SIZE].try_into().unwrap())
    }

    pub(crate) fn write_f128_at(&mut self, offset: usize, value: Float128) {
        self.buf[offset..offset + Float128::SIZE].copy_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn read_object_id_at(&self, offset: usize) -> MongoDbObjectId {
        MongoDbObjectId::from_bytes(
            self.buf[offset..offset + MongoDbObjectId::SIZE]
                .try_into()
                .unwrap(),
        )
    }

    pub(crate) fn write_object_id_at(&mut self, offset: usize, value: MongoDbObjectId) {
        self.buf[offset..offset + MongoDbObjectId::SIZE].copy_from_slice(&value.to_bytes());
    }

    pub(crate) fn read_varuint_at(&self, offset: usize) -> RowResult<(u64, usize)> {
        decode_varuint(&self.buf[offset..self.len]).map_err(|_| RowError::TypeMismatch)
    }

    /// Byte length of the varuint starting at `offset`.
    pub(crate) fn varuint_span_at(&self, offset: usize) -> RowResult<usize> {
        self.read_varuint_at(offset).map(|(_, n)| n)
    }

    /// Rewrites a varuint in place, splicing if its width changes. Returns
    /// the signed length delta.
    pub(crate) fn replace_varuint_at(&mut self, offset: usize, value: u64) -> RowResult<isize> {
        let old = self.varuint_span_at(offset)?;
        let new = varuint_len(value);
        self.resize_span(offset, old, new);
        let mut scratch = [0u8; MAX_VARUINT_LEN];
        let n = encode_varuint(value, &mut scratch);
        self.buf[offset..offset + n].copy_from_slice(&scratch[..n]);
        Ok(new as isize - old as isize)
    }

    // ---- bit vector -------------------------------------------------------

    pub(crate) fn read_bit(&self, scope_start: usize, bit: LayoutBit) -> bool {
        self.buf[scope_start + bit.byte_offset()] & bit.mask() != 0
    }

    pub(crate) fn set_bit(&mut self, scope_start: usize, bit: LayoutBit) {
        self.buf[scope_start + bit.byte_offset()] |= bit.mask();
    }

    pub(crate) fn clear_bit(&mut self, scope_start: usize, bit: LayoutBit) {
        self.buf[scope_start + bit.byte_offset()] &= !bit.mask();
    }

    // ---- fixed columns ----------------------------------------------------

    fn check_fixed(
        &self,
        scope: &RowCursor,
        col: &LayoutColumn,
        code: LayoutType,
    ) -> RowResult<usize> {
        if col.storage() != StorageKind::Fixed || col.type_code() != code {
            return Err(RowError::TypeMismatch);
        }
        Ok(scope.start + col.offset())
    }

    fn fixed_present(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<()> {
        if col.null_bit().is_valid() && self.read_bit(scope.start, col.null_bit()) {
            return Err(RowError::NotFound);
        }
        Ok(())
    }

    fn begin_fixed_write(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        code: LayoutType,
    ) -> RowResult<usize> {
        if scope.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        let offset = self.check_fixed(scope, col, code)?;
        if col.null_bit().is_valid() {
            self.clear_bit(scope.start, col.null_bit());
        }
        Ok(offset)
    }

    pub fn read_fixed_bool(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<bool> {
        self.check_fixed(scope, col, LayoutType::Bool)?;
        self.fixed_present(scope, col)?;
        Ok(self.read_bit(scope.start, col.bool_bit()))
    }

    pub fn write_fixed_bool(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: bool,
    ) -> RowResult<()> {
        self.begin_fixed_write(scope, col, LayoutType::Bool)?;
        if value {
            self.set_bit(scope.start, col.bool_bit());
        } else {
            self.clear_bit(scope.start, col.bool_bit());
        }
        Ok(())
    }

    pub fn read_fixed_i8(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<i8> {
        let offset = self.check_fixed(scope, col, LayoutType::Int8)?;
        self.fixed_present(scope, col)?;
        Ok(self.read_u8_at(offset) as i8)
    }

    pub fn write_fixed_i8(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: i8,
    ) -> RowResult<()> {
        let offset = self.begin_fixed_write(scope, col, LayoutType::Int8)?;
        self.write_u8_at(offset, value as u8);
        Ok(())
    }

    pub fn read_fixed_i16(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<i16> {
        let offset = self.check_fixed(scope, col, LayoutType::Int16)?;
        self.fixed_present(scope, col)?;
        Ok(self.read_u16_at(offset) as i16)
    }

    pub fn write_fixed_i16(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: i16,
    ) -> RowResult<()> {
        let offset = self.begin_fixed_write(scope, col, LayoutType::Int16)?;
        self.write_u16_at(offset, value as u16);
        Ok(())
    }

    pub fn read_fixed_i32(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<i32> {
        let offset = self.check_fixed(scope, col, LayoutType::Int32)?;
        self.fixed_present(scope, col)?;
        Ok(self.read_u32_at(offset) as i32)
    }

    pub fn write_fixed_i32(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: i32,
    ) -> RowResult<()> {
        let offset = self.begin_fixed_write(scope, col, LayoutType::Int32)?;
        self.write_u32_at(offset, value as u32);
        Ok(())
    }

    pub fn read_fixed_i64(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<i64> {
        let offset = self.check_fixed(scope, col, LayoutType::Int64)?;
        self.fixed_present(scope, col)?;
        Ok(self.read_u64_at(offset) as i64)
    }

    pub fn write_fixed_i64(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: i64,
    ) -> RowResult<()> {
        let offset = self.begin_fixed_write(scope, col, LayoutType::Int64)?;
        self.write_u64_at(offset, value as u64);
        Ok(())
    }

    pub fn read_fixed_u8(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<u8> {
        let offset = self.check_fixed(scope, col, LayoutType::UInt8)?;
        self.fixed_present(scope, col)?;
        Ok(self.read_u8_at(offset))
    }

    pub fn write_fixed_u8(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: u8,
    ) -> RowResult<()> {
        let offset = self.begin_fixed_write(scope, col, LayoutType::UInt8)?;
        self.write_u8_at(offset, value);
        Ok(())
    }

    pub fn read_fixed_u16(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<u16> {
        let offset = self.check_fixed(scope, col, LayoutType::UInt16)?;
        self.fixed_present(scope, col)?;
        Ok(self.read_u16_at(offset))
    }

    pub fn write_fixed_u16(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: u16,
    ) -> RowResult<()> {
        let offset = self.begin_fixed_write(scope, col, LayoutType::UInt16)?;
        self.write_u16_at(offset, value);
        Ok(())
    }

    pub fn read_fixed_u32(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<u32> {
        let offset = self.check_fixed(scope, col, LayoutType::UInt32)?;
        self.fixed_present(scope, col)?;
        Ok(self.read_u32_at(offset))
    }

    pub fn write_fixed_u32(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: u32,
    ) -> RowResult<()> {
        let offset = self.begin_fixed_write(scope, col, LayoutType::UInt32)?;
        self.write_u32_at(offset, value);
        Ok(())
    }

    pub fn read_fixed_u64(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<u64> {
        let offset = self.check_fixed(scope, col, LayoutType::UInt64)?;
        self.fixed_present(scope, col)?;
        Ok(self.read_u64_at(offset))
    }

    pub fn write_fixed_u64(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: u64,
    ) -> RowResult<()> {
        let offset = self.begin_fixed_write(scope, col, LayoutType::UInt64)?;
        self.write_u64_at(offset, value);
        Ok(())
    }

    pub fn read_fixed_f32(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<f32> {
        let offset = self.check_fixed(scope, col, LayoutType::Float32)?;
        self.fixed_present(scope, col)?;
        Ok(f32::from_bits(self.read_u32_at(offset)))
    }

    pub fn write_fixed_f32(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: f32,
    ) -> RowResult<()> {
        let offset = self.begin_fixed_write(scope, col, LayoutType::Float32)?;
        self.write_u32_at(offset, value.to_bits());
        Ok(())
    }

    pub fn read_fixed_f64(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<f64> {
        let offset = self.check_fixed(scope, col, LayoutType::Float64)?;
        self.fixed_present(scope, col)?;
        Ok(f64::from_bits(self.read_u64_at(offset)))
    }

    pub fn write_fixed_f64(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: f64,
    ) -> RowResult<()> {
        let offset = self.begin_fixed_write(scope, col, LayoutType::Float64)?;
        self.write_u64_at(offset, value.to_bits());
        Ok(())
    }

    pub fn read_fixed_f128(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<Float128> {
        let offset = self.check_fixed(scope, col, LayoutType::Float128)?;
        self.fixed_present(scope, col)?;
        Ok(self.read_f128_at(offset))
    }

    pub fn write_fixed_f128(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: Float128,
    ) -> RowResult<()> {
        let offset = self.begin_fixed_write(scope, col, LayoutType::Float128)?;
        self.write_f128_at(offset, value);
        Ok(())
    }

    pub fn read_fixed_object_id(
        &self,
        scope: &RowCursor,
        col: &LayoutColumn,
    ) -> RowResult<MongoDbObjectId> {
        let offset = self.check_fixed(scope, col, LayoutType::MongoDbObjectId)?;
        self.fixed_present(scope, col)?;
        Ok(self.read_object_id_at(offset))
    }

    pub fn write_fixed_object_id(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: MongoDbObjectId,
    ) -> RowResult<()> {
        let offset = self.begin_fixed_write(scope, col, LayoutType::MongoDbObjectId)?;
        self.write_object_id_at(offset, value);
        Ok(())
    }

    /// Marks a nullable fixed column absent (its bytes are zeroed). A
    /// non-nullable fixed column has no null bit and cannot be removed.
    pub fn delete_fixed(&mut self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<()> {
        if scope.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        if col.storage() != StorageKind::Fixed {
            return Err(RowError::TypeMismatch);
        }
        if !col.nullable() || !col.null_bit().is_valid() {
            return Err(RowError::TypeMismatch);
        }
        self.set_bit(scope.start, col.null_bit());
        if col.bool_bit().is_valid() {
            self.clear_bit(scope.start, col.bool_bit());
        }
        let offset = scope.start + col.offset();
        let width = col.type_code().fixed_column_size().unwrap_or(0);
        self.buf[offset..offset + width].fill(0);
        Ok(())
    }

    // ---- variable columns -------------------------------------------------

    /// Byte offset of a variable column's value: walks the present variable
    /// columns before `ordinal`, summing their encoded spans.
    pub(crate) fn variable_value_offset(
        &self,
        layout: &Layout,
        scope_start: usize,
        ordinal: usize,
    ) -> RowResult<usize> {
        let mut offset = scope_start + layout.size();
        for col in &layout.variable_columns()[..ordinal] {
            if !self.read_bit(scope_start, col.null_bit()) {
                offset += self.variable_span_at(offset, col.type_code())?;
            }
        }
        Ok(offset)
    }

    /// First byte after a scope's variable region: the sparse region start.
    pub(crate) fn sparse_region_start(
        &self,
        layout: &Layout,
        scope_start: usize,
    ) -> RowResult<usize> {
        self.variable_value_offset(layout, scope_start, layout.num_variable())
    }

    /// Encoded span of one variable value at `offset`.
    pub(crate) fn variable_span_at(&self, offset: usize, code: LayoutType) -> RowResult<usize> {
        match code {
            LayoutType::Utf8 | LayoutType::Binary => {
                let (len, prefix) = self.read_varuint_at(offset)?;
                Ok(prefix + len as usize)
            }
            LayoutType::VarInt | LayoutType::VarUInt => self.varuint_span_at(offset),
            _ => Err(RowError::TypeMismatch),
        }
    }

    fn check_variable(&self, col: &LayoutColumn, code: LayoutType) -> RowResult<()> {
        if col.storage() != StorageKind::Variable || col.type_code() != code {
            return Err(RowError::TypeMismatch);
        }
        Ok(())
    }

    fn read_variable_slice(
        &self,
        scope: &RowCursor,
        col: &LayoutColumn,
        code: LayoutType,
    ) -> RowResult<&[u8]> {
        self.check_variable(col, code)?;
        if self.read_bit(scope.start, col.null_bit()) {
            return Err(RowError::NotFound);
        }
        let offset = self.variable_value_offset(&scope.layout, scope.start, col.ordinal())?;
        let (len, prefix) = self.read_varuint_at(offset)?;
        if offset + prefix + len as usize > self.len {
            return Err(RowError::TypeMismatch);
        }
        Ok(&self.buf[offset + prefix..offset + prefix + len as usize])
    }

    pub fn read_variable_utf8(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<&str> {
        let bytes = self.read_variable_slice(scope, col, LayoutType::Utf8)?;
        std::str::from_utf8(bytes).map_err(|_| RowError::TypeMismatch)
    }

    pub fn read_variable_binary(
        &self,
        scope: &RowCursor,
        col: &LayoutColumn,
    ) -> RowResult<&[u8]> {
        self.read_variable_slice(scope, col, LayoutType::Binary)
    }

    pub fn read_variable_varint(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<i64> {
        self.check_variable(col, LayoutType::VarInt)?;
        if self.read_bit(scope.start, col.null_bit()) {
            return Err(RowError::NotFound);
        }
        let offset = self.variable_value_offset(&scope.layout, scope.start, col.ordinal())?;
        let (raw, _) = self.read_varuint_at(offset)?;
        Ok(crate::encoding::varint::rotate_sign_to_msb(raw))
    }

    pub fn read_variable_varuint(&self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<u64> {
        self.check_variable(col, LayoutType::VarUInt)?;
        if self.read_bit(scope.start, col.null_bit()) {
            return Err(RowError::NotFound);
        }
        let offset = self.variable_value_offset(&scope.layout, scope.start, col.ordinal())?;
        let (raw, _) = self.read_varuint_at(offset)?;
        Ok(raw)
    }

    fn write_variable_raw(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        code: LayoutType,
        encoded: &[u8],
        payload_len: usize,
    ) -> RowResult<()> {
        if scope.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        self.check_variable(col, code)?;
        if let Some(bound) = col.length() {
            if payload_len > bound as usize {
                return Err(RowError::TooBig);
            }
        }
        let offset = self.variable_value_offset(&scope.layout, scope.start, col.ordinal())?;
        let old = if self.read_bit(scope.start, col.null_bit()) {
            0
        } else {
            self.variable_span_at(offset, code)?
        };
        self.resize_span(offset, old, encoded.len());
        self.buf[offset..offset + encoded.len()].copy_from_slice(encoded);
        self.clear_bit(scope.start, col.null_bit());
        Ok(())
    }

    pub fn write_variable_utf8(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: &str,
    ) -> RowResult<()> {
        self.write_variable_binary_impl(scope, col, LayoutType::Utf8, value.as_bytes())
    }

    pub fn write_variable_binary(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: &[u8],
    ) -> RowResult<()> {
        self.write_variable_binary_impl(scope, col, LayoutType::Binary, value)
    }

    fn write_variable_binary_impl(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        code: LayoutType,
        value: &[u8],
    ) -> RowResult<()> {
        let mut encoded = Vec::with_capacity(MAX_VARUINT_LEN + value.len());
        let mut scratch = [0u8; MAX_VARUINT_LEN];
        let n = encode_varuint(value.len() as u64, &mut scratch);
        encoded.extend_from_slice(&scratch[..n]);
        encoded.extend_from_slice(value);
        self.write_variable_raw(scope, col, code, &encoded, value.len())
    }

    pub fn write_variable_varint(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: i64,
    ) -> RowResult<()> {
        let raw = crate::encoding::varint::rotate_sign_to_lsb(value);
        let mut scratch = [0u8; MAX_VARUINT_LEN];
        let n = encode_varuint(raw, &mut scratch);
        self.write_variable_raw(scope, col, LayoutType::VarInt, &scratch[..n], n)
    }

    pub fn write_variable_varuint(
        &mut self,
        scope: &RowCursor,
        col: &LayoutColumn,
        value: u64,
    ) -> RowResult<()> {
        let mut scratch = [0u8; MAX_VARUINT_LEN];
        let n = encode_varuint(value, &mut scratch);
        self.write_variable_raw(scope, col, LayoutType::VarUInt, &scratch[..n], n)
    }

    /// Removes a nullable variable column's value; non-nullable variable
    /// columns may be overwritten but not removed.
    pub fn delete_variable(&mut self, scope: &RowCursor, col: &LayoutColumn) -> RowResult<()> {
        if scope.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        if col.storage() != StorageKind::Variable {
            return Err(RowError::TypeMismatch);
        }
        if !col.nullable() {
            return Err(RowError::TypeMismatch);
        }
        if self.read_bit(scope.start, col.null_bit()) {
            return Ok(());
        }
        let offset = self.variable_value_offset(&scope.layout, scope.start, col.ordinal())?;
        let span = self.variable_span_at(offset, col.type_code())?;
        self.delete_bytes(offset, span);
        self.set_bit(scope.start, col.null_bit());
        Ok(())
    }

    /// Writes the final row length into the layout's `row_buffer_size`
    /// column, if the schema declares one. Call after the row is complete.
    pub fn patch_row_buffer_size(&mut self, root: &RowCursor) -> RowResult<()> {
        if let Some(col) = root.layout.row_buffer_size_column() {
            let col = col.clone();
            self.write_fixed_i32(root, &col, self.len as i32)?;
        }
        Ok(())
    }
}
