//! # Sparse Fields
//!
//! The sparse region is the self-describing tail of a scope. Each field in a
//! path scope (root, Udt, Object) encodes as:
//!
//! ```text
//! +----------------+-----------+------------+---------+
//! | path varuint   | type code | type args  | value   |
//! | token | inline | u8        | scope only |         |
//! +----------------+-----------+------------+---------+
//! ```
//!
//! A path varuint below the layout's token count is a token id; otherwise it
//! is `token_count + byte_len` followed by the UTF-8 path bytes. Untyped
//! Array elements drop the path; typed scope elements drop the code and args
//! too, carrying nothing but the value.
//!
//! Scope values frame themselves: Object/Array/Udt bodies end with an
//! `EndScope` byte, sized scopes (TypedArray/Set/Map) lead with a varuint
//! element count, tuples materialize all arity elements, and Nullable leads
//! with a one-byte presence flag. `sparse_value_end` walks any value to its
//! end from these rules alone, which is what makes in-place splicing of
//! interior fields possible.

use smallvec::SmallVec;

use crate::encoding::varint::{
    encode_varuint, rotate_sign_to_lsb, rotate_sign_to_msb, MAX_VARUINT_LEN,
};
use crate::error::{RowError, RowResult};
use crate::layout::Layout;
use crate::row::buffer::RowBuffer;
use crate::row::cursor::{element_arg, RowCursor};
use crate::types::{Float128, LayoutType, MongoDbObjectId, TypeArgument, TypeArgumentList};

/// How a sparse write treats an existing (or missing) field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOptions {
    /// Overwrite; the field must exist.
    Update,
    /// Create; the field must not exist.
    Insert,
    /// Overwrite or create.
    Upsert,
    /// Insert before the current element of an indexed scope.
    InsertAt,
}

/// Scratch for encoded scalar payloads; spills for long strings.
pub(crate) type PayloadBuf = SmallVec<[u8; 16]>;

pub(crate) fn utf8_payload(value: &str) -> PayloadBuf {
    binary_payload(value.as_bytes())
}

pub(crate) fn binary_payload(value: &[u8]) -> PayloadBuf {
    let mut out = PayloadBuf::new();
    let mut scratch = [0u8; MAX_VARUINT_LEN];
    let n = encode_varuint(value.len() as u64, &mut scratch);
    out.extend_from_slice(&scratch[..n]);
    out.extend_from_slice(value);
    out
}

pub(crate) fn varuint_payload(value: u64) -> PayloadBuf {
    let mut scratch = [0u8; MAX_VARUINT_LEN];
    let n = encode_varuint(value, &mut scratch);
    PayloadBuf::from_slice(&scratch[..n])
}

pub(crate) fn varint_payload(value: i64) -> PayloadBuf {
    varuint_payload(rotate_sign_to_lsb(value))
}

/// A decoded field path: interned token or inline UTF-8 span.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SparsePath {
    Token(u64),
    Inline { offset: usize, len: usize },
}

fn encode_sparse_path(layout: &Layout, path: &str, out: &mut Vec<u8>) {
    let mut scratch = [0u8; MAX_VARUINT_LEN];
    if let Some(token) = layout.token_of(path) {
        let n = encode_varuint(u64::from(token), &mut scratch);
        out.extend_from_slice(&scratch[..n]);
    } else {
        let n = encode_varuint(layout.token_count() + path.len() as u64, &mut scratch);
        out.extend_from_slice(&scratch[..n]);
        out.extend_from_slice(path.as_bytes());
    }
}

/// The declared element type must match the written type exactly, modulo
/// the mutable/immutable twin bit.
fn check_element_type(
    expected: &TypeArgument,
    ty: LayoutType,
    args: &TypeArgumentList,
) -> RowResult<()> {
    if expected.type_code.mutable() != ty.mutable() || &expected.type_args != args {
        return Err(RowError::TypeConstraint);
    }
    Ok(())
}

impl<'r> RowBuffer<'r> {
    // ---- wire walking -------------------------------------------------------

    pub(crate) fn sparse_path_at(
        &self,
        layout: &Layout,
        offset: usize,
    ) -> RowResult<(SparsePath, usize)> {
        let (t, read) = self.read_varuint_at(offset)?;
        if t < layout.token_count() {
            Ok((SparsePath::Token(t), read))
        } else {
            let len = (t - layout.token_count()) as usize;
            if offset + read + len > self.length() {
                return Err(RowError::TypeMismatch);
            }
            Ok((
                SparsePath::Inline {
                    offset: offset + read,
                    len,
                },
                read + len,
            ))
        }
    }

    pub(crate) fn path_matches(&self, parsed: &SparsePath, layout: &Layout, path: &str) -> bool {
        match *parsed {
            SparsePath::Token(t) => layout.token_of(path) == Some(t as u32),
            SparsePath::Inline { offset, len } => {
                &self.as_bytes()[offset..offset + len] == path.as_bytes()
            }
        }
    }

    /// End offset of one value of type `ty` starting at `value`, walking
    /// nested scopes recursively.
    pub(crate) fn sparse_value_end(
        &self,
        layout: &Layout,
        ty: LayoutType,
        args: &TypeArgumentList,
        value: usize,
    ) -> RowResult<usize> {
        use LayoutType::*;
        if let Some(size) = ty.fixed_size() {
            return Ok(value + size);
        }
        match ty.mutable() {
            Utf8 | Binary | VarInt | VarUInt => {
                Ok(value + self.variable_span_at(value, ty.mutable())?)
            }
            Object => self.end_marked_scope_end(layout, true, value),
            Array => self.end_marked_scope_end(layout, false, value),
            Udt => {
                let id = args.schema_id().ok_or(RowError::TypeConstraint)?;
                let inner = self
                    .resolver()
                    .resolve(id)
                    .ok_or(RowError::TypeConstraint)?;
                let body = self.sparse_region_start(&inner, value)?;
                self.end_marked_scope_end(&inner, true, body)
            }
            TypedArray | TypedSet => {
                let (count, read) = self.read_varuint_at(value)?;
                let elem = &args.args()[0];
                let mut off = value + read;
                for _ in 0..count {
                    off = self.sparse_value_end(layout, elem.type_code, &elem.type_args, off)?;
                }
                Ok(off)
            }
            TypedMap => {
                let (count, read) = self.read_varuint_at(value)?;
                let key = &args.args()[0];
                let val = &args.args()[1];
                let mut off = value + read;
                for _ in 0..count {
                    off = self.sparse_value_end(layout, key.type_code, &key.type_args, off)?;
                    off = self.sparse_value_end(layout, val.type_code, &val.type_args, off)?;
                }
                Ok(off)
            }
            TypedTuple | Tagged => {
                let mut off = value;
                for arg in args.args() {
                    off = self.sparse_value_end(layout, arg.type_code, &arg.type_args, off)?;
                }
                Ok(off)
            }
            Nullable => {
                let flag = self.read_u8_at(value);
                if flag == 0 {
                    Ok(value + 1)
                } else {
                    let item = &args.args()[0];
                    self.sparse_value_end(layout, item.type_code, &item.type_args, value + 1)
                }
            }
            _ => Err(RowError::TypeMismatch),
        }
    }

    fn end_marked_scope_end(
        &self,
        layout: &Layout,
        path_scope: bool,
        body: usize,
    ) -> RowResult<usize> {
        let mut off = body;
        loop {
            if off >= self.length() {
                return Err(RowError::TypeMismatch);
            }
            if self.read_u8_at(off) == LayoutType::EndScope.to_u8() {
                return Ok(off + 1);
            }
            off = self.sparse_field_end_at(layout, path_scope, off)?;
        }
    }

    /// End offset of one full field (header + value) starting at `meta`.
    fn sparse_field_end_at(
        &self,
        layout: &Layout,
        path_scope: bool,
        meta: usize,
    ) -> RowResult<usize> {
        let mut off = meta;
        if path_scope {
            let (_, read) = self.sparse_path_at(layout, off)?;
            off += read;
        }
        let code = LayoutType::from_u8(self.read_u8_at(off))?;
        off += 1;
        let (args, read) = TypeArgumentList::decode(code, &self.as_bytes()[off..])?;
        off += read;
        self.sparse_value_end(layout, code, &args, off)
    }

    /// End offset of the field the cursor is on.
    pub(crate) fn sparse_field_end(&self, cur: &RowCursor) -> RowResult<usize> {
        self.sparse_value_end(
            &cur.layout,
            cur.cell_type,
            &cur.cell_type_args,
            cur.value_offset,
        )
    }

    /// Rewrites a sized scope's element count, shifting the cursor's cached
    /// offsets when the count varuint changes width.
    pub(crate) fn bump_scope_count(
        &mut self,
        cur: &mut RowCursor,
        new_count: usize,
    ) -> RowResult<isize> {
        let delta = self.replace_varuint_at(cur.start, new_count as u64)?;
        cur.count = new_count;
        if delta != 0 {
            cur.sparse_start = (cur.sparse_start as isize + delta) as usize;
            cur.meta_offset = (cur.meta_offset as isize + delta) as usize;
            cur.code_offset = (cur.code_offset as isize + delta) as usize;
            cur.value_offset = (cur.value_offset as isize + delta) as usize;
        }
        Ok(delta)
    }

    // ---- write core ---------------------------------------------------------

    pub(crate) fn write_sparse_field(
        &mut self,
        cur: &mut RowCursor,
        ty: LayoutType,
        args: &TypeArgumentList,
        payload: &[u8],
        options: UpdateOptions,
    ) -> RowResult<()> {
        if cur.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        if cur.scope_type.is_unique_scope() {
            let expected = element_arg(cur.scope_type, &cur.scope_type_args, 0)?;
            check_element_type(&expected, ty, args)?;
            if cur.deferred {
                return self.unique_append(cur, ty, args, payload);
            }
            if options == UpdateOptions::InsertAt {
                return Err(RowError::TypeConstraint);
            }
            return self.unique_insert(cur, ty, args, payload, options);
        }
        if cur.scope_type.is_typed_scope() {
            return self.write_typed_element(cur, ty, args, payload, options);
        }
        self.write_untyped_field(cur, ty, args, payload, options)
    }

    fn write_typed_element(
        &mut self,
        cur: &mut RowCursor,
        ty: LayoutType,
        args: &TypeArgumentList,
        payload: &[u8],
        options: UpdateOptions,
    ) -> RowResult<()> {
        use LayoutType::*;
        match cur.scope_type.mutable() {
            TypedArray => {
                let expected = element_arg(cur.scope_type, &cur.scope_type_args, 0)?;
                check_element_type(&expected, ty, args)?;
                if !cur.exists && cur.index < cur.count {
                    self.read_cursor_header(cur)?;
                }
                if cur.exists {
                    match options {
                        UpdateOptions::Insert | UpdateOptions::InsertAt => {
                            let new_count = cur.count + 1;
                            self.bump_scope_count(cur, new_count)?;
                            self.insert_bytes(cur.meta_offset, payload.len());
                            self.write_bytes_at(cur.meta_offset, payload);
                        }
                        UpdateOptions::Update | UpdateOptions::Upsert => {
                            let old = self.sparse_field_end(cur)? - cur.value_offset;
                            self.resize_span(cur.value_offset, old, payload.len());
                            self.write_bytes_at(cur.value_offset, payload);
                        }
                    }
                } else {
                    // Cursor rests at the append point (index == count).
                    if options == UpdateOptions::Update {
                        return Err(RowError::NotFound);
                    }
                    let new_count = cur.count + 1;
                    self.bump_scope_count(cur, new_count)?;
                    self.insert_bytes(cur.meta_offset, payload.len());
                    self.write_bytes_at(cur.meta_offset, payload);
                }
                cur.code_offset = cur.meta_offset;
                cur.value_offset = cur.meta_offset;
            }
            TypedTuple | Tagged => {
                if !cur.exists && cur.index < cur.count {
                    self.read_cursor_header(cur)?;
                }
                if !cur.exists {
                    return Err(RowError::NotFound);
                }
                let expected = element_arg(cur.scope_type, &cur.scope_type_args, cur.index)?;
                check_element_type(&expected, ty, args)?;
                match options {
                    UpdateOptions::Insert => return Err(RowError::Exists),
                    UpdateOptions::InsertAt => return Err(RowError::TypeConstraint),
                    UpdateOptions::Update | UpdateOptions::Upsert => {
                        let old = self.sparse_field_end(cur)? - cur.value_offset;
                        self.resize_span(cur.value_offset, old, payload.len());
                        self.write_bytes_at(cur.value_offset, payload);
                    }
                }
            }
            Nullable => {
                let expected = element_arg(cur.scope_type, &cur.scope_type_args, 0)?;
                check_element_type(&expected, ty, args)?;
                if options == UpdateOptions::InsertAt {
                    return Err(RowError::TypeConstraint);
                }
                if cur.count == 1 {
                    if options == UpdateOptions::Insert {
                        return Err(RowError::Exists);
                    }
                    let old = self.sparse_value_end(
                        &cur.layout,
                        expected.type_code,
                        &expected.type_args,
                        cur.sparse_start,
                    )? - cur.sparse_start;
                    self.resize_span(cur.sparse_start, old, payload.len());
                    self.write_bytes_at(cur.sparse_start, payload);
                } else {
                    if options == UpdateOptions::Update {
                        return Err(RowError::NotFound);
                    }
                    self.write_u8_at(cur.start, 1);
                    self.insert_bytes(cur.sparse_start, payload.len());
                    self.write_bytes_at(cur.sparse_start, payload);
                    cur.count = 1;
                }
                cur.index = 0;
                cur.meta_offset = cur.sparse_start;
                cur.code_offset = cur.sparse_start;
                cur.value_offset = cur.sparse_start;
            }
            _ => return Err(RowError::TypeConstraint),
        }
        cur.cell_type = ty;
        cur.cell_type_args = args.clone();
        cur.exists = true;
        Ok(())
    }

    fn write_untyped_field(
        &mut self,
        cur: &mut RowCursor,
        ty: LayoutType,
        args: &TypeArgumentList,
        payload: &[u8],
        options: UpdateOptions,
    ) -> RowResult<()> {
        let path_scope = cur.scope_type.is_path_scope();
        if path_scope && options == UpdateOptions::InsertAt {
            return Err(RowError::TypeConstraint);
        }
        if cur.exists {
            match options {
                UpdateOptions::Insert if path_scope => return Err(RowError::Exists),
                UpdateOptions::Insert | UpdateOptions::InsertAt => {
                    // Untyped array: insert before the current element.
                    let mut field = Vec::with_capacity(1 + payload.len());
                    field.push(ty.to_u8());
                    args.encode(ty, &mut field);
                    let header = field.len();
                    field.extend_from_slice(payload);
                    self.insert_bytes(cur.meta_offset, field.len());
                    self.write_bytes_at(cur.meta_offset, &field);
                    cur.code_offset = cur.meta_offset;
                    cur.value_offset = cur.meta_offset + header;
                }
                UpdateOptions::Update | UpdateOptions::Upsert => {
                    // Replace code, args, and value; the path bytes stay.
                    let end = self.sparse_field_end(cur)?;
                    let mut field = Vec::with_capacity(1 + payload.len());
                    field.push(ty.to_u8());
                    args.encode(ty, &mut field);
                    let header = field.len();
                    field.extend_from_slice(payload);
                    self.resize_span(cur.code_offset, end - cur.code_offset, field.len());
                    self.write_bytes_at(cur.code_offset, &field);
                    cur.value_offset = cur.code_offset + header;
                }
            }
        } else {
            if options == UpdateOptions::Update {
                return Err(RowError::NotFound);
            }
            let mut field = Vec::with_capacity(1 + payload.len());
            if path_scope {
                let path = cur.write_path.take().ok_or(RowError::NotFound)?;
                encode_sparse_path(&cur.layout, &path, &mut field);
            }
            let path_len = field.len();
            field.push(ty.to_u8());
            args.encode(ty, &mut field);
            let header = field.len();
            field.extend_from_slice(payload);
            self.insert_bytes(cur.meta_offset, field.len());
            self.write_bytes_at(cur.meta_offset, &field);
            cur.code_offset = cur.meta_offset + path_len;
            cur.value_offset = cur.meta_offset + header;
        }
        cur.cell_type = ty;
        cur.cell_type_args = args.clone();
        cur.exists = true;
        Ok(())
    }

    // ---- scopes ---------------------------------------------------------------

    /// Writes a nested scope field initialized to its default (empty) body
    /// and returns a cursor positioned inside it. Unique scopes accept new
    /// scope-typed elements only in deferred mode, where appended elements
    /// are re-sorted by `typed_collection_unique_index_rebuild`.
    pub fn write_scope(
        &mut self,
        cur: &mut RowCursor,
        scope: LayoutType,
        args: &TypeArgumentList,
        options: UpdateOptions,
    ) -> RowResult<RowCursor> {
        if !scope.is_scope() {
            return Err(RowError::TypeConstraint);
        }
        args.validate_for(scope)?;
        if cur.scope_type.is_unique_scope() && !cur.deferred {
            return Err(RowError::TypeConstraint);
        }
        let body = self.default_scope_body(scope, args)?;
        self.write_sparse_field(cur, scope, args, &body, options)?;
        self.scope_cursor(cur, scope, args.clone(), cur.value_offset)
    }

    /// Default (empty) body for a scope of type `scope`: terminator byte,
    /// zero count, zeroed Udt fixed region, or default-valued tuple.
    pub(crate) fn default_scope_body(
        &self,
        scope: LayoutType,
        args: &TypeArgumentList,
    ) -> RowResult<Vec<u8>> {
        let mut out = Vec::new();
        self.push_default_scope_body(scope, args, &mut out)?;
        Ok(out)
    }

    fn push_default_scope_body(
        &self,
        scope: LayoutType,
        args: &TypeArgumentList,
        out: &mut Vec<u8>,
    ) -> RowResult<()> {
        use LayoutType::*;
        match scope.mutable() {
            Object | Array => out.push(EndScope.to_u8()),
            Udt => {
                let id = args.schema_id().ok_or(RowError::TypeConstraint)?;
                let layout = self
                    .resolver()
                    .resolve(id)
                    .ok_or(RowError::TypeConstraint)?;
                let base = out.len();
                out.resize(base + layout.size(), 0);
                for col in layout.columns() {
                    if col.null_bit().is_valid() {
                        out[base + col.null_bit().byte_offset()] |= col.null_bit().mask();
                    }
                }
                out.push(EndScope.to_u8());
            }
            TypedArray | TypedSet | TypedMap => out.push(0),
            TypedTuple | Tagged => {
                for arg in args.args() {
                    self.push_default_value(arg, out)?;
                }
            }
            Nullable => out.push(0),
            _ => return Err(RowError::TypeConstraint),
        }
        Ok(())
    }

    fn push_default_value(&self, arg: &TypeArgument, out: &mut Vec<u8>) -> RowResult<()> {
        use LayoutType::*;
        if arg.type_code.is_scope() {
            return self.push_default_scope_body(arg.type_code, &arg.type_args, out);
        }
        match arg.type_code {
            Utf8 | Binary | VarInt | VarUInt => out.push(0),
            other => {
                let size = other.fixed_size().ok_or(RowError::TypeConstraint)?;
                out.resize(out.len() + size, 0);
            }
        }
        Ok(())
    }

    /// Removes the field the cursor is on; removing an absent field is a
    /// no-op. Tuple elements always exist and cannot be removed.
    pub fn delete_sparse(&mut self, cur: &mut RowCursor) -> RowResult<()> {
        if cur.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        if !cur.exists {
            return Ok(());
        }
        if cur.scope_type.is_tuple_scope() {
            return Err(RowError::TypeConstraint);
        }
        if cur.scope_type.is_nullable_scope() {
            let end = self.sparse_field_end(cur)?;
            self.delete_bytes(cur.sparse_start, end - cur.sparse_start);
            self.write_u8_at(cur.start, 0);
            cur.count = 0;
            cur.meta_offset = cur.sparse_start;
            cur.exists = false;
            return Ok(());
        }
        let end = self.sparse_field_end(cur)?;
        self.delete_bytes(cur.meta_offset, end - cur.meta_offset);
        cur.exists = false;
        if cur.scope_type.is_counted_scope() {
            let new_count = cur.count - 1;
            self.bump_scope_count(cur, new_count)?;
        }
        Ok(())
    }

    /// `delete_sparse` restricted to scope-typed fields.
    pub fn delete_scope(&mut self, cur: &mut RowCursor) -> RowResult<()> {
        if cur.exists && !cur.cell_type.is_scope() {
            return Err(RowError::TypeMismatch);
        }
        self.delete_sparse(cur)
    }

    // ---- scalar reads -----------------------------------------------------------

    fn sparse_read_check(&self, cur: &RowCursor, ty: LayoutType) -> RowResult<usize> {
        if !cur.exists {
            return Err(RowError::NotFound);
        }
        if cur.cell_type != ty {
            return Err(RowError::TypeMismatch);
        }
        Ok(cur.value_offset)
    }

    pub fn read_sparse_null(&self, cur: &RowCursor) -> RowResult<()> {
        self.sparse_read_check(cur, LayoutType::Null)?;
        Ok(())
    }

    pub fn read_sparse_bool(&self, cur: &RowCursor) -> RowResult<bool> {
        let offset = self.sparse_read_check(cur, LayoutType::Bool)?;
        Ok(self.read_u8_at(offset) != 0)
    }

    pub fn read_sparse_i8(&self, cur: &RowCursor) -> RowResult<i8> {
        let offset = self.sparse_read_check(cur, LayoutType::Int8)?;
        Ok(self.read_u8_at(offset) as i8)
    }

    pub fn read_sparse_i16(&self, cur: &RowCursor) -> RowResult<i16> {
        let offset = self.sparse_read_check(cur, LayoutType::Int16)?;
        Ok(self.read_u16_at(offset) as i16)
    }

    pub fn read_sparse_i32(&self, cur: &RowCursor) -> RowResult<i32> {
        let offset = self.sparse_read_check(cur, LayoutType::Int32)?;
        Ok(self.read_u32_at(offset) as i32)
    }

    pub fn read_sparse_i64(&self, cur: &RowCursor) -> RowResult<i64> {
        let offset = self.sparse_read_check(cur, LayoutType::Int64)?;
        Ok(self.read_u64_at(offset) as i64)
    }

    pub fn read_sparse_u8(&self, cur: &RowCursor) -> RowResult<u8> {
        let offset = self.sparse_read_check(cur, LayoutType::UInt8)?;
        Ok(self.read_u8_at(offset))
    }

    pub fn read_sparse_u16(&self, cur: &RowCursor) -> RowResult<u16> {
        let offset = self.sparse_read_check(cur, LayoutType::UInt16)?;
        Ok(self.read_u16_at(offset))
    }

    pub fn read_sparse_u32(&self, cur: &RowCursor) -> RowResult<u32> {
        let offset = self.sparse_read_check(cur, LayoutType::UInt32)?;
        Ok(self.read_u32_at(offset))
    }

    pub fn read_sparse_u64(&self, cur: &RowCursor) -> RowResult<u64> {
        let offset = self.sparse_read_check(cur, LayoutType::UInt64)?;
        Ok(self.read_u64_at(offset))
    }

    pub fn read_sparse_varint(&self, cur: &RowCursor) -> RowResult<i64> {
        let offset = self.sparse_read_check(cur, LayoutType::VarInt)?;
        let (raw, _) = self.read_varuint_at(offset)?;
        Ok(rotate_sign_to_msb(raw))
    }

    pub fn read_sparse_varuint(&self, cur: &RowCursor) -> RowResult<u64> {
        let offset = self.sparse_read_check(cur, LayoutType::VarUInt)?;
        let (raw, _) = self.read_varuint_at(offset)?;
        Ok(raw)
    }

    pub fn read_sparse_f32(&self, cur: &RowCursor) -> RowResult<f32> {
        let offset = self.sparse_read_check(cur, LayoutType::Float32)?;
        Ok(f32::from_bits(self.read_u32_at(offset)))
    }

    pub fn read_sparse_f64(&self, cur: &RowCursor) -> RowResult<f64> {
        let offset = self.sparse_read_check(cur, LayoutType::Float64)?;
        Ok(f64::from_bits(self.read_u64_at(offset)))
    }

    pub fn read_sparse_f128(&self, cur: &RowCursor) -> RowResult<Float128> {
        let offset = self.sparse_read_check(cur, LayoutType::Float128)?;
        Ok(self.read_f128_at(offset))
    }

    pub fn read_sparse_object_id(&self, cur: &RowCursor) -> RowResult<MongoDbObjectId> {
        let offset = self.sparse_read_check(cur, LayoutType::MongoDbObjectId)?;
        Ok(self.read_object_id_at(offset))
    }

    pub fn read_sparse_utf8(&self, cur: &RowCursor) -> RowResult<&str> {
        let offset = self.sparse_read_check(cur, LayoutType::Utf8)?;
        let (len, read) = self.read_varuint_at(offset)?;
        let bytes = self
            .as_bytes()
            .get(offset + read..offset + read + len as usize)
            .ok_or(RowError::TypeMismatch)?;
        std::str::from_utf8(bytes).map_err(|_| RowError::TypeMismatch)
    }

    pub fn read_sparse_binary(&self, cur: &RowCursor) -> RowResult<&[u8]> {
        let offset = self.sparse_read_check(cur, LayoutType::Binary)?;
        let (len, read) = self.read_varuint_at(offset)?;
        self.as_bytes()
            .get(offset + read..offset + read + len as usize)
            .ok_or(RowError::TypeMismatch)
    }

    // ---- scalar writes ------------------------------------------------------------

    pub fn write_sparse_null(
        &mut self,
        cur: &mut RowCursor,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(cur, LayoutType::Null, &TypeArgumentList::empty(), &[], options)
    }

    pub fn write_sparse_bool(
        &mut self,
        cur: &mut RowCursor,
        value: bool,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::Bool,
            &TypeArgumentList::empty(),
            &[u8::from(value)],
            options,
        )
    }

    pub fn write_sparse_i8(
        &mut self,
        cur: &mut RowCursor,
        value: i8,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::Int8,
            &TypeArgumentList::empty(),
            &value.to_le_bytes(),
            options,
        )
    }

    pub fn write_sparse_i16(
        &mut self,
        cur: &mut RowCursor,
        value: i16,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::Int16,
            &TypeArgumentList::empty(),
            &value.to_le_bytes(),
            options,
        )
    }

    pub fn write_sparse_i32(
        &mut self,
        cur: &mut RowCursor,
        value: i32,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::Int32,
            &TypeArgumentList::empty(),
            &value.to_le_bytes(),
            options,
        )
    }

    pub fn write_sparse_i64(
        &mut self,
        cur: &mut RowCursor,
        value: i64,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::Int64,
            &TypeArgumentList::empty(),
            &value.to_le_bytes(),
            options,
        )
    }

    pub fn write_sparse_u8(
        &mut self,
        cur: &mut RowCursor,
        value: u8,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::UInt8,
            &TypeArgumentList::empty(),
            &[value],
            options,
        )
    }

    pub fn write_sparse_u16(
        &mut self,
        cur: &mut RowCursor,
        value: u16,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::UInt16,
            &TypeArgumentList::empty(),
            &value.to_le_bytes(),
            options,
        )
    }

    pub fn write_sparse_u32(
        &mut self,
        cur: &mut RowCursor,
        value: u32,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::UInt32,
            &TypeArgumentList::empty(),
            &value.to_le_bytes(),
            options,
        )
    }

    pub fn write_sparse_u64(
        &mut self,
        cur: &mut RowCursor,
        value: u64,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::UInt64,
            &TypeArgumentList::empty(),
            &value.to_le_bytes(),
            options,
        )
    }

    pub fn write_sparse_varint(
        &mut self,
        cur: &mut RowCursor,
        value: i64,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::VarInt,
            &TypeArgumentList::empty(),
            &varint_payload(value),
            options,
        )
    }

    pub fn write_sparse_varuint(
        &mut self,
        cur: &mut RowCursor,
        value: u64,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::VarUInt,
            &TypeArgumentList::empty(),
            &varuint_payload(value),
            options,
        )
    }

    pub fn write_sparse_f32(
        &mut self,
        cur: &mut RowCursor,
        value: f32,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::Float32,
            &TypeArgumentList::empty(),
            &value.to_bits().to_le_bytes(),
            options,
        )
    }

    pub fn write_sparse_f64(
        &mut self,
        cur: &mut RowCursor,
        value: f64,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::Float64,
            &TypeArgumentList::empty(),
            &value.to_bits().to_le_bytes(),
            options,
        )
    }

    pub fn write_sparse_f128(
        &mut self,
        cur: &mut RowCursor,
        value: Float128,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::Float128,
            &TypeArgumentList::empty(),
            &value.to_le_bytes(),
            options,
        )
    }

    pub fn write_sparse_object_id(
        &mut self,
        cur: &mut RowCursor,
        value: MongoDbObjectId,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::MongoDbObjectId,
            &TypeArgumentList::empty(),
            &value.to_bytes(),
            options,
        )
    }

    pub fn write_sparse_utf8(
        &mut self,
        cur: &mut RowCursor,
        value: &str,
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::Utf8,
            &TypeArgumentList::empty(),
            &utf8_payload(value),
            options,
        )
    }

    pub fn write_sparse_binary(
        &mut self,
        cur: &mut RowCursor,
        value: &[u8],
        options: UpdateOptions,
    ) -> RowResult<()> {
        self.write_sparse_field(
            cur,
            LayoutType::Binary,
            &TypeArgumentList::empty(),
            &binary_payload(value),
            options,
        )
    }
}
