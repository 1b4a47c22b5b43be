//! # Unique Scopes
//!
//! TypedSet and TypedMap keep their elements sorted by encoded bytes with no
//! duplicates, so membership checks binary-search the element index instead
//! of scanning. Map entries compare as whole key/value tuple encodings.
//!
//! Scalar elements insert directly in sorted position. Scope-typed elements
//! (map entries, sets of tuples) cannot be built in place without breaking
//! the order invariant mid-edit; they are staged as an ordinary sparse field
//! elsewhere in the row and spliced into position with
//! `typed_collection_move_field`. Alternatively a scope cursor in deferred
//! mode appends out of order and `typed_collection_unique_index_rebuild`
//! restores the invariant in one pass.

use crate::error::{RowError, RowResult};
use crate::row::buffer::RowBuffer;
use crate::row::cursor::{element_arg, RowCursor};
use crate::row::sparse::{
    binary_payload, utf8_payload, varint_payload, varuint_payload, UpdateOptions,
};
use crate::types::{LayoutType, TypeArgumentList};
use tracing::trace;

impl<'r> RowBuffer<'r> {
    /// Byte ranges of every element in a unique scope, in wire order.
    fn unique_element_ranges(&self, scope: &RowCursor) -> RowResult<Vec<(usize, usize)>> {
        let elem = element_arg(scope.scope_type, &scope.scope_type_args, 0)?;
        let mut ranges = Vec::with_capacity(scope.count);
        let mut off = scope.sparse_start;
        for _ in 0..scope.count {
            let end = self.sparse_value_end(&scope.layout, elem.type_code, &elem.type_args, off)?;
            ranges.push((off, end));
            off = end;
        }
        Ok(ranges)
    }

    /// Binary search over sorted elements. `Ok` holds the matching range
    /// index, `Err` the insertion position.
    fn unique_search(
        &self,
        ranges: &[(usize, usize)],
        needle: &[u8],
    ) -> Result<usize, usize> {
        ranges.binary_search_by(|&(s, e)| self.as_bytes()[s..e].cmp(needle))
    }

    fn position_on_element(
        &self,
        scope: &mut RowCursor,
        index: usize,
        offset: usize,
        ty: LayoutType,
        args: &TypeArgumentList,
    ) {
        scope.index = index;
        scope.meta_offset = offset;
        scope.code_offset = offset;
        scope.value_offset = offset;
        scope.cell_type = ty;
        scope.cell_type_args = args.clone();
        scope.exists = true;
    }

    /// Inserts `payload` in sorted position, or replaces the equal element.
    pub(crate) fn unique_insert(
        &mut self,
        scope: &mut RowCursor,
        ty: LayoutType,
        args: &TypeArgumentList,
        payload: &[u8],
        options: UpdateOptions,
    ) -> RowResult<()> {
        let ranges = self.unique_element_ranges(scope)?;
        match self.unique_search(&ranges, payload) {
            Ok(i) => {
                if options == UpdateOptions::Insert {
                    return Err(RowError::Exists);
                }
                let (s, e) = ranges[i];
                self.resize_span(s, e - s, payload.len());
                self.write_bytes_at(s, payload);
                self.position_on_element(scope, i, s, ty, args);
            }
            Err(i) => {
                if options == UpdateOptions::Update {
                    return Err(RowError::NotFound);
                }
                let pos = ranges
                    .get(i)
                    .map(|&(s, _)| s)
                    .unwrap_or_else(|| ranges.last().map_or(scope.sparse_start, |&(_, e)| e));
                let new_count = scope.count + 1;
                let delta = self.bump_scope_count(scope, new_count)?;
                let pos = (pos as isize + delta) as usize;
                self.insert_bytes(pos, payload.len());
                self.write_bytes_at(pos, payload);
                self.position_on_element(scope, i, pos, ty, args);
            }
        }
        Ok(())
    }

    /// Deferred-mode write: appends past the last element without sorting.
    pub(crate) fn unique_append(
        &mut self,
        scope: &mut RowCursor,
        ty: LayoutType,
        args: &TypeArgumentList,
        payload: &[u8],
    ) -> RowResult<()> {
        let ranges = self.unique_element_ranges(scope)?;
        let pos = ranges.last().map_or(scope.sparse_start, |&(_, e)| e);
        let index = scope.count;
        let new_count = scope.count + 1;
        let delta = self.bump_scope_count(scope, new_count)?;
        let pos = (pos as isize + delta) as usize;
        self.insert_bytes(pos, payload.len());
        self.write_bytes_at(pos, payload);
        self.position_on_element(scope, index, pos, ty, args);
        Ok(())
    }

    /// Splices a staged field into a unique scope in sorted position. The
    /// staged field must live in an end-marked scope of the same row (the
    /// root is the usual staging ground); it is removed whether or not the
    /// insertion succeeds.
    pub fn typed_collection_move_field(
        &mut self,
        scope: &mut RowCursor,
        src: &mut RowCursor,
        options: UpdateOptions,
    ) -> RowResult<()> {
        if !scope.scope_type.is_unique_scope() {
            return Err(RowError::TypeConstraint);
        }
        if scope.immutable || src.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        if options == UpdateOptions::InsertAt {
            return Err(RowError::TypeConstraint);
        }
        if !src.scope_type.is_end_marked_scope() {
            return Err(RowError::TypeConstraint);
        }
        if !src.exists {
            return Err(RowError::NotFound);
        }
        let expected = element_arg(scope.scope_type, &scope.scope_type_args, 0)?;
        if expected.type_code.mutable() != src.cell_type.mutable()
            || expected.type_args != src.cell_type_args
        {
            return Err(RowError::TypeConstraint);
        }
        let ty = src.cell_type;
        let args = src.cell_type_args.clone();
        let end = self.sparse_field_end(src)?;
        let payload = self.as_bytes()[src.value_offset..end].to_vec();

        // Remove the staged field first so the scope's offsets shift once.
        let span = end - src.meta_offset;
        self.delete_bytes(src.meta_offset, span);
        if src.meta_offset < scope.start {
            scope.start -= span;
            scope.sparse_start -= span;
            scope.meta_offset -= span;
            scope.code_offset -= span;
            scope.value_offset -= span;
        }
        src.exists = false;

        if scope.deferred {
            self.unique_append(scope, ty, &args, &payload)
        } else {
            self.unique_insert(scope, ty, &args, &payload, options)
        }
    }

    /// Restores the sorted-unique invariant after deferred appends. Fails
    /// with `Exists` when two elements compare equal; element bytes are
    /// reordered in place and the total scope size never changes.
    pub fn typed_collection_unique_index_rebuild(
        &mut self,
        scope: &mut RowCursor,
    ) -> RowResult<()> {
        if !scope.scope_type.is_unique_scope() {
            return Err(RowError::TypeConstraint);
        }
        if scope.immutable {
            return Err(RowError::InsufficientPermissions);
        }
        let ranges = self.unique_element_ranges(scope)?;
        let mut elements: Vec<Vec<u8>> = ranges
            .iter()
            .map(|&(s, e)| self.as_bytes()[s..e].to_vec())
            .collect();
        elements.sort_unstable();
        trace!(count = elements.len(), "rebuilding unique index");
        for pair in elements.windows(2) {
            if pair[0] == pair[1] {
                return Err(RowError::Exists);
            }
        }
        let mut off = scope.sparse_start;
        for element in &elements {
            self.write_bytes_at(off, element);
            off += element.len();
        }
        scope.deferred = false;
        scope.rewind();
        Ok(())
    }

    /// Positions `scope` on the element equal to `needle` (encoded element
    /// bytes), or at its sorted insertion point when absent.
    pub(crate) fn typed_collection_find(
        &self,
        scope: &mut RowCursor,
        needle: &[u8],
    ) -> RowResult<bool> {
        if !scope.scope_type.is_unique_scope() {
            return Err(RowError::TypeConstraint);
        }
        let elem = element_arg(scope.scope_type, &scope.scope_type_args, 0)?;
        let ranges = self.unique_element_ranges(scope)?;
        match self.unique_search(&ranges, needle) {
            Ok(i) => {
                let (s, _) = ranges[i];
                self.position_on_element(scope, i, s, elem.type_code, &elem.type_args);
                Ok(true)
            }
            Err(i) => {
                let pos = ranges
                    .get(i)
                    .map(|&(s, _)| s)
                    .unwrap_or_else(|| ranges.last().map_or(scope.sparse_start, |&(_, e)| e));
                scope.index = i;
                scope.meta_offset = pos;
                scope.exists = false;
                Ok(false)
            }
        }
    }

    pub fn typed_collection_find_i32(
        &self,
        scope: &mut RowCursor,
        value: i32,
    ) -> RowResult<bool> {
        self.typed_collection_find(scope, &value.to_le_bytes())
    }

    pub fn typed_collection_find_i64(
        &self,
        scope: &mut RowCursor,
        value: i64,
    ) -> RowResult<bool> {
        self.typed_collection_find(scope, &value.to_le_bytes())
    }

    pub fn typed_collection_find_u64(
        &self,
        scope: &mut RowCursor,
        value: u64,
    ) -> RowResult<bool> {
        self.typed_collection_find(scope, &value.to_le_bytes())
    }

    pub fn typed_collection_find_varint(
        &self,
        scope: &mut RowCursor,
        value: i64,
    ) -> RowResult<bool> {
        self.typed_collection_find(scope, &varint_payload(value))
    }

    pub fn typed_collection_find_varuint(
        &self,
        scope: &mut RowCursor,
        value: u64,
    ) -> RowResult<bool> {
        self.typed_collection_find(scope, &varuint_payload(value))
    }

    pub fn typed_collection_find_utf8(
        &self,
        scope: &mut RowCursor,
        value: &str,
    ) -> RowResult<bool> {
        self.typed_collection_find(scope, &utf8_payload(value))
    }

    pub fn typed_collection_find_binary(
        &self,
        scope: &mut RowCursor,
        value: &[u8],
    ) -> RowResult<bool> {
        self.typed_collection_find(scope, &binary_payload(value))
    }
}
