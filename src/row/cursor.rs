//! # RowCursor - Scope Navigation
//!
//! A `RowCursor` is a lightweight value positioned inside one scope of a
//! row: the root schema scope, or any nested sparse scope reached through
//! `read_scope` / `write_scope`. It caches the offsets needed to read or
//! mutate the field under it without re-walking the row.
//!
//! ## Position Model
//!
//! A cursor is either ON a present field (`exists == true`, with
//! `value_offset` and the decoded cell type valid) or AT an insertion point
//! (`exists == false`, `meta_offset` marks where a new field would land).
//! `move_next` steps fields in wire order; `find` scans a path scope for a
//! named field, leaving the cursor at the append point with the pending
//! path recorded when the field is absent; `move_to` positions an indexed
//! scope on element `i`, rewinding to the scope start when the target is
//! behind the cursor.
//!
//! All navigation lives on `RowBuffer` because every step reads the wire;
//! the cursor itself holds no buffer reference and is freely copyable.
//! Cursors not threaded through a mutation become stale at and beyond the
//! mutation point and must be re-derived.

use std::sync::Arc;

use crate::error::{RowError, RowResult};
use crate::layout::Layout;
use crate::row::buffer::{RowBuffer, HEADER_SIZE};
use crate::types::{LayoutType, TypeArgument, TypeArgumentList};

/// A position within one scope of a row.
#[derive(Debug, Clone)]
pub struct RowCursor {
    pub(crate) layout: Arc<Layout>,
    pub(crate) scope_type: LayoutType,
    pub(crate) scope_type_args: TypeArgumentList,
    /// Scope value start (bit region for Udt scopes, count for sized ones).
    pub(crate) start: usize,
    /// First field/element position within the scope.
    pub(crate) sparse_start: usize,
    pub(crate) immutable: bool,
    /// Unique-index maintenance deferred until an explicit rebuild.
    pub(crate) deferred: bool,
    /// Element count for sized scopes; arity for tuples; presence flag (0/1)
    /// for Nullable. Unused for end-marked scopes.
    pub(crate) count: usize,
    pub(crate) index: usize,
    pub(crate) exists: bool,
    pub(crate) meta_offset: usize,
    pub(crate) code_offset: usize,
    pub(crate) value_offset: usize,
    pub(crate) cell_type: LayoutType,
    pub(crate) cell_type_args: TypeArgumentList,
    /// Path recorded by a failed `find`, pending insertion.
    pub(crate) write_path: Option<String>,
}

impl RowCursor {
    /// Attaches a cursor to the root scope of `row`, resolving the header's
    /// schema id through the buffer's resolver.
    pub fn create(row: &RowBuffer<'_>) -> RowResult<RowCursor> {
        let schema_id = row.read_schema_id();
        let layout = row
            .resolver()
            .resolve(schema_id)
            .ok_or(RowError::TypeConstraint)?;
        let sparse_start = row.sparse_region_start(&layout, HEADER_SIZE)?;
        Ok(RowCursor {
            scope_type: LayoutType::Udt,
            scope_type_args: TypeArgumentList::for_udt(schema_id),
            start: HEADER_SIZE,
            sparse_start,
            immutable: false,
            deferred: false,
            count: 0,
            index: 0,
            exists: false,
            meta_offset: sparse_start,
            code_offset: sparse_start,
            value_offset: sparse_start,
            cell_type: LayoutType::EndScope,
            cell_type_args: TypeArgumentList::empty(),
            write_path: None,
            layout,
        })
    }

    /// Root cursor positioned directly at the row's end with `path` pending,
    /// skipping the scan `find` would perform. Only correct when the caller
    /// knows `path` is not already present.
    pub fn create_for_append(row: &RowBuffer<'_>, path: &str) -> RowResult<RowCursor> {
        let mut cur = Self::create(row)?;
        cur.meta_offset = row.length();
        cur.write_path = Some(path.to_string());
        Ok(cur)
    }

    pub fn scope_type(&self) -> LayoutType {
        self.scope_type
    }

    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    /// Type of the field the cursor is on; meaningful only when `exists`.
    pub fn cell_type(&self) -> LayoutType {
        self.cell_type
    }

    pub fn cell_type_args(&self) -> &TypeArgumentList {
        &self.cell_type_args
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// A read-only view of this position: every mutation through the
    /// returned cursor (and its children) fails with
    /// `InsufficientPermissions`.
    pub fn as_read_only(&self) -> RowCursor {
        let mut cur = self.clone();
        cur.immutable = true;
        cur
    }

    /// Suspends sorted-order maintenance on a unique scope: writes append
    /// instead of inserting in order, until
    /// `typed_collection_unique_index_rebuild` restores the index.
    pub fn defer_unique_index(mut self) -> RowCursor {
        self.deferred = true;
        self
    }

    pub(crate) fn rewind(&mut self) {
        self.meta_offset = self.sparse_start;
        self.index = 0;
        self.exists = false;
    }
}

/// Element parameterization at `index` of a typed scope. Map elements read
/// as key/value tuples.
pub(crate) fn element_arg(
    scope: LayoutType,
    args: &TypeArgumentList,
    index: usize,
) -> RowResult<TypeArgument> {
    use LayoutType::*;
    match scope.mutable() {
        TypedArray | TypedSet | Nullable => Ok(args.args()[0].clone()),
        TypedMap => Ok(TypeArgument::with_args(
            TypedTuple,
            TypeArgumentList::new(args.args().to_vec()),
        )),
        TypedTuple | Tagged => args
            .args()
            .get(index)
            .cloned()
            .ok_or(RowError::NotFound),
        _ => Err(RowError::TypeConstraint),
    }
}

impl<'r> RowBuffer<'r> {
    /// Decodes the field header at the cursor's current position, leaving
    /// the cursor ON the field. Returns `false` at the scope's end.
    pub(crate) fn read_cursor_header(&self, cur: &mut RowCursor) -> RowResult<bool> {
        if cur.scope_type.is_typed_scope() {
            if cur.index >= cur.count {
                cur.exists = false;
                return Ok(false);
            }
            let arg = element_arg(cur.scope_type, &cur.scope_type_args, cur.index)?;
            cur.cell_type = arg.type_code;
            cur.cell_type_args = arg.type_args;
            cur.code_offset = cur.meta_offset;
            cur.value_offset = cur.meta_offset;
            cur.exists = true;
            return Ok(true);
        }

        if cur.meta_offset >= self.length() {
            cur.exists = false;
            return Ok(false);
        }
        let mut offset = cur.meta_offset;
        if cur.scope_type.is_path_scope() {
            let (_, read) = self.sparse_path_at(&cur.layout, offset)?;
            offset += read;
        }
        let code = self.read_u8_at(offset);
        if code == LayoutType::EndScope.to_u8() {
            cur.exists = false;
            return Ok(false);
        }
        let cell_type = LayoutType::from_u8(code)?;
        let (args, read) =
            TypeArgumentList::decode(cell_type, &self.as_bytes()[offset + 1..])?;
        cur.cell_type = cell_type;
        cur.cell_type_args = args;
        cur.code_offset = offset;
        cur.value_offset = offset + 1 + read;
        cur.exists = true;
        Ok(true)
    }

    /// Advances to the next field of the scope. Returns `false` once the
    /// scope is exhausted; the cursor then rests at the insertion point.
    pub fn move_next(&self, cur: &mut RowCursor) -> RowResult<bool> {
        if cur.exists {
            cur.meta_offset = self.sparse_field_end(cur)?;
            cur.index += 1;
            cur.exists = false;
        }
        self.read_cursor_header(cur)
    }

    /// Positions an indexed scope on element `index`, rewinding first when
    /// the target lies behind the cursor.
    pub fn move_to(&self, cur: &mut RowCursor, index: usize) -> RowResult<bool> {
        if !cur.scope_type.is_indexed_scope() {
            return Err(RowError::TypeConstraint);
        }
        if cur.index > index {
            cur.rewind();
        }
        loop {
            if cur.index == index {
                return if cur.exists {
                    Ok(true)
                } else {
                    self.read_cursor_header(cur)
                };
            }
            if !self.move_next(cur)? {
                return Ok(false);
            }
        }
    }

    /// Scans a path scope for `path`. On a miss the cursor rests at the
    /// scope's append point with the path pending for insertion.
    pub fn find(&self, cur: &mut RowCursor, path: &str) -> RowResult<bool> {
        if !cur.scope_type.is_path_scope() {
            return Err(RowError::TypeConstraint);
        }
        cur.rewind();
        cur.write_path = None;
        while self.read_cursor_header(cur)? {
            let (parsed, _) = self.sparse_path_at(&cur.layout, cur.meta_offset)?;
            if self.path_matches(&parsed, &cur.layout, path) {
                return Ok(true);
            }
            cur.meta_offset = self.sparse_field_end(cur)?;
            cur.index += 1;
            cur.exists = false;
        }
        cur.write_path = Some(path.to_string());
        Ok(false)
    }

    /// Steps past the field the cursor is on, including the full extent of
    /// a nested scope mutated through child cursors.
    pub fn skip(&self, cur: &mut RowCursor) -> RowResult<()> {
        if !cur.exists {
            return Ok(());
        }
        cur.meta_offset = self.sparse_field_end(cur)?;
        cur.index += 1;
        cur.exists = false;
        Ok(())
    }

    /// Descends into the scope field the cursor is on.
    pub fn read_scope(&self, parent: &RowCursor) -> RowResult<RowCursor> {
        if !parent.exists {
            return Err(RowError::NotFound);
        }
        if !parent.cell_type.is_scope() {
            return Err(RowError::TypeMismatch);
        }
        self.scope_cursor(
            parent,
            parent.cell_type,
            parent.cell_type_args.clone(),
            parent.value_offset,
        )
    }

    /// Builds a child cursor over a scope value starting at `value_offset`.
    pub(crate) fn scope_cursor(
        &self,
        parent: &RowCursor,
        scope: LayoutType,
        args: TypeArgumentList,
        value_offset: usize,
    ) -> RowResult<RowCursor> {
        let immutable = parent.immutable || scope.is_immutable();
        let (layout, start, sparse_start, count) = if scope.is_udt_scope() {
            let id = args.schema_id().ok_or(RowError::TypeConstraint)?;
            let layout = self
                .resolver()
                .resolve(id)
                .ok_or(RowError::TypeConstraint)?;
            let sparse_start = self.sparse_region_start(&layout, value_offset)?;
            (layout, value_offset, sparse_start, 0)
        } else if scope.is_counted_scope() {
            let (count, read) = self.read_varuint_at(value_offset)?;
            (
                parent.layout.clone(),
                value_offset,
                value_offset + read,
                count as usize,
            )
        } else if scope.is_tuple_scope() {
            (
                parent.layout.clone(),
                value_offset,
                value_offset,
                args.len(),
            )
        } else if scope.is_nullable_scope() {
            let flag = self.read_u8_at(value_offset);
            (
                parent.layout.clone(),
                value_offset,
                value_offset + 1,
                usize::from(flag != 0),
            )
        } else {
            (parent.layout.clone(), value_offset, value_offset, 0)
        };
        Ok(RowCursor {
            layout,
            scope_type: scope,
            scope_type_args: args,
            start,
            sparse_start,
            immutable,
            deferred: false,
            count,
            index: 0,
            exists: false,
            meta_offset: sparse_start,
            code_offset: sparse_start,
            value_offset: sparse_start,
            cell_type: LayoutType::EndScope,
            cell_type_args: TypeArgumentList::empty(),
            write_path: None,
        })
    }
}
