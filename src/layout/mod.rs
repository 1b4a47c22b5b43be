//! # Physical Layout Model
//!
//! A `Layout` is the compiled physical description of one schema: ordered
//! fixed columns with byte offsets, packed null/bool bit positions, variable
//! column ordinals, and a path-to-token table for sparse lookups. Layouts are
//! immutable once compiled and safe to share across buffers and threads
//! (`Arc<Layout>`).
//!
//! ## Scope-Relative Addressing
//!
//! All offsets in a layout are relative to the start of the scope the layout
//! governs: the byte after the row header for the root schema, or the value
//! start of a sparse Udt field for nested schemas.
//!
//! ```text
//! +--------------+---------------------+------------------+----------------+
//! | bit vector   | fixed column bytes  | variable values  | sparse fields  |
//! | (nulls+bools)| (desc. width order) | (varuint-framed) | (self-tagged)  |
//! +--------------+---------------------+------------------+----------------+
//! 0              bit_bytes             size()             computed at runtime
//! ```
//!
//! ## Invariants
//!
//! - Fixed column offsets are monotonic and non-overlapping.
//! - Bit indices are allocated in layout column order, 1 bit per column use,
//!   packed 8 per byte (`byte = bit >> 3`, `mask = 1 << (bit & 7)`).
//! - A SET null bit means NULL/absent; `RowBuffer::init_layout` sets all
//!   null bits so a fresh row reads as all-default.

pub mod compiler;
pub mod resolver;

use hashbrown::HashMap;

use crate::schema::StorageKind;
use crate::types::{LayoutType, SchemaId, TypeArgumentList};

/// Position of one packed bit inside the scope's bit vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutBit(Option<usize>);

impl LayoutBit {
    pub const INVALID: LayoutBit = LayoutBit(None);

    pub fn new(index: usize) -> Self {
        LayoutBit(Some(index))
    }

    pub fn is_valid(self) -> bool {
        self.0.is_some()
    }

    /// Byte offset of the bit within the scope.
    pub fn byte_offset(self) -> usize {
        self.0.unwrap_or(0) >> 3
    }

    pub fn mask(self) -> u8 {
        1 << (self.0.unwrap_or(0) & 7)
    }
}

/// One compiled column definition.
#[derive(Debug, Clone)]
pub struct LayoutColumn {
    pub(crate) path: String,
    pub(crate) type_code: LayoutType,
    pub(crate) storage: StorageKind,
    pub(crate) nullable: bool,
    pub(crate) length: Option<u32>,
    /// Fixed columns: payload byte offset within the scope.
    pub(crate) offset: usize,
    /// Position within the column's storage bucket (variable ordinal).
    pub(crate) ordinal: usize,
    pub(crate) null_bit: LayoutBit,
    pub(crate) bool_bit: LayoutBit,
    /// Index of the enclosing Object column for flattened children.
    pub(crate) parent: Option<usize>,
    pub(crate) type_args: TypeArgumentList,
    pub(crate) token: u32,
}

impl LayoutColumn {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn type_code(&self) -> LayoutType {
        self.type_code
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn length(&self) -> Option<u32> {
        self.length
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn null_bit(&self) -> LayoutBit {
        self.null_bit
    }

    pub fn bool_bit(&self) -> LayoutBit {
        self.bool_bit
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn type_args(&self) -> &TypeArgumentList {
        &self.type_args
    }

    pub fn token(&self) -> u32 {
        self.token
    }
}

/// Compiled physical layout of one schema.
#[derive(Debug)]
pub struct Layout {
    pub(crate) name: String,
    pub(crate) schema_id: SchemaId,
    /// Bit vector bytes + fixed column payload bytes.
    pub(crate) size: usize,
    pub(crate) num_fixed: usize,
    pub(crate) num_variable: usize,
    /// Fixed columns (descending width), then variable, then sparse.
    pub(crate) columns: Vec<LayoutColumn>,
    pub(crate) path_map: HashMap<String, usize>,
    pub(crate) tokens: Vec<String>,
    pub(crate) token_map: HashMap<String, u32>,
    pub(crate) row_size_column: Option<usize>,
}

impl Layout {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    /// Total bytes of the scope's bit vector + fixed region.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn columns(&self) -> &[LayoutColumn] {
        &self.columns
    }

    pub fn num_fixed(&self) -> usize {
        self.num_fixed
    }

    pub fn num_variable(&self) -> usize {
        self.num_variable
    }

    pub fn fixed_columns(&self) -> &[LayoutColumn] {
        &self.columns[..self.num_fixed]
    }

    pub fn variable_columns(&self) -> &[LayoutColumn] {
        &self.columns[self.num_fixed..self.num_fixed + self.num_variable]
    }

    pub fn sparse_columns(&self) -> &[LayoutColumn] {
        &self.columns[self.num_fixed + self.num_variable..]
    }

    /// Looks a column up by its full (dotted) path.
    pub fn column(&self, path: &str) -> Option<&LayoutColumn> {
        self.path_map.get(path).map(|&i| &self.columns[i])
    }

    pub fn token_count(&self) -> u64 {
        self.tokens.len() as u64
    }

    pub fn token_of(&self, path: &str) -> Option<u32> {
        self.token_map.get(path).copied()
    }

    pub fn token_path(&self, token: u64) -> Option<&str> {
        self.tokens.get(token as usize).map(String::as_str)
    }

    /// The column carrying the self-referential row-size annotation, if any.
    pub fn row_buffer_size_column(&self) -> Option<&LayoutColumn> {
        self.row_size_column.map(|i| &self.columns[i])
    }
}
