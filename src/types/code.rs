//! # Layout Type Codes
//!
//! This module provides `LayoutType`, the closed `#[repr(u8)]` variant over
//! every scalar and scope kind the row format can encode. The discriminant
//! doubles as the on-wire type code byte written in sparse field headers.
//!
//! ## Code Groups
//!
//! | Group | Codes | Kinds |
//! |-------|-------|-------|
//! | Control | 0 | EndScope (explicit scope terminator) |
//! | Scalars | 1-18 | Null, Bool, signed/unsigned ints, varints, floats, object id, Utf8, Binary |
//! | Scopes | 20-37 | Object, Array, TypedArray, TypedTuple, TypedSet, TypedMap, Nullable, Tagged, Udt, each with an immutable twin |
//!
//! Scope codes come in mutable/immutable pairs at adjacent discriminants so
//! `immutable()`/`mutable()` are single-bit flips of intent, not lookups.
//!
//! ## Fixed Sizes
//!
//! `fixed_size` reports the sparse payload width of fixed-width scalars.
//! `Bool` is the one asymmetry: its sparse payload is 1 byte, but a
//! fixed-storage Bool column occupies zero payload bytes because the value
//! lives in the layout's packed bool bit (see `layout::compiler`).

use crate::error::{RowError, RowResult};

/// Closed set of type codes; the discriminant is the wire byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutType {
    EndScope = 0,
    Null = 1,
    Bool = 2,
    Int8 = 3,
    Int16 = 4,
    Int32 = 5,
    Int64 = 6,
    UInt8 = 7,
    UInt16 = 8,
    UInt32 = 9,
    UInt64 = 10,
    VarInt = 11,
    VarUInt = 12,
    Float32 = 13,
    Float64 = 14,
    Float128 = 15,
    MongoDbObjectId = 16,
    Utf8 = 17,
    Binary = 18,

    Object = 20,
    ImmutableObject = 21,
    Array = 22,
    ImmutableArray = 23,
    TypedArray = 24,
    ImmutableTypedArray = 25,
    TypedTuple = 26,
    ImmutableTypedTuple = 27,
    TypedSet = 28,
    ImmutableTypedSet = 29,
    TypedMap = 30,
    ImmutableTypedMap = 31,
    Nullable = 32,
    ImmutableNullable = 33,
    Tagged = 34,
    ImmutableTagged = 35,
    Udt = 36,
    ImmutableUdt = 37,
}

impl LayoutType {
    /// Decodes a wire byte into a type code. Unknown bytes are corrupt data
    /// and surface as `TypeMismatch` on the hot path.
    pub fn from_u8(code: u8) -> RowResult<Self> {
        use LayoutType::*;
        Ok(match code {
            0 => EndScope,
            1 => Null,
            2 => Bool,
            3 => Int8,
            4 => Int16,
            5 => Int32,
            6 => Int64,
            7 => UInt8,
            8 => UInt16,
            9 => UInt32,
            10 => UInt64,
            11 => VarInt,
            12 => VarUInt,
            13 => Float32,
            14 => Float64,
            15 => Float128,
            16 => MongoDbObjectId,
            17 => Utf8,
            18 => Binary,
            20 => Object,
            21 => ImmutableObject,
            22 => Array,
            23 => ImmutableArray,
            24 => TypedArray,
            25 => ImmutableTypedArray,
            26 => TypedTuple,
            27 => ImmutableTypedTuple,
            28 => TypedSet,
            29 => ImmutableTypedSet,
            30 => TypedMap,
            31 => ImmutableTypedMap,
            32 => Nullable,
            33 => ImmutableNullable,
            34 => Tagged,
            35 => ImmutableTagged,
            36 => Udt,
            37 => ImmutableUdt,
            _ => return Err(RowError::TypeMismatch),
        })
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Sparse payload width of fixed-width scalars; `None` for
    /// variable-length scalars and scopes.
    pub fn fixed_size(self) -> Option<usize> {
        use LayoutType::*;
        match self {
            Null => Some(0),
            Bool | Int8 | UInt8 => Some(1),
            Int16 | UInt16 => Some(2),
            Int32 | UInt32 | Float32 => Some(4),
            Int64 | UInt64 | Float64 => Some(8),
            Float128 => Some(16),
            MongoDbObjectId => Some(12),
            _ => None,
        }
    }

    /// Payload bytes a fixed-storage column of this type occupies. `Bool`
    /// packs into the layout's bool bit and takes zero bytes.
    pub fn fixed_column_size(self) -> Option<usize> {
        match self {
            LayoutType::Bool => Some(0),
            other => other.fixed_size(),
        }
    }

    /// True for scalars that may be declared with Fixed storage.
    pub fn is_fixed_storable(self) -> bool {
        self.fixed_size().is_some() && self != LayoutType::Null
    }

    /// True for scalars that may be declared with Variable storage.
    pub fn is_var_storable(self) -> bool {
        use LayoutType::*;
        matches!(self, Utf8 | Binary | VarInt | VarUInt)
    }

    pub fn is_scope(self) -> bool {
        self.to_u8() >= LayoutType::Object.to_u8()
    }

    /// Scopes whose elements are encoded without per-element type codes.
    pub fn is_typed_scope(self) -> bool {
        use LayoutType::*;
        matches!(
            self,
            TypedArray
                | ImmutableTypedArray
                | TypedTuple
                | ImmutableTypedTuple
                | TypedSet
                | ImmutableTypedSet
                | TypedMap
                | ImmutableTypedMap
                | Nullable
                | ImmutableNullable
                | Tagged
                | ImmutableTagged
        )
    }

    /// Scopes maintaining sorted, duplicate-free element order.
    pub fn is_unique_scope(self) -> bool {
        use LayoutType::*;
        matches!(
            self,
            TypedSet | ImmutableTypedSet | TypedMap | ImmutableTypedMap
        )
    }

    /// Scopes addressed by element index rather than path.
    pub fn is_indexed_scope(self) -> bool {
        use LayoutType::*;
        matches!(
            self,
            Array
                | ImmutableArray
                | TypedArray
                | ImmutableTypedArray
                | TypedSet
                | ImmutableTypedSet
                | TypedMap
                | ImmutableTypedMap
                | TypedTuple
                | ImmutableTypedTuple
                | Tagged
                | ImmutableTagged
                | Nullable
                | ImmutableNullable
        )
    }

    /// Scopes that carry an explicit on-wire element count.
    pub fn is_counted_scope(self) -> bool {
        use LayoutType::*;
        matches!(
            self,
            TypedArray
                | ImmutableTypedArray
                | TypedSet
                | ImmutableTypedSet
                | TypedMap
                | ImmutableTypedMap
        )
    }

    /// Scopes whose fields carry path prefixes.
    pub fn is_path_scope(self) -> bool {
        use LayoutType::*;
        matches!(self, Object | ImmutableObject | Udt | ImmutableUdt)
    }

    /// Scopes terminated by an explicit `EndScope` byte.
    pub fn is_end_marked_scope(self) -> bool {
        use LayoutType::*;
        matches!(
            self,
            Object | ImmutableObject | Array | ImmutableArray | Udt | ImmutableUdt
        )
    }

    pub fn is_udt_scope(self) -> bool {
        matches!(self, LayoutType::Udt | LayoutType::ImmutableUdt)
    }

    pub fn is_tuple_scope(self) -> bool {
        use LayoutType::*;
        matches!(self, TypedTuple | ImmutableTypedTuple | Tagged | ImmutableTagged)
    }

    pub fn is_nullable_scope(self) -> bool {
        matches!(self, LayoutType::Nullable | LayoutType::ImmutableNullable)
    }

    pub fn is_immutable(self) -> bool {
        self.is_scope() && self.to_u8() & 1 == 1
    }

    /// The immutable twin of a scope code (identity for scalars).
    pub fn immutable(self) -> Self {
        if self.is_scope() && !self.is_immutable() {
            // Scope pairs sit at (even, even+1) discriminants.
            LayoutType::from_u8(self.to_u8() + 1).unwrap_or(self)
        } else {
            self
        }
    }

    /// The mutable twin of a scope code (identity for scalars).
    pub fn mutable(self) -> Self {
        if self.is_immutable() {
            LayoutType::from_u8(self.to_u8() - 1).unwrap_or(self)
        } else {
            self
        }
    }
}
