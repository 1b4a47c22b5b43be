//! # Logical Schema Definitions
//!
//! The input object model of the layout compiler: an ordered list of typed
//! property definitions, each with a path, a type, a storage hint, and
//! (for scopes) nested type arguments or child properties. This is the
//! boundary the external schema language compiles down to; JSON parsing and
//! validation live outside this crate.
//!
//! ## Storage Hints
//!
//! | Hint | Meaning |
//! |------|---------|
//! | `Fixed` | statically-offset scalar, present in every row |
//! | `Variable` | length-prefixed scalar with a static ordinal |
//! | `Sparse` | self-describing field; all scope types force this |
//!
//! ## Example
//!
//! ```ignore
//! let schema = SchemaDef::new("point", SchemaId(1), vec![
//!     PropertyDef::new("x", TypeDef::fixed(LayoutType::Int32).with_nullable()),
//!     PropertyDef::new("label", TypeDef::variable(LayoutType::Utf8).with_length(64)),
//!     PropertyDef::new("tags", TypeDef::typed_set(TypeDef::sparse(LayoutType::Utf8))),
//! ]);
//! ```

use crate::types::{LayoutType, SchemaId};

/// Where a column's value is physically stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Fixed,
    Variable,
    Sparse,
}

/// A named schema: the compiler turns one of these into a `Layout`.
#[derive(Debug, Clone)]
pub struct SchemaDef {
    pub name: String,
    pub schema_id: SchemaId,
    pub properties: Vec<PropertyDef>,
}

impl SchemaDef {
    pub fn new(name: impl Into<String>, schema_id: SchemaId, properties: Vec<PropertyDef>) -> Self {
        Self {
            name: name.into(),
            schema_id,
            properties,
        }
    }
}

/// One property: a path plus its type definition.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub path: String,
    pub type_def: TypeDef,
}

impl PropertyDef {
    pub fn new(path: impl Into<String>, type_def: TypeDef) -> Self {
        Self {
            path: path.into(),
            type_def,
        }
    }
}

/// A logical type: scalar or scope, with storage hint and parameterization.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub code: LayoutType,
    pub storage: StorageKind,
    pub nullable: bool,
    /// Declared byte-length bound for Variable-storage columns.
    pub length: Option<u32>,
    /// Enum-typed property: `code` is the base type and must be an integer.
    pub is_enum: bool,
    /// Self-referential row-size annotation; patched after the row is written.
    pub row_buffer_size: bool,
    /// Element parameterization for typed scopes.
    pub type_args: Vec<TypeDef>,
    /// Child properties of an Object scope.
    pub properties: Vec<PropertyDef>,
    /// Referenced schema of a Udt scope.
    pub schema_ref: Option<SchemaId>,
}

impl TypeDef {
    fn base(code: LayoutType, storage: StorageKind) -> Self {
        Self {
            code,
            storage,
            nullable: false,
            length: None,
            is_enum: false,
            row_buffer_size: false,
            type_args: Vec::new(),
            properties: Vec::new(),
            schema_ref: None,
        }
    }

    pub fn fixed(code: LayoutType) -> Self {
        Self::base(code, StorageKind::Fixed)
    }

    pub fn variable(code: LayoutType) -> Self {
        Self::base(code, StorageKind::Variable)
    }

    pub fn sparse(code: LayoutType) -> Self {
        Self::base(code, StorageKind::Sparse)
    }

    pub fn object(properties: Vec<PropertyDef>) -> Self {
        let mut def = Self::base(LayoutType::Object, StorageKind::Sparse);
        def.properties = properties;
        def
    }

    pub fn array() -> Self {
        Self::base(LayoutType::Array, StorageKind::Sparse)
    }

    pub fn typed_array(item: TypeDef) -> Self {
        let mut def = Self::base(LayoutType::TypedArray, StorageKind::Sparse);
        def.type_args = vec![item];
        def
    }

    pub fn typed_set(item: TypeDef) -> Self {
        let mut def = Self::base(LayoutType::TypedSet, StorageKind::Sparse);
        def.type_args = vec![item];
        def
    }

    pub fn typed_map(key: TypeDef, value: TypeDef) -> Self {
        let mut def = Self::base(LayoutType::TypedMap, StorageKind::Sparse);
        def.type_args = vec![key, value];
        def
    }

    pub fn tuple(items: Vec<TypeDef>) -> Self {
        let mut def = Self::base(LayoutType::TypedTuple, StorageKind::Sparse);
        def.type_args = items;
        def
    }

    /// Tagged union: a `UInt8` tag is prepended implicitly.
    pub fn tagged(values: Vec<TypeDef>) -> Self {
        let mut def = Self::base(LayoutType::Tagged, StorageKind::Sparse);
        def.type_args = values;
        def
    }

    pub fn nullable_of(item: TypeDef) -> Self {
        let mut def = Self::base(LayoutType::Nullable, StorageKind::Sparse);
        def.type_args = vec![item];
        def
    }

    pub fn udt(schema_ref: SchemaId) -> Self {
        let mut def = Self::base(LayoutType::Udt, StorageKind::Sparse);
        def.schema_ref = Some(schema_ref);
        def
    }

    pub fn with_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn as_enum(mut self) -> Self {
        self.is_enum = true;
        self
    }

    pub fn with_row_buffer_size(mut self) -> Self {
        self.row_buffer_size = true;
        self
    }

    /// Switches a scope type to its immutable twin.
    pub fn immutable(mut self) -> Self {
        self.code = self.code.immutable();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_constructors_force_sparse_storage() {
        assert_eq!(TypeDef::object(vec![]).storage, StorageKind::Sparse);
        assert_eq!(TypeDef::array().storage, StorageKind::Sparse);
        assert_eq!(
            TypeDef::typed_array(TypeDef::sparse(LayoutType::Int32)).storage,
            StorageKind::Sparse
        );
        assert_eq!(TypeDef::udt(SchemaId(5)).storage, StorageKind::Sparse);
    }

    #[test]
    fn immutable_switches_scope_code() {
        let def = TypeDef::typed_set(TypeDef::sparse(LayoutType::Utf8)).immutable();
        assert_eq!(def.code, LayoutType::ImmutableTypedSet);
    }

    #[test]
    fn builder_flags_compose() {
        let def = TypeDef::fixed(LayoutType::Int32)
            .with_nullable()
            .with_row_buffer_size();
        assert!(def.nullable);
        assert!(def.row_buffer_size);
        assert!(!def.is_enum);
    }
}
