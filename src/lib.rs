//! # HybridRow - Schema-Driven Self-Describing Rows
//!
//! A binary row format combining the density of schematized storage with
//! the flexibility of self-describing documents. Each row carries a schema
//! id; the referenced layout gives statically-offset fixed columns and
//! ordered variable columns, while everything else lives in a sparse tail
//! of self-tagged fields, nestable through typed and untyped scopes.
//!
//! This implementation prioritizes:
//!
//! - **In-place mutation**: every write splices the row buffer directly;
//!   there is no object tree to materialize or re-serialize
//! - **Zero-copy reads**: strings and binary come back as borrowed slices
//! - **Allocation-free hot paths**: closed error enum, scratch buffers on
//!   the stack, layouts shared via `Arc`
//!
//! ## Quick Start
//!
//! ```ignore
//! use hybridrow::{
//!     LayoutRegistry, LayoutType, PropertyDef, RowBuffer, RowCursor, SchemaDef,
//!     SchemaId, TypeDef, UpdateOptions, ROW_VERSION,
//! };
//!
//! let registry = LayoutRegistry::compile_namespace(&[SchemaDef::new(
//!     "point",
//!     SchemaId(1),
//!     vec![
//!         PropertyDef::new("x", TypeDef::fixed(LayoutType::Int32)),
//!         PropertyDef::new("label", TypeDef::variable(LayoutType::Utf8)),
//!     ],
//! )])?;
//!
//! let mut row = RowBuffer::new(256, &registry);
//! row.init_layout(ROW_VERSION, &registry.get(SchemaId(1)).unwrap());
//! let root = RowCursor::create(&row)?;
//! let layout = root.layout().clone();
//! row.write_fixed_i32(&root, layout.column("x").unwrap(), 42)?;
//! row.write_variable_utf8(&root, layout.column("label").unwrap(), "origin")?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │   Row Codec (RowBuffer / RowCursor)       │
//! ├──────────────────────────────────────────┤
//! │   Sparse Fields │ Unique Scopes           │
//! ├─────────────────┴────────────────────────┤
//! │   Layout Compiler & Resolver              │
//! ├──────────────────────────────────────────┤
//! │   Schema Model │ Type System │ Varints    │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Row Layout
//!
//! ```text
//! +---------+-----------+--------------+------------------+---------------+
//! | version | schema id | bits + fixed | variable values  | sparse fields |
//! | u8      | i32 LE    | layout-sized | varuint-framed   | self-tagged   |
//! +---------+-----------+--------------+------------------+---------------+
//! ```

pub mod encoding;
pub mod error;
pub mod layout;
pub mod row;
pub mod schema;
pub mod types;

pub use error::{RowError, RowResult};
pub use layout::resolver::{LayoutRegistry, LayoutResolver};
pub use layout::{Layout, LayoutColumn};
pub use row::{
    BufferResizer, DefaultResizer, RowBuffer, RowCursor, UpdateOptions, HEADER_SIZE, ROW_VERSION,
};
pub use schema::{PropertyDef, SchemaDef, StorageKind, TypeDef};
pub use types::{
    Float128, LayoutType, MongoDbObjectId, SchemaId, TypeArgument, TypeArgumentList,
};
