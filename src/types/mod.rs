//! # Core Type System
//!
//! The closed type-code variant, scope parameterization, and the fixed-width
//! value carriers shared by the layout compiler and the row codec:
//!
//! - `code`: `LayoutType`, the `#[repr(u8)]` wire type-code enum
//! - `args`: `SchemaId`, `TypeArgument`, `TypeArgumentList`
//! - `float128`: `Float128` (decimal128 passthrough) and `MongoDbObjectId`

pub mod args;
pub mod code;
pub mod float128;

pub use args::{SchemaId, TypeArgument, TypeArgumentList};
pub use code::LayoutType;
pub use float128::{Float128, MongoDbObjectId};
