//! # Row Codec
//!
//! The mutable row layer: `RowBuffer` owns the bytes, `RowCursor` addresses
//! positions inside them, and the sparse/unique modules implement the
//! self-describing tail of each scope. See the module docs of `buffer`,
//! `cursor`, and `sparse` for the wire rules.

pub mod buffer;
pub mod cursor;
pub mod sparse;
pub mod unique;

pub use buffer::{BufferResizer, DefaultResizer, RowBuffer, HEADER_SIZE, ROW_VERSION};
pub use cursor::RowCursor;
pub use sparse::UpdateOptions;

#[cfg(test)]
mod tests;
