//! # Row Codec Errors
//!
//! Row operations return a closed error enum rather than a boxed report:
//! the codec sits on hot paths where callers branch on the exact failure
//! (absent vs. wrong type vs. read-only) and where allocation-free errors
//! matter. Schema compilation, which runs once and cold, reports through
//! `eyre` instead (see `layout::compiler`).
//!
//! Corrupt wire data (unknown type codes, truncated varuints, invalid
//! UTF-8) surfaces as `TypeMismatch`; a schema id that cannot be resolved
//! at runtime, or a parameterization a scope does not allow, surfaces as
//! `TypeConstraint`.

use thiserror::Error;

pub type RowResult<T> = Result<T, RowError>;

/// Failure of one row operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RowError {
    /// The addressed field is absent (or the scope is exhausted).
    #[error("field not found")]
    NotFound,

    /// An insert addressed a field that already exists.
    #[error("field already exists")]
    Exists,

    /// The field's type does not match the operation, or the wire data at
    /// the addressed position is corrupt.
    #[error("type mismatch")]
    TypeMismatch,

    /// The operation violates a scope's declared parameterization or an
    /// unresolvable schema reference was hit.
    #[error("type constraint violated")]
    TypeConstraint,

    /// A mutation reached a read-only cursor or an immutable scope.
    #[error("insufficient permissions")]
    InsufficientPermissions,

    /// A value exceeds its column's declared length bound.
    #[error("value too big")]
    TooBig,
}
