//! # Type Arguments for Parameterized Scopes
//!
//! Typed scopes carry their element parameterization on the wire, directly
//! after the scope's type code byte:
//!
//! | Scope | Arguments |
//! |-------|-----------|
//! | TypedArray, TypedSet, Nullable | one `TypeArgument` |
//! | TypedMap | key `TypeArgument`, value `TypeArgument` |
//! | TypedTuple, Tagged | varuint arity, then that many `TypeArgument`s |
//! | Udt | `SchemaId` as 4-byte i32 little-endian |
//!
//! A `TypeArgument` is a type code byte followed, recursively, by that
//! type's own arguments, so `TypedArray<TypedMap<Utf8, Int32>>` encodes in
//! four bytes of header.

use crate::encoding::varint::{decode_varuint, encode_varuint, MAX_VARUINT_LEN};
use crate::error::{RowError, RowResult};
use crate::types::code::LayoutType;

/// Identifier of a schema within a namespace; stored in the row header and
/// in Udt scope headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(pub i32);

impl SchemaId {
    pub const SIZE: usize = 4;

    pub fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        SchemaId(i32::from_le_bytes(bytes))
    }
}

/// One parameter of a typed scope: a type code plus its own parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeArgument {
    pub type_code: LayoutType,
    pub type_args: TypeArgumentList,
}

impl TypeArgument {
    pub fn new(type_code: LayoutType) -> Self {
        Self {
            type_code,
            type_args: TypeArgumentList::empty(),
        }
    }

    pub fn with_args(type_code: LayoutType, type_args: TypeArgumentList) -> Self {
        Self {
            type_code,
            type_args,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.type_code.to_u8());
        self.type_args.encode(self.type_code, out);
    }

    pub fn decode(buf: &[u8]) -> RowResult<(Self, usize)> {
        let code = *buf.first().ok_or(RowError::TypeMismatch)?;
        let type_code = LayoutType::from_u8(code)?;
        let (type_args, read) = TypeArgumentList::decode(type_code, &buf[1..])?;
        Ok((
            Self {
                type_code,
                type_args,
            },
            1 + read,
        ))
    }
}

/// The argument list of one scope: element types and, for Udt scopes, the
/// referenced schema id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeArgumentList {
    args: Vec<TypeArgument>,
    schema_id: Option<SchemaId>,
}

impl TypeArgumentList {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(args: Vec<TypeArgument>) -> Self {
        Self {
            args,
            schema_id: None,
        }
    }

    pub fn for_udt(schema_id: SchemaId) -> Self {
        Self {
            args: Vec::new(),
            schema_id: Some(schema_id),
        }
    }

    pub fn args(&self) -> &[TypeArgument] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn schema_id(&self) -> Option<SchemaId> {
        self.schema_id
    }

    /// Serializes the list the way `scope` declares its parameters.
    pub fn encode(&self, scope: LayoutType, out: &mut Vec<u8>) {
        use LayoutType::*;
        match scope.mutable() {
            TypedArray | TypedSet | Nullable => {
                self.args[0].encode(out);
            }
            TypedMap => {
                self.args[0].encode(out);
                self.args[1].encode(out);
            }
            TypedTuple | Tagged => {
                let mut scratch = [0u8; MAX_VARUINT_LEN];
                let n = encode_varuint(self.args.len() as u64, &mut scratch);
                out.extend_from_slice(&scratch[..n]);
                for arg in &self.args {
                    arg.encode(out);
                }
            }
            Udt => {
                let id = self.schema_id.unwrap_or(SchemaId(0));
                out.extend_from_slice(&id.to_le_bytes());
            }
            _ => {}
        }
    }

    /// Parses the argument list of `scope` from the wire; returns the list
    /// and the bytes consumed.
    pub fn decode(scope: LayoutType, buf: &[u8]) -> RowResult<(Self, usize)> {
        use LayoutType::*;
        match scope.mutable() {
            TypedArray | TypedSet | Nullable => {
                let (arg, read) = TypeArgument::decode(buf)?;
                Ok((Self::new(vec![arg]), read))
            }
            TypedMap => {
                let (key, read_k) = TypeArgument::decode(buf)?;
                let (value, read_v) = TypeArgument::decode(&buf[read_k..])?;
                Ok((Self::new(vec![key, value]), read_k + read_v))
            }
            TypedTuple | Tagged => {
                let (arity, mut read) =
                    decode_varuint(buf).map_err(|_| RowError::TypeMismatch)?;
                let mut args = Vec::with_capacity(arity as usize);
                for _ in 0..arity {
                    let (arg, n) = TypeArgument::decode(&buf[read..])?;
                    args.push(arg);
                    read += n;
                }
                Ok((Self::new(args), read))
            }
            Udt => {
                let bytes: [u8; 4] = buf
                    .get(..SchemaId::SIZE)
                    .and_then(|b| b.try_into().ok())
                    .ok_or(RowError::TypeMismatch)?;
                Ok((Self::for_udt(SchemaId::from_le_bytes(bytes)), SchemaId::SIZE))
            }
            _ => Ok((Self::empty(), 0)),
        }
    }

    /// Checks this list satisfies `scope`'s declared shape.
    pub fn validate_for(&self, scope: LayoutType) -> RowResult<()> {
        use LayoutType::*;
        let ok = match scope.mutable() {
            TypedArray | TypedSet | Nullable => self.args.len() == 1,
            TypedMap => self.args.len() == 2,
            TypedTuple => !self.args.is_empty(),
            Tagged => {
                self.args.len() >= 2
                    && self.args.len() <= 3
                    && self.args[0].type_code == UInt8
            }
            Udt => self.schema_id.is_some(),
            Object | Array => self.args.is_empty() && self.schema_id.is_none(),
            _ => return Err(RowError::TypeConstraint),
        };
        if ok {
            Ok(())
        } else {
            Err(RowError::TypeConstraint)
        }
    }
}
