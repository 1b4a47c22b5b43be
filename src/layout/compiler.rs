//! # Layout Compilation
//!
//! Turns a logical `SchemaDef` into a physical `Layout`:
//!
//! 1. Flatten nested Object properties into dotted sparse paths (`a.b.c`),
//!    each its own sparse column with a parent back-reference; the object
//!    itself keeps one sparse slot for its scope marker.
//! 2. Partition remaining properties into Fixed / Variable / Sparse buckets
//!    (scope types always force Sparse).
//! 3. Allocate one null bit per nullable fixed column and per variable
//!    column, plus one value bit per fixed Bool column, in column order.
//! 4. Order fixed columns by descending width (stable, so declaration order
//!    breaks ties) and assign byte offsets after the bit vector.
//! 5. Assign variable columns sequential ordinals; their byte offsets are
//!    computed at access time from the lengths already written.
//! 6. Assign every column path a small-integer token for compact sparse
//!    field prefixes.
//!
//! Compilation failures are program-structural (malformed schema), reported
//! through `eyre::Result`: an enum with a non-numeric base type, a
//! `row_buffer_size` annotation on anything but a single Fixed Int32 column,
//! or (at namespace level) an unresolvable Udt schema reference.
//!
//! Note on variable columns: every variable column receives a presence bit,
//! nullable or not, because the running-offset computation over the variable
//! region must know which values are materialized.

use eyre::{bail, ensure, Result};
use tracing::debug;

use crate::layout::{Layout, LayoutBit, LayoutColumn};
use crate::schema::{PropertyDef, SchemaDef, StorageKind, TypeDef};
use crate::types::{LayoutType, TypeArgument, TypeArgumentList};

struct Pending {
    path: String,
    type_code: LayoutType,
    storage: StorageKind,
    nullable: bool,
    length: Option<u32>,
    /// Index into the sparse bucket of the enclosing Object column.
    parent: Option<usize>,
    type_args: TypeArgumentList,
    row_buffer_size: bool,
}

/// Compiles one schema into a layout. Cross-schema Udt references are
/// validated by `LayoutRegistry::compile_namespace`.
pub fn compile(def: &SchemaDef) -> Result<Layout> {
    let mut fixed: Vec<Pending> = Vec::new();
    let mut variable: Vec<Pending> = Vec::new();
    let mut sparse: Vec<Pending> = Vec::new();

    for prop in &def.properties {
        route_property(prop, None, "", &mut fixed, &mut variable, &mut sparse)?;
    }

    // Fixed columns pack densely when ordered widest-first; the sort is
    // stable so declaration order breaks ties.
    fixed.sort_by(|a, b| {
        let wa = a.type_code.fixed_column_size().unwrap_or(0);
        let wb = b.type_code.fixed_column_size().unwrap_or(0);
        wb.cmp(&wa)
    });

    let mut next_bit = 0usize;
    let mut bool_bits: Vec<LayoutBit> = Vec::with_capacity(fixed.len());
    let mut null_bits: Vec<LayoutBit> = Vec::with_capacity(fixed.len() + variable.len());
    for col in &fixed {
        if col.type_code == LayoutType::Bool {
            bool_bits.push(LayoutBit::new(next_bit));
            next_bit += 1;
        } else {
            bool_bits.push(LayoutBit::INVALID);
        }
        if col.nullable {
            null_bits.push(LayoutBit::new(next_bit));
            next_bit += 1;
        } else {
            null_bits.push(LayoutBit::INVALID);
        }
    }
    for _ in &variable {
        null_bits.push(LayoutBit::new(next_bit));
        next_bit += 1;
    }

    let bit_bytes = next_bit.div_ceil(8);

    let num_fixed = fixed.len();
    let num_variable = variable.len();
    let sparse_base = num_fixed + num_variable;

    let mut columns: Vec<LayoutColumn> = Vec::with_capacity(sparse_base + sparse.len());
    let mut row_size_column = None;
    let mut offset = bit_bytes;
    for (i, col) in fixed.into_iter().enumerate() {
        let width = col
            .type_code
            .fixed_column_size()
            .expect("fixed bucket only holds fixed-width scalars");
        if col.row_buffer_size {
            ensure!(
                row_size_column.is_none(),
                "schema '{}' declares more than one row_buffer_size column",
                def.name
            );
            row_size_column = Some(i);
        }
        columns.push(assemble(col, offset, i, null_bits[i], bool_bits[i], None));
        offset += width;
    }
    let size = offset;

    for (i, col) in variable.into_iter().enumerate() {
        columns.push(assemble(col, 0, i, null_bits[num_fixed + i], LayoutBit::INVALID, None));
    }

    for col in sparse {
        let parent = col.parent.map(|p| sparse_base + p);
        let ordinal = columns.len() - sparse_base;
        columns.push(assemble(col, 0, ordinal, LayoutBit::INVALID, LayoutBit::INVALID, parent));
    }

    let mut path_map = hashbrown::HashMap::with_capacity(columns.len());
    let mut tokens = Vec::with_capacity(columns.len());
    let mut token_map = hashbrown::HashMap::with_capacity(columns.len());
    for (i, col) in columns.iter_mut().enumerate() {
        col.token = tokens.len() as u32;
        token_map.insert(col.path.clone(), col.token);
        tokens.push(col.path.clone());
        ensure!(
            path_map.insert(col.path.clone(), i).is_none(),
            "duplicate property path '{}' in schema '{}'",
            col.path,
            def.name
        );
    }

    debug!(
        schema = %def.name,
        id = def.schema_id.0,
        fixed = num_fixed,
        variable = num_variable,
        sparse = columns.len() - sparse_base,
        size,
        "compiled layout"
    );

    Ok(Layout {
        name: def.name.clone(),
        schema_id: def.schema_id,
        size,
        num_fixed,
        num_variable,
        columns,
        path_map,
        tokens,
        token_map,
        row_size_column,
    })
}

fn assemble(
    p: Pending,
    offset: usize,
    ordinal: usize,
    null_bit: LayoutBit,
    bool_bit: LayoutBit,
    parent: Option<usize>,
) -> LayoutColumn {
    LayoutColumn {
        path: p.path,
        type_code: p.type_code,
        storage: p.storage,
        nullable: p.nullable,
        length: p.length,
        offset,
        ordinal,
        null_bit,
        bool_bit,
        parent,
        type_args: p.type_args,
        token: 0,
    }
}

fn route_property(
    prop: &PropertyDef,
    parent: Option<usize>,
    prefix: &str,
    fixed: &mut Vec<Pending>,
    variable: &mut Vec<Pending>,
    sparse: &mut Vec<Pending>,
) -> Result<()> {
    let def = &prop.type_def;
    let path = if prefix.is_empty() {
        prop.path.clone()
    } else {
        format!("{}.{}", prefix, prop.path)
    };

    validate_type(&path, def)?;

    if def.code == LayoutType::Object || def.code == LayoutType::ImmutableObject {
        sparse.push(pending(path.clone(), def, parent, TypeArgumentList::empty()));
        let my_index = sparse.len() - 1;
        for child in &def.properties {
            route_property(child, Some(my_index), &path, fixed, variable, sparse)?;
        }
        return Ok(());
    }

    if def.code.is_scope() {
        let args = scope_args(&path, def)?;
        args.validate_for(def.code)
            .map_err(|_| eyre::eyre!("invalid type arguments for scope '{}'", path))?;
        sparse.push(pending(path, def, parent, args));
        return Ok(());
    }

    // Children of an object are independently addressable sparse columns,
    // whatever their declared storage hint.
    let storage = if parent.is_some() {
        StorageKind::Sparse
    } else {
        def.storage
    };

    ensure!(
        !def.row_buffer_size || storage == StorageKind::Fixed,
        "row_buffer_size column '{}' must be a top-level fixed column",
        path
    );

    match storage {
        StorageKind::Fixed => {
            ensure!(
                def.code.is_fixed_storable(),
                "property '{}' of type {:?} cannot use Fixed storage",
                path,
                def.code
            );
            fixed.push(pending(path, def, parent, TypeArgumentList::empty()));
        }
        StorageKind::Variable => {
            ensure!(
                def.code.is_var_storable(),
                "property '{}' of type {:?} cannot use Variable storage",
                path,
                def.code
            );
            variable.push(pending(path, def, parent, TypeArgumentList::empty()));
        }
        StorageKind::Sparse => {
            sparse.push(pending(path, def, parent, TypeArgumentList::empty()));
        }
    }
    Ok(())
}

fn pending(path: String, def: &TypeDef, parent: Option<usize>, args: TypeArgumentList) -> Pending {
    Pending {
        path,
        type_code: def.code,
        storage: if def.code.is_scope() {
            StorageKind::Sparse
        } else if parent.is_some() {
            StorageKind::Sparse
        } else {
            def.storage
        },
        nullable: def.nullable,
        length: def.length,
        parent,
        type_args: args,
        row_buffer_size: def.row_buffer_size,
    }
}

fn validate_type(path: &str, def: &TypeDef) -> Result<()> {
    if def.is_enum {
        let numeric = matches!(
            def.code,
            LayoutType::Int8
                | LayoutType::Int16
                | LayoutType::Int32
                | LayoutType::Int64
                | LayoutType::UInt8
                | LayoutType::UInt16
                | LayoutType::UInt32
                | LayoutType::UInt64
                | LayoutType::VarInt
                | LayoutType::VarUInt
        );
        ensure!(
            numeric,
            "enum property '{}' has non-numeric base type {:?}",
            path,
            def.code
        );
    }
    if def.row_buffer_size {
        ensure!(
            def.code == LayoutType::Int32 && def.storage == StorageKind::Fixed,
            "row_buffer_size annotation on '{}' requires a Fixed Int32 column",
            path
        );
    }
    if def.code == LayoutType::EndScope {
        bail!("property '{}' cannot be typed EndScope", path);
    }
    Ok(())
}

/// Converts a scope TypeDef's parameterization into wire type arguments.
fn scope_args(path: &str, def: &TypeDef) -> Result<TypeArgumentList> {
    use LayoutType::*;
    match def.code.mutable() {
        TypedArray | TypedSet | Nullable => {
            ensure!(
                def.type_args.len() == 1,
                "scope '{}' requires exactly one type argument",
                path
            );
            Ok(TypeArgumentList::new(vec![arg_of(path, &def.type_args[0])?]))
        }
        TypedMap => {
            ensure!(
                def.type_args.len() == 2,
                "map scope '{}' requires key and value type arguments",
                path
            );
            Ok(TypeArgumentList::new(vec![
                arg_of(path, &def.type_args[0])?,
                arg_of(path, &def.type_args[1])?,
            ]))
        }
        TypedTuple => {
            ensure!(
                !def.type_args.is_empty(),
                "tuple scope '{}' requires at least one type argument",
                path
            );
            let mut args = Vec::with_capacity(def.type_args.len());
            for item in &def.type_args {
                args.push(arg_of(path, item)?);
            }
            Ok(TypeArgumentList::new(args))
        }
        Tagged => {
            ensure!(
                !def.type_args.is_empty() && def.type_args.len() <= 2,
                "tagged scope '{}' requires one or two value type arguments",
                path
            );
            let mut args = Vec::with_capacity(def.type_args.len() + 1);
            args.push(TypeArgument::new(UInt8));
            for item in &def.type_args {
                args.push(arg_of(path, item)?);
            }
            Ok(TypeArgumentList::new(args))
        }
        Udt => {
            let id = def
                .schema_ref
                .ok_or_else(|| eyre::eyre!("udt scope '{}' is missing its schema reference", path))?;
            Ok(TypeArgumentList::for_udt(id))
        }
        Object | Array => Ok(TypeArgumentList::empty()),
        other => bail!("'{}': {:?} is not a scope type", path, other),
    }
}

fn arg_of(path: &str, def: &TypeDef) -> Result<TypeArgument> {
    validate_type(path, def)?;
    if def.code.is_scope() {
        Ok(TypeArgument::with_args(def.code, scope_args(path, def)?))
    } else {
        Ok(TypeArgument::new(def.code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaDef;
    use crate::types::SchemaId;

    fn prop(path: &str, def: TypeDef) -> PropertyDef {
        PropertyDef::new(path, def)
    }

    #[test]
    fn fixed_columns_order_by_descending_width() {
        let layout = compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![
                prop("a", TypeDef::fixed(LayoutType::Int16)),
                prop("b", TypeDef::fixed(LayoutType::Int64)),
                prop("c", TypeDef::fixed(LayoutType::Int8)),
                prop("d", TypeDef::fixed(LayoutType::Int64)),
            ],
        ))
        .unwrap();

        let order: Vec<&str> = layout.fixed_columns().iter().map(|c| c.path()).collect();
        assert_eq!(order, ["b", "d", "a", "c"]);

        // No bits are needed, so offsets start at zero.
        assert_eq!(layout.fixed_columns()[0].offset(), 0);
        assert_eq!(layout.fixed_columns()[1].offset(), 8);
        assert_eq!(layout.fixed_columns()[2].offset(), 16);
        assert_eq!(layout.fixed_columns()[3].offset(), 18);
        assert_eq!(layout.size(), 19);
    }

    #[test]
    fn nullable_bool_columns_pack_two_bits_each() {
        let props: Vec<PropertyDef> = (0..32)
            .map(|i| {
                prop(
                    &format!("b{}", i),
                    TypeDef::fixed(LayoutType::Bool).with_nullable(),
                )
            })
            .collect();
        let layout = compile(&SchemaDef::new("bools", SchemaId(1), props)).unwrap();

        // 32 columns * (1 null bit + 1 value bit) = 64 bits = 8 bytes, and
        // Bool contributes no payload bytes.
        assert_eq!(layout.size(), 8);
        for col in layout.fixed_columns() {
            assert!(col.null_bit().is_valid());
            assert!(col.bool_bit().is_valid());
        }
    }

    #[test]
    fn bit_indices_are_monotonic_in_column_order() {
        let layout = compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![
                prop("a", TypeDef::fixed(LayoutType::Int32).with_nullable()),
                prop("b", TypeDef::fixed(LayoutType::Bool)),
                prop("s", TypeDef::variable(LayoutType::Utf8)),
            ],
        ))
        .unwrap();

        let a = layout.column("a").unwrap();
        let b = layout.column("b").unwrap();
        let s = layout.column("s").unwrap();
        assert!(a.null_bit().is_valid());
        assert!(b.bool_bit().is_valid());
        assert!(!b.null_bit().is_valid());
        assert!(s.null_bit().is_valid());
        // a (int32) sorts before b (bool, width 0): bits follow that order.
        assert_eq!(a.null_bit().byte_offset(), 0);
        assert_eq!(a.null_bit().mask(), 0b001);
        assert_eq!(b.bool_bit().mask(), 0b010);
        assert_eq!(s.null_bit().mask(), 0b100);
    }

    #[test]
    fn object_properties_flatten_to_dotted_sparse_paths() {
        let layout = compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![prop(
                "a",
                TypeDef::object(vec![
                    prop("b", TypeDef::fixed(LayoutType::Int8)),
                    prop(
                        "c",
                        TypeDef::object(vec![prop("d", TypeDef::variable(LayoutType::Utf8))]),
                    ),
                ]),
            )],
        ))
        .unwrap();

        assert_eq!(layout.num_fixed(), 0);
        assert_eq!(layout.num_variable(), 0);

        let a = layout.column("a").unwrap();
        let ab = layout.column("a.b").unwrap();
        let ac = layout.column("a.c").unwrap();
        let acd = layout.column("a.c.d").unwrap();

        assert_eq!(a.type_code(), LayoutType::Object);
        assert_eq!(ab.storage(), StorageKind::Sparse);
        assert_eq!(acd.storage(), StorageKind::Sparse);

        // Parent back-references chain to the root object.
        let a_idx = layout.path_map["a"];
        let ac_idx = layout.path_map["a.c"];
        assert_eq!(ab.parent(), Some(a_idx));
        assert_eq!(ac.parent(), Some(a_idx));
        assert_eq!(acd.parent(), Some(ac_idx));
    }

    #[test]
    fn token_table_roundtrips_paths() {
        let layout = compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![
                prop("x", TypeDef::fixed(LayoutType::Int32)),
                prop("y", TypeDef::sparse(LayoutType::Utf8)),
            ],
        ))
        .unwrap();

        for col in layout.columns() {
            let token = layout.token_of(col.path()).unwrap();
            assert_eq!(layout.token_path(token as u64), Some(col.path()));
        }
        assert_eq!(layout.token_count(), 2);
    }

    #[test]
    fn scope_parameterizations_compile_to_wire_args() {
        let layout = compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![
                prop(
                    "m",
                    TypeDef::typed_map(
                        TypeDef::sparse(LayoutType::Utf8),
                        TypeDef::sparse(LayoutType::Int64),
                    ),
                ),
                prop(
                    "pair",
                    TypeDef::tuple(vec![
                        TypeDef::sparse(LayoutType::Int32),
                        TypeDef::sparse(LayoutType::Utf8),
                    ]),
                ),
                prop("alt", TypeDef::tagged(vec![TypeDef::sparse(LayoutType::Binary)])),
                prop("opt", TypeDef::nullable_of(TypeDef::sparse(LayoutType::Float64))),
            ],
        ))
        .unwrap();

        let m = layout.column("m").unwrap();
        assert_eq!(m.type_code(), LayoutType::TypedMap);
        let codes: Vec<LayoutType> =
            m.type_args().args().iter().map(|a| a.type_code).collect();
        assert_eq!(codes, [LayoutType::Utf8, LayoutType::Int64]);

        let pair = layout.column("pair").unwrap();
        assert_eq!(pair.type_args().len(), 2);

        // The tag argument is injected ahead of the declared values.
        let alt = layout.column("alt").unwrap();
        let codes: Vec<LayoutType> =
            alt.type_args().args().iter().map(|a| a.type_code).collect();
        assert_eq!(codes, [LayoutType::UInt8, LayoutType::Binary]);

        let opt = layout.column("opt").unwrap();
        assert_eq!(opt.type_code(), LayoutType::Nullable);
        assert_eq!(opt.type_args().args()[0].type_code, LayoutType::Float64);
    }

    #[test]
    fn enum_with_non_numeric_base_fails_compilation() {
        let result = compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![prop("e", TypeDef::fixed(LayoutType::Float64).as_enum())],
        ));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("non-numeric"));
    }

    #[test]
    fn row_buffer_size_requires_single_fixed_int32() {
        let bad_type = compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![prop(
                "n",
                TypeDef::fixed(LayoutType::Int64).with_row_buffer_size(),
            )],
        ));
        assert!(bad_type.is_err());

        let two = compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![
                prop("m", TypeDef::fixed(LayoutType::Int32).with_row_buffer_size()),
                prop("n", TypeDef::fixed(LayoutType::Int32).with_row_buffer_size()),
            ],
        ));
        assert!(two.is_err());

        // Inside an object the column is re-routed to sparse storage, which
        // the annotation cannot survive.
        let nested = compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![prop(
                "o",
                TypeDef::object(vec![prop(
                    "n",
                    TypeDef::fixed(LayoutType::Int32).with_row_buffer_size(),
                )]),
            )],
        ));
        assert!(nested.is_err());

        let good = compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![prop(
                "m",
                TypeDef::fixed(LayoutType::Int32).with_row_buffer_size(),
            )],
        ))
        .unwrap();
        assert_eq!(good.row_buffer_size_column().unwrap().path(), "m");
    }

    #[test]
    fn scalar_storage_capability_is_enforced() {
        assert!(compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![prop("s", TypeDef::fixed(LayoutType::Utf8))],
        ))
        .is_err());

        assert!(compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![prop("n", TypeDef::variable(LayoutType::Int32))],
        ))
        .is_err());
    }

    #[test]
    fn duplicate_paths_fail_compilation() {
        let result = compile(&SchemaDef::new(
            "t",
            SchemaId(1),
            vec![
                prop("a", TypeDef::fixed(LayoutType::Int32)),
                prop("a", TypeDef::fixed(LayoutType::Int64)),
            ],
        ));
        assert!(result.is_err());
    }
}
