use crate::error::RowError;
use crate::layout::resolver::LayoutRegistry;
use crate::row::buffer::{BufferResizer, RowBuffer, ROW_VERSION};
use crate::row::cursor::RowCursor;
use crate::row::sparse::UpdateOptions;
use crate::schema::{PropertyDef, SchemaDef, TypeDef};
use crate::types::{LayoutType, SchemaId, TypeArgument, TypeArgumentList};

fn test_namespace() -> LayoutRegistry {
    LayoutRegistry::compile_namespace(&[
        SchemaDef::new(
            "order",
            SchemaId(1),
            vec![
                PropertyDef::new("id", TypeDef::fixed(LayoutType::Int64)),
                PropertyDef::new("qty", TypeDef::fixed(LayoutType::Int32).with_nullable()),
                PropertyDef::new("paid", TypeDef::fixed(LayoutType::Bool)),
                PropertyDef::new(
                    "note",
                    TypeDef::variable(LayoutType::Utf8).with_length(64),
                ),
                PropertyDef::new(
                    "blob",
                    TypeDef::variable(LayoutType::Binary).with_nullable(),
                ),
            ],
        ),
        SchemaDef::new(
            "address",
            SchemaId(2),
            vec![
                PropertyDef::new("zip", TypeDef::fixed(LayoutType::Int32)),
                PropertyDef::new("city", TypeDef::variable(LayoutType::Utf8)),
            ],
        ),
        SchemaDef::new(
            "sized",
            SchemaId(3),
            vec![PropertyDef::new(
                "len",
                TypeDef::fixed(LayoutType::Int32).with_row_buffer_size(),
            )],
        ),
    ])
    .unwrap()
}

fn make_row(registry: &LayoutRegistry, id: i32) -> RowBuffer<'_> {
    let layout = registry.get(SchemaId(id)).unwrap();
    let mut row = RowBuffer::new(32, registry);
    row.init_layout(ROW_VERSION, &layout);
    row
}

fn i32_args() -> TypeArgumentList {
    TypeArgumentList::new(vec![TypeArgument::new(LayoutType::Int32)])
}

fn utf8_args() -> TypeArgumentList {
    TypeArgumentList::new(vec![TypeArgument::new(LayoutType::Utf8)])
}

#[test]
fn fixed_columns_roundtrip_and_null_bits() {
    let registry = test_namespace();
    let layout = registry.get(SchemaId(1)).unwrap();
    let mut row = make_row(&registry, 1);
    let root = RowCursor::create(&row).unwrap();

    // Non-nullable columns read as defaults; nullable ones as absent.
    assert_eq!(row.read_fixed_i64(&root, layout.column("id").unwrap()), Ok(0));
    assert_eq!(
        row.read_fixed_i32(&root, layout.column("qty").unwrap()),
        Err(RowError::NotFound)
    );
    assert_eq!(
        row.read_fixed_bool(&root, layout.column("paid").unwrap()),
        Ok(false)
    );

    row.write_fixed_i64(&root, layout.column("id").unwrap(), 123).unwrap();
    row.write_fixed_i32(&root, layout.column("qty").unwrap(), -7).unwrap();
    row.write_fixed_bool(&root, layout.column("paid").unwrap(), true).unwrap();

    assert_eq!(row.read_fixed_i64(&root, layout.column("id").unwrap()), Ok(123));
    assert_eq!(row.read_fixed_i32(&root, layout.column("qty").unwrap()), Ok(-7));
    assert_eq!(row.read_fixed_bool(&root, layout.column("paid").unwrap()), Ok(true));

    // Fixed writes never change the row length.
    assert_eq!(row.length(), crate::row::HEADER_SIZE + layout.size());
}

#[test]
fn delete_fixed_requires_nullability() {
    let registry = test_namespace();
    let layout = registry.get(SchemaId(1)).unwrap();
    let mut row = make_row(&registry, 1);
    let root = RowCursor::create(&row).unwrap();

    row.write_fixed_i32(&root, layout.column("qty").unwrap(), 9).unwrap();
    row.delete_fixed(&root, layout.column("qty").unwrap()).unwrap();
    assert_eq!(
        row.read_fixed_i32(&root, layout.column("qty").unwrap()),
        Err(RowError::NotFound)
    );

    assert_eq!(
        row.delete_fixed(&root, layout.column("id").unwrap()),
        Err(RowError::TypeMismatch)
    );
}

#[test]
fn fixed_type_confusion_is_rejected() {
    let registry = test_namespace();
    let layout = registry.get(SchemaId(1)).unwrap();
    let mut row = make_row(&registry, 1);
    let root = RowCursor::create(&row).unwrap();

    assert_eq!(
        row.read_fixed_i32(&root, layout.column("id").unwrap()),
        Err(RowError::TypeMismatch)
    );
    assert_eq!(
        row.write_fixed_i64(&root, layout.column("qty").unwrap(), 1),
        Err(RowError::TypeMismatch)
    );
}

#[test]
fn variable_columns_resize_in_place() {
    let registry = test_namespace();
    let layout = registry.get(SchemaId(1)).unwrap();
    let mut row = make_row(&registry, 1);
    let root = RowCursor::create(&row).unwrap();
    let note = layout.column("note").unwrap();
    let blob = layout.column("blob").unwrap();

    assert_eq!(row.read_variable_utf8(&root, note), Err(RowError::NotFound));

    // Later ordinal first: offsets are recomputed by walking presence bits.
    row.write_variable_binary(&root, blob, &[1, 2, 3]).unwrap();
    let before = row.length();
    row.write_variable_utf8(&root, note, "a longer note").unwrap();
    assert!(row.length() > before);
    assert_eq!(row.read_variable_utf8(&root, note), Ok("a longer note"));
    assert_eq!(row.read_variable_binary(&root, blob), Ok(&[1u8, 2, 3][..]));

    // Shrinking the first value strictly shortens the row and keeps the
    // second readable; growing it back strictly lengthens it.
    let grown = row.length();
    row.write_variable_utf8(&root, note, "hi").unwrap();
    assert!(row.length() < grown);
    assert_eq!(row.read_variable_utf8(&root, note), Ok("hi"));
    assert_eq!(row.read_variable_binary(&root, blob), Ok(&[1u8, 2, 3][..]));
    let shrunk = row.length();
    row.write_variable_utf8(&root, note, "a longer note").unwrap();
    assert!(row.length() > shrunk);
    row.write_variable_utf8(&root, note, "hi").unwrap();

    row.delete_variable(&root, blob).unwrap();
    assert_eq!(row.read_variable_binary(&root, blob), Err(RowError::NotFound));
    assert_eq!(row.delete_variable(&root, note), Err(RowError::TypeMismatch));
}

#[test]
fn variable_length_bound_is_enforced() {
    let registry = test_namespace();
    let layout = registry.get(SchemaId(1)).unwrap();
    let mut row = make_row(&registry, 1);
    let root = RowCursor::create(&row).unwrap();
    let note = layout.column("note").unwrap();

    let long = "x".repeat(65);
    assert_eq!(
        row.write_variable_utf8(&root, note, &long),
        Err(RowError::TooBig)
    );
    row.write_variable_utf8(&root, note, &"x".repeat(64)).unwrap();
}

#[test]
fn sparse_reads_are_insertion_order_independent() {
    let registry = test_namespace();
    let mut values = Vec::new();
    for order in [["x", "s", "b"], ["b", "x", "s"]] {
        let mut row = make_row(&registry, 1);
        for path in order {
            let mut root = RowCursor::create(&row).unwrap();
            row.find(&mut root, path).unwrap();
            match path {
                "x" => row.write_sparse_i32(&mut root, -42, UpdateOptions::Upsert).unwrap(),
                "s" => row
                    .write_sparse_utf8(&mut root, "hello", UpdateOptions::Upsert)
                    .unwrap(),
                _ => row.write_sparse_bool(&mut root, true, UpdateOptions::Upsert).unwrap(),
            }
        }
        let mut root = RowCursor::create(&row).unwrap();
        assert!(row.find(&mut root, "x").unwrap());
        let x = row.read_sparse_i32(&root).unwrap();
        assert!(row.find(&mut root, "s").unwrap());
        let s = row.read_sparse_utf8(&root).unwrap().to_string();
        assert!(row.find(&mut root, "b").unwrap());
        let b = row.read_sparse_bool(&root).unwrap();
        values.push((x, s, b));
    }
    assert_eq!(values[0], values[1]);
    assert_eq!(values[0], (-42, "hello".to_string(), true));
}

#[test]
fn sparse_update_options_semantics() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "x").unwrap();
    assert_eq!(
        row.write_sparse_i32(&mut root, 1, UpdateOptions::Update),
        Err(RowError::NotFound)
    );
    row.write_sparse_i32(&mut root, 1, UpdateOptions::Insert).unwrap();

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "x").unwrap());
    assert_eq!(
        row.write_sparse_i32(&mut root, 2, UpdateOptions::Insert),
        Err(RowError::Exists)
    );
    row.write_sparse_i32(&mut root, 2, UpdateOptions::Update).unwrap();
    assert_eq!(row.read_sparse_i32(&root), Ok(2));
}

#[test]
fn insert_at_requires_an_indexed_scope() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    // Absent field on the root (a path scope): the write fails and nothing
    // is materialized.
    let mut root = RowCursor::create(&row).unwrap();
    assert!(!row.find(&mut root, "x").unwrap());
    assert_eq!(
        row.write_sparse_i32(&mut root, 5, UpdateOptions::InsertAt),
        Err(RowError::TypeConstraint)
    );
    let mut root = RowCursor::create(&row).unwrap();
    assert!(!row.find(&mut root, "x").unwrap());

    // Same answer once the field exists.
    row.write_sparse_i32(&mut root, 5, UpdateOptions::Upsert).unwrap();
    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "x").unwrap());
    assert_eq!(
        row.write_sparse_i32(&mut root, 6, UpdateOptions::InsertAt),
        Err(RowError::TypeConstraint)
    );
    assert_eq!(row.read_sparse_i32(&root), Ok(5));
}

#[test]
fn sparse_field_type_can_change_on_upsert() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "memo").unwrap();
    row.write_sparse_utf8(&mut root, "text", UpdateOptions::Upsert).unwrap();

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "memo").unwrap());
    row.write_sparse_null(&mut root, UpdateOptions::Upsert).unwrap();

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "memo").unwrap());
    assert_eq!(row.read_sparse_utf8(&root), Err(RowError::TypeMismatch));
    assert_eq!(row.read_sparse_null(&root), Ok(()));
}

#[test]
fn sparse_varint_and_delete() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "v").unwrap();
    row.write_sparse_varint(&mut root, -300, UpdateOptions::Upsert).unwrap();

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "v").unwrap());
    assert_eq!(row.read_sparse_varint(&root), Ok(-300));

    row.delete_sparse(&mut root).unwrap();
    let mut root = RowCursor::create(&row).unwrap();
    assert!(!row.find(&mut root, "v").unwrap());

    // Deleting an absent field is a no-op.
    row.delete_sparse(&mut root).unwrap();
}

#[test]
fn typed_array_append_read_delete() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "nums").unwrap();
    let mut arr = row
        .write_scope(&mut root, LayoutType::TypedArray, &i32_args(), UpdateOptions::Upsert)
        .unwrap();

    for (i, v) in [10, 20, 30].into_iter().enumerate() {
        row.move_to(&mut arr, i).unwrap();
        row.write_sparse_i32(&mut arr, v, UpdateOptions::Upsert).unwrap();
    }
    assert_eq!(arr.count(), 3);

    assert!(row.move_to(&mut arr, 1).unwrap());
    row.delete_sparse(&mut arr).unwrap();
    assert_eq!(arr.count(), 2);

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "nums").unwrap());
    let mut arr = row.read_scope(&root).unwrap();
    assert!(row.move_to(&mut arr, 0).unwrap());
    assert_eq!(row.read_sparse_i32(&arr), Ok(10));
    assert!(row.move_to(&mut arr, 1).unwrap());
    assert_eq!(row.read_sparse_i32(&arr), Ok(30));
    assert!(!row.move_to(&mut arr, 2).unwrap());
}

#[test]
fn typed_array_rejects_foreign_element_types() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "nums").unwrap();
    let mut arr = row
        .write_scope(&mut root, LayoutType::TypedArray, &i32_args(), UpdateOptions::Upsert)
        .unwrap();
    assert_eq!(
        row.write_sparse_i64(&mut arr, 1, UpdateOptions::Upsert),
        Err(RowError::TypeConstraint)
    );
}

#[test]
fn typed_set_keeps_sorted_unique_order() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "tags").unwrap();
    let mut set = row
        .write_scope(&mut root, LayoutType::TypedSet, &utf8_args(), UpdateOptions::Upsert)
        .unwrap();

    for word in ["banana", "apple", "cherry"] {
        row.write_sparse_utf8(&mut set, word, UpdateOptions::Insert).unwrap();
    }
    assert_eq!(
        row.write_sparse_utf8(&mut set, "apple", UpdateOptions::Insert),
        Err(RowError::Exists)
    );
    row.write_sparse_utf8(&mut set, "apple", UpdateOptions::Upsert).unwrap();
    assert_eq!(set.count(), 3);

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "tags").unwrap());
    let mut set = row.read_scope(&root).unwrap();
    let mut words = Vec::new();
    while row.move_next(&mut set).unwrap() {
        words.push(row.read_sparse_utf8(&set).unwrap().to_string());
    }
    assert_eq!(words, ["apple", "banana", "cherry"]);
}

#[test]
fn typed_set_find_delete_reinsert() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "ids").unwrap();
    let mut set = row
        .write_scope(&mut root, LayoutType::TypedSet, &i32_args(), UpdateOptions::Upsert)
        .unwrap();
    for v in [9, 3, 5] {
        row.write_sparse_i32(&mut set, v, UpdateOptions::Insert).unwrap();
    }

    assert!(row.typed_collection_find_i32(&mut set, 5).unwrap());
    row.delete_sparse(&mut set).unwrap();
    assert_eq!(set.count(), 2);
    assert!(!row.typed_collection_find_i32(&mut set, 5).unwrap());

    row.write_sparse_i32(&mut set, 5, UpdateOptions::Insert).unwrap();
    assert!(row.typed_collection_find_i32(&mut set, 5).unwrap());
    assert_eq!(set.count(), 3);
}

#[test]
fn deferred_appends_rebuild_to_same_bytes_as_sorted_inserts() {
    let registry = test_namespace();

    let mut sorted = make_row(&registry, 1);
    let mut root = RowCursor::create(&sorted).unwrap();
    sorted.find(&mut root, "ids").unwrap();
    let mut set = sorted
        .write_scope(&mut root, LayoutType::TypedSet, &i32_args(), UpdateOptions::Upsert)
        .unwrap();
    for v in [9, 3, 5] {
        sorted.write_sparse_i32(&mut set, v, UpdateOptions::Insert).unwrap();
    }

    let mut deferred = make_row(&registry, 1);
    let mut root = RowCursor::create(&deferred).unwrap();
    deferred.find(&mut root, "ids").unwrap();
    let mut set = deferred
        .write_scope(&mut root, LayoutType::TypedSet, &i32_args(), UpdateOptions::Upsert)
        .unwrap()
        .defer_unique_index();
    for v in [9, 3, 5] {
        deferred.write_sparse_i32(&mut set, v, UpdateOptions::Insert).unwrap();
    }
    deferred.typed_collection_unique_index_rebuild(&mut set).unwrap();

    assert_eq!(sorted.as_bytes(), deferred.as_bytes());
}

#[test]
fn rebuild_rejects_duplicate_elements() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "ids").unwrap();
    let mut set = row
        .write_scope(&mut root, LayoutType::TypedSet, &i32_args(), UpdateOptions::Upsert)
        .unwrap()
        .defer_unique_index();
    for v in [4, 4] {
        row.write_sparse_i32(&mut set, v, UpdateOptions::Insert).unwrap();
    }
    assert_eq!(
        row.typed_collection_unique_index_rebuild(&mut set),
        Err(RowError::Exists)
    );
}

#[test]
fn typed_map_entries_move_from_staging() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);
    let map_args = TypeArgumentList::new(vec![
        TypeArgument::new(LayoutType::Utf8),
        TypeArgument::new(LayoutType::Int32),
    ]);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "m").unwrap();
    row.write_scope(&mut root, LayoutType::TypedMap, &map_args, UpdateOptions::Upsert)
        .unwrap();

    for (key, value) in [("b", 2), ("a", 1)] {
        // Stage the entry as a tuple at the root, then splice it in.
        let mut stage = RowCursor::create(&row).unwrap();
        row.find(&mut stage, "staged").unwrap();
        let mut tuple = row
            .write_scope(&mut stage, LayoutType::TypedTuple, &map_args, UpdateOptions::Upsert)
            .unwrap();
        row.move_to(&mut tuple, 0).unwrap();
        row.write_sparse_utf8(&mut tuple, key, UpdateOptions::Update).unwrap();
        row.move_to(&mut tuple, 1).unwrap();
        row.write_sparse_i32(&mut tuple, value, UpdateOptions::Update).unwrap();

        let mut map_root = RowCursor::create(&row).unwrap();
        assert!(row.find(&mut map_root, "m").unwrap());
        let mut map = row.read_scope(&map_root).unwrap();
        let mut src = RowCursor::create(&row).unwrap();
        assert!(row.find(&mut src, "staged").unwrap());
        row.typed_collection_move_field(&mut map, &mut src, UpdateOptions::Insert)
            .unwrap();
    }

    // The staged field is consumed by the move.
    let mut root = RowCursor::create(&row).unwrap();
    assert!(!row.find(&mut root, "staged").unwrap());

    // Entries come back sorted by encoded bytes: "a" before "b".
    assert!(row.find(&mut root, "m").unwrap());
    let mut map = row.read_scope(&root).unwrap();
    assert_eq!(map.count(), 2);
    let mut entries = Vec::new();
    while row.move_next(&mut map).unwrap() {
        let mut entry = row.read_scope(&map).unwrap();
        row.move_to(&mut entry, 0).unwrap();
        let key = row.read_sparse_utf8(&entry).unwrap().to_string();
        row.move_to(&mut entry, 1).unwrap();
        let value = row.read_sparse_i32(&entry).unwrap();
        entries.push((key, value));
    }
    assert_eq!(entries, [("a".to_string(), 1), ("b".to_string(), 2)]);
}

#[test]
fn tuple_elements_always_exist() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);
    let args = TypeArgumentList::new(vec![
        TypeArgument::new(LayoutType::Int32),
        TypeArgument::new(LayoutType::Utf8),
    ]);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "pair").unwrap();
    let mut tuple = row
        .write_scope(&mut root, LayoutType::TypedTuple, &args, UpdateOptions::Upsert)
        .unwrap();

    // Defaults materialize at scope creation.
    assert!(row.move_to(&mut tuple, 0).unwrap());
    assert_eq!(row.read_sparse_i32(&tuple), Ok(0));
    assert!(row.move_to(&mut tuple, 1).unwrap());
    assert_eq!(row.read_sparse_utf8(&tuple), Ok(""));

    assert_eq!(
        row.write_sparse_utf8(&mut tuple, "x", UpdateOptions::Insert),
        Err(RowError::Exists)
    );
    row.write_sparse_utf8(&mut tuple, "pear", UpdateOptions::Update).unwrap();
    assert!(row.move_to(&mut tuple, 0).unwrap());
    row.write_sparse_i32(&mut tuple, 7, UpdateOptions::Update).unwrap();

    assert_eq!(row.delete_sparse(&mut tuple), Err(RowError::TypeConstraint));

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "pair").unwrap());
    let mut tuple = row.read_scope(&root).unwrap();
    assert!(row.move_to(&mut tuple, 0).unwrap());
    assert_eq!(row.read_sparse_i32(&tuple), Ok(7));
    assert!(row.move_to(&mut tuple, 1).unwrap());
    assert_eq!(row.read_sparse_utf8(&tuple), Ok("pear"));
}

#[test]
fn tagged_union_leads_with_uint8_tag() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);
    let args = TypeArgumentList::new(vec![
        TypeArgument::new(LayoutType::UInt8),
        TypeArgument::new(LayoutType::Utf8),
    ]);

    let bad = TypeArgumentList::new(vec![
        TypeArgument::new(LayoutType::Int32),
        TypeArgument::new(LayoutType::Utf8),
    ]);
    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "tagged").unwrap();
    assert_eq!(
        row.write_scope(&mut root, LayoutType::Tagged, &bad, UpdateOptions::Upsert)
            .err(),
        Some(RowError::TypeConstraint)
    );

    let mut tagged = row
        .write_scope(&mut root, LayoutType::Tagged, &args, UpdateOptions::Upsert)
        .unwrap();
    row.move_to(&mut tagged, 0).unwrap();
    row.write_sparse_u8(&mut tagged, 1, UpdateOptions::Update).unwrap();
    row.move_to(&mut tagged, 1).unwrap();
    row.write_sparse_utf8(&mut tagged, "payload", UpdateOptions::Update).unwrap();

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "tagged").unwrap());
    let mut tagged = row.read_scope(&root).unwrap();
    assert!(row.move_to(&mut tagged, 0).unwrap());
    assert_eq!(row.read_sparse_u8(&tagged), Ok(1));
    assert!(row.move_to(&mut tagged, 1).unwrap());
    assert_eq!(row.read_sparse_utf8(&tagged), Ok("payload"));
}

#[test]
fn nullable_scope_tracks_presence() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "maybe").unwrap();
    let mut cell = row
        .write_scope(&mut root, LayoutType::Nullable, &i32_args(), UpdateOptions::Upsert)
        .unwrap();
    assert!(!row.move_next(&mut cell).unwrap());

    row.write_sparse_i32(&mut cell, 5, UpdateOptions::Upsert).unwrap();
    assert_eq!(row.read_sparse_i32(&cell), Ok(5));

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "maybe").unwrap());
    let mut cell = row.read_scope(&root).unwrap();
    assert!(row.move_next(&mut cell).unwrap());
    assert_eq!(row.read_sparse_i32(&cell), Ok(5));

    row.delete_sparse(&mut cell).unwrap();
    assert!(!row.move_next(&mut cell).unwrap());
}

#[test]
fn nested_udt_carries_its_own_layout() {
    let registry = test_namespace();
    let address = registry.get(SchemaId(2)).unwrap();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "ship").unwrap();
    let child = row
        .write_scope(
            &mut root,
            LayoutType::Udt,
            &TypeArgumentList::for_udt(SchemaId(2)),
            UpdateOptions::Upsert,
        )
        .unwrap();

    row.write_fixed_i32(&child, address.column("zip").unwrap(), 98052).unwrap();
    row.write_variable_utf8(&child, address.column("city").unwrap(), "Redmond").unwrap();

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "ship").unwrap());
    let child = row.read_scope(&root).unwrap();
    assert_eq!(
        row.read_fixed_i32(&child, address.column("zip").unwrap()),
        Ok(98052)
    );
    assert_eq!(
        row.read_variable_utf8(&child, address.column("city").unwrap()),
        Ok("Redmond")
    );
}

#[test]
fn unresolvable_udt_reference_fails_at_write() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "ghost").unwrap();
    assert_eq!(
        row.write_scope(
            &mut root,
            LayoutType::Udt,
            &TypeArgumentList::for_udt(SchemaId(404)),
            UpdateOptions::Upsert,
        )
        .err(),
        Some(RowError::TypeConstraint)
    );
}

#[test]
fn read_only_cursors_block_every_mutation() {
    let registry = test_namespace();
    let layout = registry.get(SchemaId(1)).unwrap();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "tags").unwrap();
    let mut set = row
        .write_scope(&mut root, LayoutType::TypedSet, &utf8_args(), UpdateOptions::Upsert)
        .unwrap();
    row.write_sparse_utf8(&mut set, "a", UpdateOptions::Insert).unwrap();

    let ro = RowCursor::create(&row).unwrap().as_read_only();
    assert_eq!(
        row.write_fixed_i64(&ro, layout.column("id").unwrap(), 1),
        Err(RowError::InsufficientPermissions)
    );
    assert_eq!(
        row.write_variable_utf8(&ro, layout.column("note").unwrap(), "x"),
        Err(RowError::InsufficientPermissions)
    );
    assert_eq!(
        row.delete_fixed(&ro, layout.column("qty").unwrap()),
        Err(RowError::InsufficientPermissions)
    );

    // Immutability propagates through scope descent.
    let mut ro = ro;
    assert!(row.find(&mut ro, "tags").unwrap());
    let mut set = row.read_scope(&ro).unwrap();
    assert!(set.is_immutable());
    assert_eq!(
        row.write_sparse_utf8(&mut set, "b", UpdateOptions::Insert),
        Err(RowError::InsufficientPermissions)
    );
    assert!(row.move_next(&mut set).unwrap());
    assert_eq!(
        row.delete_sparse(&mut set),
        Err(RowError::InsufficientPermissions)
    );
    assert_eq!(row.read_sparse_utf8(&set), Ok("a"));
}

#[test]
fn object_field_overwritten_by_null_is_no_longer_a_scope() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "a").unwrap();
    let mut obj = row
        .write_scope(&mut root, LayoutType::Object, &TypeArgumentList::empty(), UpdateOptions::Upsert)
        .unwrap();
    row.find(&mut obj, "b").unwrap();
    row.write_sparse_i32(&mut obj, 42, UpdateOptions::Upsert).unwrap();

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "a").unwrap());
    let mut obj = row.read_scope(&root).unwrap();
    assert!(row.find(&mut obj, "b").unwrap());
    assert_eq!(row.read_sparse_i32(&obj), Ok(42));

    // Overwriting the object with a null scalar drops the whole subtree.
    row.write_sparse_null(&mut root, UpdateOptions::Upsert).unwrap();

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "a").unwrap());
    assert_eq!(row.read_sparse_null(&root), Ok(()));
    assert_eq!(row.read_scope(&root).err(), Some(RowError::TypeMismatch));
}

#[test]
fn skip_steps_over_a_mutated_child_scope() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "obj").unwrap();
    row.write_scope(&mut root, LayoutType::Object, &TypeArgumentList::empty(), UpdateOptions::Upsert)
        .unwrap();
    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "after").unwrap();
    row.write_sparse_i32(&mut root, 77, UpdateOptions::Upsert).unwrap();

    // Mutate the object through a child cursor, growing its extent.
    let mut parent = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut parent, "obj").unwrap());
    let mut child = row.read_scope(&parent).unwrap();
    row.find(&mut child, "k").unwrap();
    row.write_sparse_utf8(&mut child, "nested value", UpdateOptions::Upsert).unwrap();

    row.skip(&mut parent).unwrap();
    assert!(row.move_next(&mut parent).unwrap());
    assert_eq!(row.read_sparse_i32(&parent), Ok(77));
}

#[test]
fn create_for_append_skips_the_scan() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut cur = RowCursor::create_for_append(&row, "fast").unwrap();
    row.write_sparse_u64(&mut cur, 999, UpdateOptions::Upsert).unwrap();

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "fast").unwrap());
    assert_eq!(row.read_sparse_u64(&root), Ok(999));
}

#[test]
fn row_buffer_size_column_is_patched_last() {
    let registry = test_namespace();
    let layout = registry.get(SchemaId(3)).unwrap();
    let mut row = make_row(&registry, 3);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "extra").unwrap();
    row.write_sparse_utf8(&mut root, "payload", UpdateOptions::Upsert).unwrap();

    let root = RowCursor::create(&row).unwrap();
    row.patch_row_buffer_size(&root).unwrap();
    assert_eq!(
        row.read_fixed_i32(&root, layout.column("len").unwrap()),
        Ok(row.length() as i32)
    );
}

#[test]
fn buffer_grows_through_the_resizer() {
    struct Doubling;
    impl BufferResizer for Doubling {
        fn resize(&self, minimum: usize, mut existing: Vec<u8>) -> Vec<u8> {
            let target = minimum.max(existing.len() * 2);
            existing.resize(target, 0);
            existing
        }
    }

    let registry = test_namespace();
    let layout = registry.get(SchemaId(1)).unwrap();
    let mut row = RowBuffer::with_resizer(16, &registry, Box::new(Doubling));
    row.init_layout(ROW_VERSION, &layout);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "big").unwrap();
    let text = "y".repeat(200);
    row.write_sparse_utf8(&mut root, &text, UpdateOptions::Upsert).unwrap();

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "big").unwrap());
    assert_eq!(row.read_sparse_utf8(&root), Ok(text.as_str()));
}

#[test]
fn untyped_array_mixes_element_types() {
    let registry = test_namespace();
    let mut row = make_row(&registry, 1);

    let mut root = RowCursor::create(&row).unwrap();
    row.find(&mut root, "list").unwrap();
    let mut arr = row
        .write_scope(&mut root, LayoutType::Array, &TypeArgumentList::empty(), UpdateOptions::Upsert)
        .unwrap();

    row.write_sparse_i32(&mut arr, 1, UpdateOptions::Upsert).unwrap();
    row.skip(&mut arr).unwrap();
    row.write_sparse_utf8(&mut arr, "two", UpdateOptions::Upsert).unwrap();
    row.skip(&mut arr).unwrap();
    row.write_sparse_bool(&mut arr, true, UpdateOptions::Upsert).unwrap();

    let mut root = RowCursor::create(&row).unwrap();
    assert!(row.find(&mut root, "list").unwrap());
    let mut arr = row.read_scope(&root).unwrap();
    assert!(row.move_next(&mut arr).unwrap());
    assert_eq!(row.read_sparse_i32(&arr), Ok(1));
    assert!(row.move_next(&mut arr).unwrap());
    assert_eq!(row.read_sparse_utf8(&arr), Ok("two"));
    assert!(row.move_next(&mut arr).unwrap());
    assert_eq!(row.read_sparse_bool(&arr), Ok(true));
    assert!(!row.move_next(&mut arr).unwrap());
}
