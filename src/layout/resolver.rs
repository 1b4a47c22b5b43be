//! # Layout Resolution
//!
//! `LayoutResolver` maps a schema id to its compiled layout; the row codec
//! consults it when entering Udt scopes and when attaching a cursor to a
//! buffer's root schema. `LayoutRegistry` is the standard implementation:
//! it compiles a whole namespace of schemas up front, validating that every
//! Udt reference resolves inside the namespace, and is immutable afterwards
//! (safe to share across buffers and threads).

use std::sync::Arc;

use eyre::{ensure, Result};
use hashbrown::HashMap;

use crate::layout::{compiler, Layout};
use crate::schema::{SchemaDef, TypeDef};
use crate::types::SchemaId;

/// Maps schema ids to compiled layouts.
pub trait LayoutResolver {
    fn resolve(&self, schema_id: SchemaId) -> Option<Arc<Layout>>;
}

/// A compiled namespace of schemas.
#[derive(Debug, Default)]
pub struct LayoutRegistry {
    layouts: HashMap<i32, Arc<Layout>>,
}

impl LayoutRegistry {
    /// Compiles every schema in the namespace. Fails on duplicate schema ids
    /// and on Udt references to schemas the namespace does not contain.
    pub fn compile_namespace(schemas: &[SchemaDef]) -> Result<Self> {
        let mut known = HashMap::with_capacity(schemas.len());
        for def in schemas {
            ensure!(
                known.insert(def.schema_id.0, &def.name).is_none(),
                "duplicate schema id {} in namespace",
                def.schema_id.0
            );
        }

        for def in schemas {
            for prop in &def.properties {
                check_refs(&def.name, &prop.type_def, &known)?;
            }
        }

        let mut layouts = HashMap::with_capacity(schemas.len());
        for def in schemas {
            let layout = compiler::compile(def)?;
            layouts.insert(def.schema_id.0, Arc::new(layout));
        }
        Ok(Self { layouts })
    }

    /// Registry over a single already-compiled layout.
    pub fn from_layout(layout: Layout) -> Self {
        let mut layouts = HashMap::with_capacity(1);
        layouts.insert(layout.schema_id.0, Arc::new(layout));
        Self { layouts }
    }

    pub fn get(&self, schema_id: SchemaId) -> Option<Arc<Layout>> {
        self.layouts.get(&schema_id.0).cloned()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

impl LayoutResolver for LayoutRegistry {
    fn resolve(&self, schema_id: SchemaId) -> Option<Arc<Layout>> {
        self.get(schema_id)
    }
}

fn check_refs(schema: &str, def: &TypeDef, known: &HashMap<i32, &String>) -> Result<()> {
    if let Some(id) = def.schema_ref {
        ensure!(
            known.contains_key(&id.0),
            "schema '{}' references unresolvable schema id {}",
            schema,
            id.0
        );
    }
    for arg in &def.type_args {
        check_refs(schema, arg, known)?;
    }
    for child in &def.properties {
        check_refs(schema, &child.type_def, known)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyDef;
    use crate::types::LayoutType;

    #[test]
    fn namespace_resolves_compiled_schemas() {
        let registry = LayoutRegistry::compile_namespace(&[
            SchemaDef::new(
                "inner",
                SchemaId(1),
                vec![PropertyDef::new("x", TypeDef::fixed(LayoutType::Int32))],
            ),
            SchemaDef::new(
                "outer",
                SchemaId(2),
                vec![PropertyDef::new("child", TypeDef::udt(SchemaId(1)))],
            ),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve(SchemaId(1)).unwrap().name(), "inner");
        assert!(registry.resolve(SchemaId(9)).is_none());
    }

    #[test]
    fn unresolvable_udt_reference_fails_namespace() {
        let result = LayoutRegistry::compile_namespace(&[SchemaDef::new(
            "outer",
            SchemaId(2),
            vec![PropertyDef::new("child", TypeDef::udt(SchemaId(404)))],
        )]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("unresolvable"));
    }

    #[test]
    fn duplicate_schema_ids_fail_namespace() {
        let result = LayoutRegistry::compile_namespace(&[
            SchemaDef::new("a", SchemaId(1), vec![]),
            SchemaDef::new("b", SchemaId(1), vec![]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn nested_references_inside_scopes_are_checked() {
        let result = LayoutRegistry::compile_namespace(&[SchemaDef::new(
            "outer",
            SchemaId(2),
            vec![PropertyDef::new(
                "children",
                TypeDef::typed_array(TypeDef::udt(SchemaId(404))),
            )],
        )]);
        assert!(result.is_err());
    }
}
