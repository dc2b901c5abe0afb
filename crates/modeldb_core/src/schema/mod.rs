//! Schema: model types, fields and composite indexes.
//!
//! A schema is assembled from a [`SchemaBinder`], which supplies the
//! declared model types and composite indexes. How a binder derives them
//! from user code is up to the binder; [`SchemaBuilder`] is the in-crate
//! binder used for programmatic schemas.

mod types;

pub use types::{
    EnumDef, EnumValue, FieldDecl, FieldKind, FieldKindTag, IndexDecl, ModelType, RefTarget,
    ScalarType, SubFieldDecl, TypeContext, ValueType,
};

use crate::error::{CoreError, CoreResult};
use crate::field_info::FieldInfos;
use crate::types::StorageSlot;
use std::collections::{BTreeMap, HashMap};

/// Supplies schema declarations.
pub trait SchemaBinder {
    /// Returns every model type with its declared fields.
    fn model_types(&self) -> Vec<ModelType>;

    /// Returns the composite index declarations.
    fn composite_indexes(&self) -> Vec<IndexDecl>;
}

/// Programmatic schema binder.
///
/// # Example
///
/// ```rust
/// use modeldb_core::schema::{FieldDecl, FieldKind, ModelType, ScalarType, SchemaBuilder};
///
/// let schema = SchemaBuilder::new()
///     .model(
///         ModelType::new("Person", 1)
///             .field(FieldDecl::new(10, "name", FieldKind::Simple(ScalarType::Text)).indexed()),
///     )
///     .build()
///     .unwrap();
/// assert!(schema.model_type_named("Person").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    types: Vec<ModelType>,
    indexes: Vec<IndexDecl>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model type.
    #[must_use]
    pub fn model(mut self, ty: ModelType) -> Self {
        self.types.push(ty);
        self
    }

    /// Adds a composite index.
    #[must_use]
    pub fn index(mut self, index: IndexDecl) -> Self {
        self.indexes.push(index);
        self
    }

    /// Binds and validates the schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the declarations are inconsistent.
    pub fn build(&self) -> CoreResult<Schema> {
        let schema = Schema::bind(self)?;
        schema.validate()?;
        Ok(schema)
    }
}

impl SchemaBinder for SchemaBuilder {
    fn model_types(&self) -> Vec<ModelType> {
        self.types.clone()
    }

    fn composite_indexes(&self) -> Vec<IndexDecl> {
        self.indexes.clone()
    }
}

/// A bound schema.
#[derive(Debug, Clone)]
pub struct Schema {
    types: BTreeMap<StorageSlot, ModelType>,
    names: HashMap<String, StorageSlot>,
    indexes: BTreeMap<StorageSlot, IndexDecl>,
    fields: FieldInfos,
}

impl Schema {
    /// Collects the binder's declarations and builds field infos.
    ///
    /// Structural checks beyond field identity are left to
    /// [`Schema::validate`].
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if two types share a slot or name, or if
    /// declarations of one field slot disagree.
    pub fn bind(binder: &dyn SchemaBinder) -> CoreResult<Self> {
        let mut types = BTreeMap::new();
        let mut names = HashMap::new();
        for ty in binder.model_types() {
            if names.insert(ty.name.clone(), ty.slot).is_some() {
                return Err(CoreError::schema_mismatch(format!(
                    "model type {} declared twice",
                    ty.name
                )));
            }
            let slot = ty.slot;
            if types.insert(slot, ty).is_some() {
                return Err(
                    CoreError::schema_mismatch("two model types share a slot").with_slot(slot)
                );
            }
        }

        let mut indexes = BTreeMap::new();
        for index in binder.composite_indexes() {
            let slot = index.slot;
            if indexes.insert(slot, index).is_some() {
                return Err(
                    CoreError::schema_mismatch("two indexes share a slot").with_slot(slot)
                );
            }
        }

        let fields = FieldInfos::build(types.values())?;
        Ok(Self {
            types,
            names,
            indexes,
            fields,
        })
    }

    /// Checks structural rules.
    ///
    /// - Slots are unique across types, fields, sub-fields and indexes
    /// - Only simple, enum and reference fields, set elements and map keys
    ///   may be indexed
    /// - Composite indexes have one to four distinct columns, cover at
    ///   least one type, and only name simple, enum or reference fields
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` naming the first violation.
    pub fn validate(&self) -> CoreResult<()> {
        let mut roles: BTreeMap<StorageSlot, &'static str> = BTreeMap::new();
        let mut claim = |slot: StorageSlot, role: &'static str| -> CoreResult<()> {
            match roles.insert(slot, role) {
                Some(previous) if previous != role || role != "field" => Err(
                    CoreError::schema_mismatch(format!("slot used as {previous} and {role}"))
                        .with_slot(slot),
                ),
                _ => Ok(()),
            }
        };

        for ty in self.types.values() {
            claim(ty.slot, "model type")?;
            let mut seen = BTreeMap::new();
            for decl in &ty.fields {
                if seen.insert(decl.slot, ()).is_some() {
                    return Err(CoreError::schema_mismatch(format!(
                        "{} declares the field twice",
                        ty.name
                    ))
                    .with_slot(decl.slot));
                }
                claim(decl.slot, "field")?;
                validate_indexing(decl)?;
            }
        }
        for info in self.fields.iter() {
            for sub in info.sub_fields() {
                claim(sub.slot(), "sub-field")?;
            }
        }
        for index in self.indexes.values() {
            claim(index.slot, "index")?;
            self.validate_index(index)?;
        }
        Ok(())
    }

    fn validate_index(&self, index: &IndexDecl) -> CoreResult<()> {
        let fail = |message: &str| {
            Err(CoreError::schema_mismatch(format!("index {}: {message}", index.name))
                .with_slot(index.slot))
        };
        if index.fields.is_empty() || index.fields.len() > 4 {
            return fail("must have one to four columns");
        }
        let mut distinct = index.fields.clone();
        distinct.sort();
        distinct.dedup();
        if distinct.len() != index.fields.len() {
            return fail("repeats a column");
        }
        let mut covered = false;
        for ty in self.types.values().filter(|ty| index.applies_to(ty)) {
            covered = true;
            for slot in &index.fields {
                let simple = ty
                    .field_decl(*slot)
                    .is_some_and(|decl| decl.kind.value_type().is_some());
                if !simple {
                    return fail("columns must be simple fields");
                }
            }
        }
        if !covered {
            return fail("no model type declares every column");
        }
        Ok(())
    }

    /// Looks up a model type by slot.
    #[must_use]
    pub fn model_type(&self, slot: StorageSlot) -> Option<&ModelType> {
        self.types.get(&slot)
    }

    /// Looks up a model type by name.
    #[must_use]
    pub fn model_type_named(&self, name: &str) -> Option<&ModelType> {
        self.names.get(name).and_then(|slot| self.types.get(slot))
    }

    /// Iterates every model type in slot order.
    pub fn model_types(&self) -> impl Iterator<Item = &ModelType> {
        self.types.values()
    }

    /// Looks up a composite index.
    #[must_use]
    pub fn composite_index(&self, slot: StorageSlot) -> Option<&IndexDecl> {
        self.indexes.get(&slot)
    }

    /// Iterates the composite indexes covering `ty`.
    pub fn indexes_for<'a>(&'a self, ty: &'a ModelType) -> impl Iterator<Item = &'a IndexDecl> {
        self.indexes.values().filter(move |index| index.applies_to(ty))
    }

    /// Returns the field identity registry.
    #[must_use]
    pub fn field_infos(&self) -> &FieldInfos {
        &self.fields
    }

    /// Returns the number of key columns of the index relation stored
    /// under `slot`, if there is one.
    ///
    /// Composite indexes have one column per field; indexed fields, set
    /// elements and map keys have a single column.
    #[must_use]
    pub fn index_arity(&self, slot: StorageSlot) -> Option<usize> {
        if let Some(index) = self.indexes.get(&slot) {
            return Some(index.fields.len());
        }
        if let Some(info) = self.fields.field(slot) {
            return (info.is_value_indexed()).then_some(1);
        }
        self.fields
            .sub_field(slot)
            .and_then(|(sub, _)| sub.is_indexed().then_some(1))
    }
}

fn validate_indexing(decl: &FieldDecl) -> CoreResult<()> {
    let fail = |slot: StorageSlot, message: &str| {
        Err(CoreError::schema_mismatch(message.to_string()).with_slot(slot))
    };
    if decl.indexed && decl.kind.value_type().is_none() {
        return fail(decl.slot, "only simple fields can be indexed");
    }
    match &decl.kind {
        FieldKind::List(element) if element.indexed => {
            fail(element.slot, "list elements cannot be indexed")
        }
        FieldKind::Map { value, .. } if value.indexed => {
            fail(value.slot, "map values cannot be indexed")
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(slot: u32, name: &str) -> FieldDecl {
        FieldDecl::new(slot, name, FieldKind::Simple(ScalarType::Text))
    }

    fn person() -> ModelType {
        ModelType::new("Person", 1)
            .field(text(10, "name").indexed())
            .field(FieldDecl::new(11, "age", FieldKind::Simple(ScalarType::Integer)))
    }

    #[test]
    fn build_valid_schema() {
        let schema = SchemaBuilder::new()
            .model(person())
            .index(IndexDecl::new("by_name_age", 30, [10, 11]))
            .build()
            .unwrap();
        assert_eq!(schema.index_arity(StorageSlot::new(30)), Some(2));
        assert_eq!(schema.index_arity(StorageSlot::new(10)), Some(1));
        assert_eq!(schema.index_arity(StorageSlot::new(11)), None);
        assert_eq!(schema.indexes_for(&person()).count(), 1);
    }

    #[test]
    fn duplicate_type_name_rejected() {
        let result = SchemaBuilder::new()
            .model(person())
            .model(ModelType::new("Person", 2))
            .build();
        assert!(matches!(result, Err(CoreError::SchemaMismatch { .. })));
    }

    #[test]
    fn slot_reused_across_roles_rejected() {
        let result = SchemaBuilder::new()
            .model(person())
            .index(IndexDecl::new("clash", 10, [11]))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn index_over_complex_field_rejected() {
        let ty = person().field(FieldDecl::new(12, "visits", FieldKind::Counter));
        let result = SchemaBuilder::new()
            .model(ty)
            .index(IndexDecl::new("by_visits", 30, [12]))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn index_needs_a_covered_type() {
        let result = SchemaBuilder::new()
            .model(person())
            .index(IndexDecl::new("by_missing", 30, [10, 99]))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn too_many_columns_rejected() {
        let ty = person()
            .field(text(12, "a"))
            .field(text(13, "b"))
            .field(text(14, "c"));
        let result = SchemaBuilder::new()
            .model(ty)
            .index(IndexDecl::new("wide", 30, [10, 11, 12, 13, 14]))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn indexed_list_element_rejected() {
        let ty = person().field(FieldDecl::new(
            12,
            "history",
            FieldKind::List(
                SubFieldDecl::new(13, "entry", ValueType::Scalar(ScalarType::Text)).indexed(),
            ),
        ));
        assert!(SchemaBuilder::new().model(ty).build().is_err());
    }

    #[test]
    fn bind_skips_structural_checks() {
        let builder = SchemaBuilder::new()
            .model(person())
            .index(IndexDecl::new("wide", 30, Vec::<u32>::new()));
        let schema = Schema::bind(&builder).unwrap();
        assert!(schema.validate().is_err());
    }
}
