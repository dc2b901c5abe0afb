//! Field identity across model types.
//!
//! A storage slot names one field no matter how many model types declare
//! it. [`FieldInfo`] folds every declaration of a slot into one aggregate:
//! the names it is known by, whether it is indexed, and the narrowest type
//! every declaration agrees on.

use crate::error::{CoreError, CoreResult};
use crate::schema::{FieldDecl, FieldKind, FieldKindTag, ModelType, TypeContext, ValueType};
use crate::types::StorageSlot;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

/// The resolved type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// A simple, enum or reference field.
    Value(ValueType),
    /// A counter.
    Counter,
    /// A set with the given element type.
    Set(ValueType),
    /// A list with the given element type.
    List(ValueType),
    /// A map with the given key and value types.
    Map {
        /// Key type.
        key: ValueType,
        /// Value type.
        value: ValueType,
    },
}

impl FieldType {
    fn of(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::Simple(scalar) => Self::Value(ValueType::Scalar(*scalar)),
            FieldKind::Enum(def) => Self::Value(ValueType::Enum(def.clone())),
            FieldKind::Reference(target) => Self::Value(ValueType::Reference(target.clone())),
            FieldKind::Counter => Self::Counter,
            FieldKind::Set(element) => Self::Set(element.value_type.clone()),
            FieldKind::List(element) => Self::List(element.value_type.clone()),
            FieldKind::Map { key, value } => Self::Map {
                key: key.value_type.clone(),
                value: value.value_type.clone(),
            },
        }
    }

    fn common_supertype(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a.common_supertype(b).map(Self::Value),
            (Self::Counter, Self::Counter) => Some(Self::Counter),
            (Self::Set(a), Self::Set(b)) => a.common_supertype(b).map(Self::Set),
            (Self::List(a), Self::List(b)) => a.common_supertype(b).map(Self::List),
            (Self::Map { key: ka, value: va }, Self::Map { key: kb, value: vb }) => {
                Some(Self::Map {
                    key: ka.common_supertype(kb)?,
                    value: va.common_supertype(vb)?,
                })
            }
            _ => None,
        }
    }
}

/// Role of a sub-field within its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubFieldRole {
    /// Set or list element.
    Element,
    /// Map key.
    Key,
    /// Map value.
    Value,
}

/// Aggregate of one sub-field slot of a complex field.
#[derive(Debug, Clone)]
pub struct SubFieldInfo {
    slot: StorageSlot,
    parent: StorageSlot,
    role: SubFieldRole,
    names: BTreeSet<String>,
    indexed: bool,
}

impl SubFieldInfo {
    /// Returns the sub-field's slot.
    #[must_use]
    pub fn slot(&self) -> StorageSlot {
        self.slot
    }

    /// Returns the slot of the owning complex field.
    #[must_use]
    pub fn parent_slot(&self) -> StorageSlot {
        self.parent
    }

    /// Returns the sub-field's role in its parent.
    #[must_use]
    pub fn role(&self) -> SubFieldRole {
        self.role
    }

    /// Returns every name the sub-field is declared under.
    #[must_use]
    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    /// Returns true if any declaration indexes the sub-field.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }
}

impl PartialEq for SubFieldInfo {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl Eq for SubFieldInfo {}

impl Hash for SubFieldInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
    }
}

/// One declaring type's view of a field.
#[derive(Debug, Clone)]
struct Declaration {
    type_name: String,
    supertypes: Vec<String>,
    field_type: FieldType,
}

impl Declaration {
    fn new(declaring_type: &ModelType, decl: &FieldDecl) -> Self {
        Self {
            type_name: declaring_type.name.clone(),
            supertypes: declaring_type.supertypes.clone(),
            field_type: FieldType::of(&decl.kind),
        }
    }
}

/// Aggregate of every declaration of one field slot.
///
/// Equality and hashing consider the slot alone.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    slot: StorageSlot,
    kind: FieldKindTag,
    names: BTreeSet<String>,
    indexed: bool,
    sub_fields: Vec<SubFieldInfo>,
    declarations: Vec<Declaration>,
}

impl FieldInfo {
    /// Creates an aggregate from the first declaration of a field.
    pub fn new(declaring_type: &ModelType, decl: &FieldDecl) -> Self {
        let roles: &[SubFieldRole] = match decl.kind {
            FieldKind::Map { .. } => &[SubFieldRole::Key, SubFieldRole::Value],
            _ => &[SubFieldRole::Element],
        };
        let sub_fields = decl
            .kind
            .sub_fields()
            .into_iter()
            .zip(roles)
            .map(|(sub, role)| SubFieldInfo {
                slot: sub.slot,
                parent: decl.slot,
                role: *role,
                names: BTreeSet::from([sub.name.clone()]),
                indexed: sub.indexed,
            })
            .collect();
        Self {
            slot: decl.slot,
            kind: decl.kind.tag(),
            names: BTreeSet::from([decl.name.clone()]),
            indexed: decl.indexed,
            sub_fields,
            declarations: vec![Declaration::new(declaring_type, decl)],
        }
    }

    /// Folds one more declaring type's view of the field into the aggregate.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if the declaration's slot, kind or sub-field
    /// slots differ from earlier declarations.
    pub fn witness(&mut self, declaring_type: &ModelType, decl: &FieldDecl) -> CoreResult<()> {
        let mismatch = |message: String| CoreError::schema_mismatch(message).with_slot(self.slot);
        if decl.slot != self.slot {
            return Err(mismatch(format!("declaration has {}", decl.slot)));
        }
        if decl.kind.tag() != self.kind {
            return Err(mismatch(format!(
                "{} declares a {} field, earlier declarations a {} field",
                declaring_type.name,
                decl.kind.tag(),
                self.kind
            )));
        }
        let subs = decl.kind.sub_fields();
        if subs.len() != self.sub_fields.len()
            || subs.iter().zip(&self.sub_fields).any(|(d, s)| d.slot != s.slot)
        {
            return Err(mismatch(format!(
                "{} declares different sub-field slots",
                declaring_type.name
            )));
        }

        for (sub, info) in subs.into_iter().zip(self.sub_fields.iter_mut()) {
            info.names.insert(sub.name.clone());
            info.indexed |= sub.indexed;
        }
        self.names.insert(decl.name.clone());
        self.indexed |= decl.indexed;
        self.declarations.push(Declaration::new(declaring_type, decl));
        Ok(())
    }

    /// Returns the field's slot.
    #[must_use]
    pub fn slot(&self) -> StorageSlot {
        self.slot
    }

    /// Returns the field's kind.
    #[must_use]
    pub fn kind(&self) -> FieldKindTag {
        self.kind
    }

    /// Returns every name the field is declared under.
    #[must_use]
    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    /// Returns true if any declaration indexes the field or one of its
    /// sub-fields.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.indexed || self.sub_fields.iter().any(SubFieldInfo::is_indexed)
    }

    /// Returns true if any declaration indexes the field itself.
    #[must_use]
    pub fn is_value_indexed(&self) -> bool {
        self.indexed
    }

    /// Returns the sub-fields of a complex field.
    #[must_use]
    pub fn sub_fields(&self) -> &[SubFieldInfo] {
        &self.sub_fields
    }

    /// Returns the names of the declaring model types.
    pub fn declaring_types(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().map(|d| d.type_name.as_str())
    }

    /// Resolves the narrowest type assignable from every applicable
    /// declaration.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if no declaring type applies to `context`
    /// or the applicable declarations share no common supertype.
    pub fn resolved_type(&self, context: &TypeContext) -> CoreResult<FieldType> {
        let mut applicable = self
            .declarations
            .iter()
            .filter(|d| context.applies_to_named(&d.type_name, &d.supertypes))
            .map(|d| (d.type_name.as_str(), &d.field_type));

        let (_, first) = applicable.next().ok_or_else(|| {
            CoreError::schema_mismatch(format!("no declaring type applies to {context:?}"))
                .with_slot(self.slot)
        })?;
        let mut resolved = first.clone();
        for (type_name, field_type) in applicable {
            resolved = resolved.common_supertype(field_type).ok_or_else(|| {
                CoreError::schema_mismatch(format!(
                    "{type_name} declares a type with no common supertype"
                ))
                .with_slot(self.slot)
            })?;
        }
        Ok(resolved)
    }
}

impl PartialEq for FieldInfo {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl Eq for FieldInfo {}

impl Hash for FieldInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
    }
}

/// The frozen per-schema registry of field infos.
#[derive(Debug, Clone, Default)]
pub struct FieldInfos {
    fields: BTreeMap<StorageSlot, FieldInfo>,
    parents: BTreeMap<StorageSlot, StorageSlot>,
}

impl FieldInfos {
    /// Builds the registry by witnessing every field of every type.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if two declarations of a slot disagree, or
    /// a sub-field slot is owned by two different fields.
    pub fn build<'a>(types: impl IntoIterator<Item = &'a ModelType>) -> CoreResult<Self> {
        let mut fields: BTreeMap<StorageSlot, FieldInfo> = BTreeMap::new();
        for ty in types {
            for decl in &ty.fields {
                match fields.get_mut(&decl.slot) {
                    Some(info) => info.witness(ty, decl)?,
                    None => {
                        fields.insert(decl.slot, FieldInfo::new(ty, decl));
                    }
                }
            }
        }

        let mut parents = BTreeMap::new();
        for info in fields.values() {
            for sub in &info.sub_fields {
                if fields.contains_key(&sub.slot) {
                    return Err(CoreError::schema_mismatch(
                        "sub-field slot is also a field slot",
                    )
                    .with_slot(sub.slot));
                }
                if parents.insert(sub.slot, info.slot).is_some() {
                    return Err(CoreError::schema_mismatch(
                        "sub-field slot is owned by two fields",
                    )
                    .with_slot(sub.slot));
                }
            }
        }
        Ok(Self { fields, parents })
    }

    /// Looks up a top-level field.
    #[must_use]
    pub fn field(&self, slot: StorageSlot) -> Option<&FieldInfo> {
        self.fields.get(&slot)
    }

    /// Looks up a sub-field together with its parent field.
    #[must_use]
    pub fn sub_field(&self, slot: StorageSlot) -> Option<(&SubFieldInfo, &FieldInfo)> {
        let parent = self.fields.get(self.parents.get(&slot)?)?;
        let sub = parent.sub_fields.iter().find(|s| s.slot == slot)?;
        Some((sub, parent))
    }

    /// Iterates every field in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.values()
    }

    /// Returns the number of top-level fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RefTarget, ScalarType, SubFieldDecl};

    fn reference_to(slot: u32) -> FieldKind {
        FieldKind::Reference(RefTarget::of([StorageSlot::new(slot)]))
    }

    fn person() -> ModelType {
        ModelType::new("Person", 1)
            .supertype("Named")
            .field(FieldDecl::new(10, "name", FieldKind::Simple(ScalarType::Text)))
            .field(FieldDecl::new(13, "friend", reference_to(1)))
            .field(FieldDecl::new(
                14,
                "tags",
                FieldKind::Set(SubFieldDecl::new(
                    15,
                    "tag",
                    ValueType::Scalar(ScalarType::Text),
                )),
            ))
    }

    fn pet() -> ModelType {
        ModelType::new("Pet", 2)
            .supertype("Named")
            .field(FieldDecl::new(10, "title", FieldKind::Simple(ScalarType::Text)).indexed())
            .field(FieldDecl::new(13, "buddy", reference_to(2)))
    }

    #[test]
    fn witness_aggregates_names_and_indexing() {
        let infos = FieldInfos::build([&person(), &pet()]).unwrap();
        let name = infos.field(StorageSlot::new(10)).unwrap();
        assert_eq!(
            name.names().iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["name", "title"]
        );
        assert!(name.is_indexed());
        assert_eq!(name.declaring_types().count(), 2);
    }

    #[test]
    fn witness_rejects_kind_change() {
        let other = ModelType::new("Other", 3)
            .field(FieldDecl::new(10, "name", FieldKind::Counter));
        let err = FieldInfos::build([&person(), &other]).unwrap_err();
        assert!(matches!(err, CoreError::SchemaMismatch { slot: Some(s), .. } if s == StorageSlot::new(10)));
    }

    #[test]
    fn witness_rejects_sub_slot_change() {
        let other = ModelType::new("Other", 3).field(FieldDecl::new(
            14,
            "tags",
            FieldKind::Set(SubFieldDecl::new(99, "tag", ValueType::Scalar(ScalarType::Text))),
        ));
        assert!(FieldInfos::build([&person(), &other]).is_err());
    }

    #[test]
    fn resolved_type_unifies_references() {
        let infos = FieldInfos::build([&person(), &pet()]).unwrap();
        let friend = infos.field(StorageSlot::new(13)).unwrap();

        assert_eq!(
            friend.resolved_type(&TypeContext::Any).unwrap(),
            FieldType::Value(ValueType::Reference(RefTarget::of([
                StorageSlot::new(1),
                StorageSlot::new(2)
            ])))
        );
        assert_eq!(
            friend.resolved_type(&TypeContext::of("Pet")).unwrap(),
            FieldType::Value(ValueType::Reference(RefTarget::of([StorageSlot::new(2)])))
        );
        assert!(friend.resolved_type(&TypeContext::of("Robot")).is_err());
    }

    #[test]
    fn supertype_context_covers_every_declarer() {
        let infos = FieldInfos::build([&person(), &pet()]).unwrap();
        let name = infos.field(StorageSlot::new(10)).unwrap();
        assert_eq!(
            name.resolved_type(&TypeContext::of("Named")).unwrap(),
            FieldType::Value(ValueType::Scalar(ScalarType::Text))
        );
        assert_eq!(
            name.declaring_types().collect::<Vec<_>>(),
            vec!["Person", "Pet"]
        );
    }

    #[test]
    fn resolved_type_rejects_incompatible_scalars() {
        let other = ModelType::new("Other", 3)
            .field(FieldDecl::new(10, "name", FieldKind::Simple(ScalarType::Integer)));
        let infos = FieldInfos::build([&person(), &other]).unwrap();
        let name = infos.field(StorageSlot::new(10)).unwrap();
        assert!(name.resolved_type(&TypeContext::of("Person")).is_ok());
        assert!(matches!(
            name.resolved_type(&TypeContext::Any),
            Err(CoreError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn sub_field_lookup_returns_parent() {
        let infos = FieldInfos::build([&person()]).unwrap();
        let (sub, parent) = infos.sub_field(StorageSlot::new(15)).unwrap();
        assert_eq!(sub.parent_slot(), StorageSlot::new(14));
        assert_eq!(sub.role(), SubFieldRole::Element);
        assert_eq!(parent.slot(), StorageSlot::new(14));
        assert!(infos.sub_field(StorageSlot::new(14)).is_none());
    }

    #[test]
    fn equality_is_by_slot() {
        let infos = FieldInfos::build([&person()]).unwrap();
        let a = infos.field(StorageSlot::new(10)).unwrap().clone();
        let b = FieldInfo::new(
            &pet(),
            &FieldDecl::new(10, "other", FieldKind::Counter),
        );
        assert_eq!(a, b);
    }
}
