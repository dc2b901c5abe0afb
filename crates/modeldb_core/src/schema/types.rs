//! Declarations supplied by a schema binder.

use crate::entity::EntityId;
use crate::types::StorageSlot;
use modeldb_codec::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Primitive scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// `bool`
    Bool,
    /// `i64`
    Integer,
    /// UTF-8 text.
    Text,
    /// Byte string.
    Bytes,
}

impl ScalarType {
    fn admits(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_))
                | (Self::Integer, Value::Integer(_))
                | (Self::Text, Value::Text(_))
                | (Self::Bytes, Value::Bytes(_))
        )
    }
}

/// One constant of an enum definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnumValue {
    /// Position of the constant within its definition.
    pub ordinal: u32,
    /// Constant name.
    pub name: String,
}

impl EnumValue {
    /// Creates an enum value.
    pub fn new(ordinal: u32, name: impl Into<String>) -> Self {
        Self {
            ordinal,
            name: name.into(),
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An enum type: a named, ordered list of constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumDef {
    name: String,
    constants: Vec<String>,
}

impl EnumDef {
    /// Creates an enum definition. Ordinals follow the given order.
    pub fn new<I, S>(name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            constants: constants.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the enum's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the constant names in ordinal order.
    #[must_use]
    pub fn constants(&self) -> &[String] {
        &self.constants
    }

    /// Looks up a constant by name.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<EnumValue> {
        self.constants
            .iter()
            .position(|c| c == name)
            .and_then(|i| u32::try_from(i).ok())
            .map(|ordinal| EnumValue::new(ordinal, name))
    }

    /// Looks up a constant by ordinal.
    #[must_use]
    pub fn by_ordinal(&self, ordinal: u32) -> Option<EnumValue> {
        self.constants
            .get(ordinal as usize)
            .map(|name| EnumValue::new(ordinal, name.clone()))
    }

    /// Checks that `value` is one of this definition's constants.
    #[must_use]
    pub fn contains(&self, value: &EnumValue) -> bool {
        self.constants.get(value.ordinal as usize) == Some(&value.name)
    }
}

/// Model types a reference may point to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefTarget {
    /// Any model type.
    Any,
    /// Only the listed model types.
    Of(BTreeSet<StorageSlot>),
}

impl RefTarget {
    /// Creates a restricted target.
    pub fn of(types: impl IntoIterator<Item = StorageSlot>) -> Self {
        Self::Of(types.into_iter().collect())
    }

    /// Checks that an entity of the given type may be referenced.
    #[must_use]
    pub fn admits(&self, type_slot: StorageSlot) -> bool {
        match self {
            Self::Any => true,
            Self::Of(types) => types.contains(&type_slot),
        }
    }

    /// Returns the narrowest target admitting both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Of(a), Self::Of(b)) => Self::Of(a.union(b).copied().collect()),
            _ => Self::Any,
        }
    }
}

/// The type of a single stored value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// A scalar.
    Scalar(ScalarType),
    /// A constant of an enum definition.
    Enum(EnumDef),
    /// A reference to an entity.
    Reference(RefTarget),
}

impl ValueType {
    /// Checks that a non-null value belongs to this type.
    #[must_use]
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Scalar(scalar), value) => scalar.admits(value),
            (Self::Enum(def), Value::Enum { ordinal, name }) => {
                def.contains(&EnumValue::new(*ordinal, name.clone()))
            }
            (Self::Reference(target), Value::Reference(bytes)) => {
                target.admits(EntityId::from_bytes(*bytes).type_slot())
            }
            _ => false,
        }
    }

    /// Returns the narrowest common supertype, if any.
    ///
    /// Identical types unify to themselves and references unify by the
    /// union of their targets. Nothing else unifies.
    #[must_use]
    pub fn common_supertype(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Reference(a), Self::Reference(b)) => Some(Self::Reference(a.union(b))),
            (a, b) if a == b => Some(a.clone()),
            _ => None,
        }
    }

    /// Returns true for reference types.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }
}

/// A simple sub-field of a complex field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubFieldDecl {
    /// Storage slot of the sub-field.
    pub slot: StorageSlot,
    /// User-visible name.
    pub name: String,
    /// Element, key or value type.
    pub value_type: ValueType,
    /// Whether an index is maintained over the sub-field.
    pub indexed: bool,
}

impl SubFieldDecl {
    /// Creates an unindexed sub-field declaration.
    pub fn new(slot: u32, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            slot: StorageSlot::new(slot),
            name: name.into(),
            value_type,
            indexed: false,
        }
    }

    /// Marks the sub-field as indexed.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

/// The closed set of field kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A scalar value.
    Simple(ScalarType),
    /// An enum constant.
    Enum(EnumDef),
    /// A reference to another entity.
    Reference(RefTarget),
    /// An integer counter.
    Counter,
    /// An ordered set of elements.
    Set(SubFieldDecl),
    /// A list of elements.
    List(SubFieldDecl),
    /// An ordered map.
    Map {
        /// Key sub-field.
        key: SubFieldDecl,
        /// Value sub-field.
        value: SubFieldDecl,
    },
}

/// Discriminant of [`FieldKind`], for comparing kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKindTag {
    /// [`FieldKind::Simple`]
    Simple,
    /// [`FieldKind::Enum`]
    Enum,
    /// [`FieldKind::Reference`]
    Reference,
    /// [`FieldKind::Counter`]
    Counter,
    /// [`FieldKind::Set`]
    Set,
    /// [`FieldKind::List`]
    List,
    /// [`FieldKind::Map`]
    Map,
}

impl fmt::Display for FieldKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Simple => "simple",
            Self::Enum => "enum",
            Self::Reference => "reference",
            Self::Counter => "counter",
            Self::Set => "set",
            Self::List => "list",
            Self::Map => "map",
        };
        f.write_str(name)
    }
}

impl FieldKind {
    /// Returns the kind's discriminant.
    #[must_use]
    pub fn tag(&self) -> FieldKindTag {
        match self {
            Self::Simple(_) => FieldKindTag::Simple,
            Self::Enum(_) => FieldKindTag::Enum,
            Self::Reference(_) => FieldKindTag::Reference,
            Self::Counter => FieldKindTag::Counter,
            Self::Set(_) => FieldKindTag::Set,
            Self::List(_) => FieldKindTag::List,
            Self::Map { .. } => FieldKindTag::Map,
        }
    }

    /// Returns the value type of simple, enum and reference fields.
    #[must_use]
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Simple(scalar) => Some(ValueType::Scalar(*scalar)),
            Self::Enum(def) => Some(ValueType::Enum(def.clone())),
            Self::Reference(target) => Some(ValueType::Reference(target.clone())),
            _ => None,
        }
    }

    /// Returns the sub-field declarations of complex fields.
    #[must_use]
    pub fn sub_fields(&self) -> Vec<&SubFieldDecl> {
        match self {
            Self::Set(element) | Self::List(element) => vec![element],
            Self::Map { key, value } => vec![key, value],
            _ => Vec::new(),
        }
    }
}

/// A field declared by a model type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Storage slot of the field.
    pub slot: StorageSlot,
    /// User-visible name.
    pub name: String,
    /// The field's kind and value type.
    pub kind: FieldKind,
    /// Whether an index is maintained over the field.
    pub indexed: bool,
}

impl FieldDecl {
    /// Creates an unindexed field declaration.
    pub fn new(slot: u32, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            slot: StorageSlot::new(slot),
            name: name.into(),
            kind,
            indexed: false,
        }
    }

    /// Marks the field as indexed.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

/// A model type: a named set of field declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelType {
    /// Type name.
    pub name: String,
    /// Storage slot of the type.
    pub slot: StorageSlot,
    /// Names of declared supertypes.
    pub supertypes: Vec<String>,
    /// Declared fields.
    pub fields: Vec<FieldDecl>,
}

impl ModelType {
    /// Creates a model type without fields.
    pub fn new(name: impl Into<String>, slot: u32) -> Self {
        Self {
            name: name.into(),
            slot: StorageSlot::new(slot),
            supertypes: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Adds a supertype.
    #[must_use]
    pub fn supertype(mut self, name: impl Into<String>) -> Self {
        self.supertypes.push(name.into());
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    /// Looks up a declared field by slot.
    #[must_use]
    pub fn field_decl(&self, slot: StorageSlot) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.slot == slot)
    }

    /// Checks whether the type is, or declares, the named type.
    #[must_use]
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.supertypes.iter().any(|s| s == name)
    }
}

/// A composite index over one to four simple fields.
///
/// The index covers every model type declaring all of its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDecl {
    /// Index name.
    pub name: String,
    /// Storage slot of the index relation.
    pub slot: StorageSlot,
    /// Indexed field slots, in column order.
    pub fields: Vec<StorageSlot>,
}

impl IndexDecl {
    /// Creates a composite index declaration.
    pub fn new(name: impl Into<String>, slot: u32, fields: impl IntoIterator<Item = u32>) -> Self {
        Self {
            name: name.into(),
            slot: StorageSlot::new(slot),
            fields: fields.into_iter().map(StorageSlot::new).collect(),
        }
    }

    /// Checks whether the index covers entities of `ty`.
    #[must_use]
    pub fn applies_to(&self, ty: &ModelType) -> bool {
        self.fields.iter().all(|slot| ty.field_decl(*slot).is_some())
    }
}

/// Restricts which declaring types are considered when resolving a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeContext {
    /// Every declaring type.
    Any,
    /// Declaring types that are, or declare, the named type.
    Type(String),
}

impl TypeContext {
    /// Creates a context for the named type.
    pub fn of(name: impl Into<String>) -> Self {
        Self::Type(name.into())
    }

    /// Checks whether a declaring type applies.
    #[must_use]
    pub fn applies_to(&self, ty: &ModelType) -> bool {
        self.applies_to_named(&ty.name, &ty.supertypes)
    }

    /// Checks a declaring type given only its name and supertypes.
    #[must_use]
    pub fn applies_to_named(&self, type_name: &str, supertypes: &[String]) -> bool {
        match self {
            Self::Any => true,
            Self::Type(name) => type_name == name || supertypes.iter().any(|s| s == name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mood() -> EnumDef {
        EnumDef::new("Mood", ["Happy", "Grumpy"])
    }

    #[test]
    fn enum_def_lookup() {
        let def = mood();
        assert_eq!(def.value("Grumpy"), Some(EnumValue::new(1, "Grumpy")));
        assert_eq!(def.by_ordinal(0), Some(EnumValue::new(0, "Happy")));
        assert!(def.value("Sleepy").is_none());
        assert!(!def.contains(&EnumValue::new(0, "Grumpy")));
    }

    #[test]
    fn value_type_admits() {
        let int = ValueType::Scalar(ScalarType::Integer);
        assert!(int.admits(&Value::Integer(1)));
        assert!(!int.admits(&Value::text("1")));

        let person = ValueType::Reference(RefTarget::of([StorageSlot::new(1)]));
        let alice = EntityId::new(StorageSlot::new(1));
        let rex = EntityId::new(StorageSlot::new(2));
        assert!(person.admits(&Value::Reference(*alice.as_bytes())));
        assert!(!person.admits(&Value::Reference(*rex.as_bytes())));

        assert!(ValueType::Enum(mood()).admits(&Value::enumeration(1, "Grumpy")));
        assert!(!ValueType::Enum(mood()).admits(&Value::enumeration(1, "Happy")));
    }

    #[test]
    fn references_unify_by_union() {
        let a = ValueType::Reference(RefTarget::of([StorageSlot::new(1)]));
        let b = ValueType::Reference(RefTarget::of([StorageSlot::new(2)]));
        assert_eq!(
            a.common_supertype(&b),
            Some(ValueType::Reference(RefTarget::of([
                StorageSlot::new(1),
                StorageSlot::new(2)
            ])))
        );
        let any = ValueType::Reference(RefTarget::Any);
        assert_eq!(a.common_supertype(&any), Some(any.clone()));
    }

    #[test]
    fn distinct_scalars_do_not_unify() {
        let int = ValueType::Scalar(ScalarType::Integer);
        let text = ValueType::Scalar(ScalarType::Text);
        assert_eq!(int.common_supertype(&int), Some(int.clone()));
        assert!(int.common_supertype(&text).is_none());
    }

    #[test]
    fn index_applies_to_declaring_types() {
        let ty = ModelType::new("Person", 1)
            .field(FieldDecl::new(10, "name", FieldKind::Simple(ScalarType::Text)));
        assert!(IndexDecl::new("by_name", 30, [10]).applies_to(&ty));
        assert!(!IndexDecl::new("by_name_age", 31, [10, 11]).applies_to(&ty));
    }
}
