//! Reference paths and their resolution against field identities.

use crate::error::{CoreError, CoreResult};
use crate::field_info::{FieldInfos, FieldType, SubFieldRole};
use crate::schema::TypeContext;
use crate::types::StorageSlot;
use std::fmt;

/// A walk from an entity through reference-valued fields.
///
/// Each slot names a reference field, a set, list or map field holding
/// references, or one sub-field of such a field. Naming a map follows its
/// reference-typed keys and values; naming its key or value sub-field
/// follows only that side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferencePath {
    slots: Vec<StorageSlot>,
}

impl ReferencePath {
    /// Creates a path from storage slots.
    pub fn new(slots: impl IntoIterator<Item = StorageSlot>) -> Self {
        Self {
            slots: slots.into_iter().collect(),
        }
    }

    /// Creates a path from raw slot numbers.
    pub fn of(slots: impl IntoIterator<Item = u32>) -> Self {
        Self::new(slots.into_iter().map(StorageSlot::new))
    }

    /// The slots of the path, in walking order.
    #[must_use]
    pub fn slots(&self) -> &[StorageSlot] {
        &self.slots
    }

    /// Returns true for the empty path, which reaches nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn resolve(&self, infos: &FieldInfos) -> CoreResult<Vec<PathStep>> {
        self.slots.iter().map(|&slot| PathStep::resolve(infos, slot)).collect()
    }
}

impl fmt::Display for ReferencePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", slot.as_u32())?;
        }
        Ok(())
    }
}

/// Which references one step follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepTarget {
    Reference,
    Elements,
    Map { keys: bool, values: bool },
}

/// One resolved step: the top-level field to read and what to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PathStep {
    pub(crate) field: StorageSlot,
    pub(crate) target: StepTarget,
}

impl PathStep {
    fn resolve(infos: &FieldInfos, slot: StorageSlot) -> CoreResult<Self> {
        let not_reference =
            || CoreError::invalid_reference_path(slot, "field does not hold references");

        if let Some(info) = infos.field(slot) {
            let target = match info.resolved_type(&TypeContext::Any)? {
                FieldType::Value(ty) if ty.is_reference() => StepTarget::Reference,
                FieldType::Set(ty) | FieldType::List(ty) if ty.is_reference() => {
                    StepTarget::Elements
                }
                FieldType::Map { key, value } if key.is_reference() || value.is_reference() => {
                    StepTarget::Map {
                        keys: key.is_reference(),
                        values: value.is_reference(),
                    }
                }
                _ => return Err(not_reference()),
            };
            return Ok(Self {
                field: slot,
                target,
            });
        }

        let (sub, parent) = infos
            .sub_field(slot)
            .ok_or_else(|| CoreError::invalid_reference_path(slot, "unknown field"))?;
        let target = match (parent.resolved_type(&TypeContext::Any)?, sub.role()) {
            (FieldType::Set(ty) | FieldType::List(ty), SubFieldRole::Element)
                if ty.is_reference() =>
            {
                StepTarget::Elements
            }
            (FieldType::Map { key, .. }, SubFieldRole::Key) if key.is_reference() => {
                StepTarget::Map {
                    keys: true,
                    values: false,
                }
            }
            (FieldType::Map { value, .. }, SubFieldRole::Value) if value.is_reference() => {
                StepTarget::Map {
                    keys: false,
                    values: true,
                }
            }
            _ => return Err(not_reference()),
        };
        Ok(Self {
            field: parent.slot(),
            target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        FieldDecl, FieldKind, ModelType, RefTarget, ScalarType, SubFieldDecl, ValueType,
    };

    fn infos() -> FieldInfos {
        let reference = || ValueType::Reference(RefTarget::Any);
        let ty = ModelType::new("Node", 1)
            .field(FieldDecl::new(10, "next", FieldKind::Reference(RefTarget::Any)))
            .field(FieldDecl::new(11, "label", FieldKind::Simple(ScalarType::Text)))
            .field(FieldDecl::new(
                12,
                "children",
                FieldKind::List(SubFieldDecl::new(13, "child", reference())),
            ))
            .field(FieldDecl::new(
                14,
                "links",
                FieldKind::Map {
                    key: SubFieldDecl::new(15, "from", reference()),
                    value: SubFieldDecl::new(16, "weight", ValueType::Scalar(ScalarType::Integer)),
                },
            ));
        FieldInfos::build([&ty]).unwrap()
    }

    #[test]
    fn resolves_each_kind_of_step() {
        let infos = infos();
        let steps = ReferencePath::of([10, 12, 13, 14, 15]).resolve(&infos).unwrap();
        let targets: Vec<_> = steps.iter().map(|s| (s.field.as_u32(), s.target)).collect();
        assert_eq!(
            targets,
            vec![
                (10, StepTarget::Reference),
                (12, StepTarget::Elements),
                (12, StepTarget::Elements),
                (
                    14,
                    StepTarget::Map {
                        keys: true,
                        values: false
                    }
                ),
                (
                    14,
                    StepTarget::Map {
                        keys: true,
                        values: false
                    }
                ),
            ]
        );
    }

    #[test]
    fn rejects_non_reference_slots() {
        let infos = infos();
        for slot in [11, 16, 99] {
            let err = ReferencePath::of([slot]).resolve(&infos).unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidReferencePath { slot: s, .. } if s.as_u32() == slot),
                "slot {slot}: {err}"
            );
        }
    }

    #[test]
    fn displays_as_arrow_chain() {
        assert_eq!(ReferencePath::of([1, 2, 3]).to_string(), "1 -> 2 -> 3");
    }
}
