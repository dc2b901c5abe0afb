//! The copy engine.

use super::path::{PathStep, StepTarget};
use super::{CopyState, ReferencePath};
use crate::convert::{Converter, EnumDefConverter};
use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::schema::{EnumValue, FieldDecl, FieldKind, ModelType, SubFieldDecl, ValueType};
use crate::transaction::Transaction;
use crate::types::StorageSlot;
use crate::view::{ListView, MapView, SetView};
use modeldb_codec::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, trace};

/// Copies entity graphs from one transaction into another.
///
/// The root entity is copied field by field, then every
/// [`ReferencePath`] is walked from it and each entity reached is copied
/// onto the same ID. A [`CopyState`] records what was copied; an entity
/// already in it is never copied or walked through again, so reference
/// cycles terminate and repeated calls with one state do no redundant
/// work.
///
/// When source and destination are the same transaction, an entity
/// reached on its own ID is recorded as copied and left untouched.
///
/// A walk reads the source and writes the destination. Two copies running
/// in opposite directions between the same pair of transactions can
/// deadlock on a store that locks per transaction, so callers must not
/// run them concurrently.
///
/// # Example
///
/// ```rust
/// use modeldb_core::copy::{CopyEngine, CopyState, ReferencePath};
/// use modeldb_core::schema::{FieldDecl, FieldKind, ModelType, RefTarget, SchemaBuilder};
/// use modeldb_core::{Database, StorageSlot};
/// use modeldb_codec::Value;
///
/// let schema = SchemaBuilder::new().model(
///     ModelType::new("Node", 1)
///         .field(FieldDecl::new(10, "next", FieldKind::Reference(RefTarget::Any))),
/// );
/// let db = Database::open_in_memory(&schema).unwrap();
/// let (source, dest) = (db.begin(), db.begin());
///
/// let a = source.create(StorageSlot(1)).unwrap();
/// let b = source.create(StorageSlot(1)).unwrap();
/// source.write_field(a, StorageSlot(10), Value::Reference(*b.as_bytes())).unwrap();
/// source.write_field(b, StorageSlot(10), Value::Reference(*a.as_bytes())).unwrap();
///
/// let mut state = CopyState::new();
/// let path = ReferencePath::of([10, 10, 10]);
/// let copied = CopyEngine::new(&source, &dest).copy(&mut state, a, None, &[path]).unwrap();
/// assert_eq!(copied, 2);
/// assert!(dest.exists(b).unwrap());
/// ```
#[derive(Debug)]
pub struct CopyEngine<'a> {
    source: &'a Arc<Transaction>,
    dest: &'a Arc<Transaction>,
}

/// Remaining path steps to walk from one entity.
type Tails<'p> = Vec<&'p [PathStep]>;

impl<'a> CopyEngine<'a> {
    /// Creates an engine copying from `source` into `dest`.
    #[must_use]
    pub fn new(source: &'a Arc<Transaction>, dest: &'a Arc<Transaction>) -> Self {
        Self { source, dest }
    }

    /// Copies `start` onto `target` (or onto `start` itself) and walks
    /// `paths` from it.
    ///
    /// Returns the number of entities copied by this call, which is zero
    /// when `start` was already copied under `state`. References are
    /// copied as they are; a reference to an entity missing from the
    /// source is kept and not walked.
    ///
    /// On failure `state` still records everything copied before the
    /// error. Roll back `dest` to discard a partial copy.
    ///
    /// # Errors
    ///
    /// - `SourceEntityMissing` if `start` does not exist in the source
    /// - `InconsistentCopyState` if `state` records a copy the
    ///   destination lacks
    /// - `SchemaMismatch` if a copied type is unknown to the destination
    ///   or laid out differently there
    /// - `InvalidReferencePath` if a path slot does not hold references
    /// - `InvalidValue` if an enum constant has no counterpart in the
    ///   destination
    /// - `StaleTransaction` if either transaction is closed
    pub fn copy(
        &self,
        state: &mut CopyState,
        start: EntityId,
        target: Option<EntityId>,
        paths: &[ReferencePath],
    ) -> CoreResult<usize> {
        self.source.ensure_active()?;
        self.dest.ensure_active()?;
        if !self.source.exists(start)? {
            return Err(CoreError::SourceEntityMissing { entity_id: start });
        }
        if self.already_copied(state, start)? {
            trace!(target: "modeldb::copy", entity = %start, "root already copied");
            return Ok(0);
        }

        let infos = self.source.schema().field_infos();
        let resolved = paths
            .iter()
            .filter(|path| !path.is_empty())
            .map(|path| path.resolve(infos))
            .collect::<CoreResult<Vec<_>>>()?;

        let mut walk = Walk {
            engine: self,
            state,
            checked: BTreeSet::new(),
            copied: 0,
        };
        walk.copy_entity(start, target.unwrap_or(start))?;

        let tails: Tails<'_> = resolved.iter().map(Vec::as_slice).collect();
        let mut pending = vec![(start, tails)];
        while let Some((id, tails)) = pending.pop() {
            let mut next: BTreeMap<EntityId, Tails<'_>> = BTreeMap::new();
            for tail in tails {
                let Some((step, rest)) = tail.split_first() else {
                    continue;
                };
                for reached in self.follow(id, step)? {
                    next.entry(reached).or_default().push(rest);
                }
            }
            // Reverse so the stack pops in ID order.
            for (reached, tails) in next.into_iter().rev() {
                if walk.enter(reached)? {
                    pending.push((reached, tails));
                }
            }
        }

        debug!(
            target: "modeldb::copy",
            source = %self.source.id(),
            dest = %self.dest.id(),
            root = %start,
            copied = walk.copied,
            "copy finished"
        );
        Ok(walk.copied)
    }

    fn already_copied(&self, state: &CopyState, id: EntityId) -> CoreResult<bool> {
        match state.destination_of(id) {
            None => Ok(false),
            Some(destination) if self.dest.exists(destination)? => Ok(true),
            Some(_) => Err(CoreError::InconsistentCopyState { entity_id: id }),
        }
    }

    /// IDs referenced from `id` along one step.
    fn follow(&self, id: EntityId, step: &PathStep) -> CoreResult<Vec<EntityId>> {
        let ty = self.source.model_type_of(id)?;
        let Some(decl) = ty.field_decl(step.field) else {
            return Ok(Vec::new());
        };
        let slot = step.field;
        let values = match (&decl.kind, step.target) {
            (FieldKind::Reference(_), StepTarget::Reference) => {
                vec![self.source.read_field(id, slot)?]
            }
            (FieldKind::Set(_), StepTarget::Elements) => self.source.set_field(id, slot)?.to_vec()?,
            (FieldKind::List(_), StepTarget::Elements) => {
                self.source.list_field(id, slot)?.to_vec()?
            }
            (FieldKind::Map { .. }, StepTarget::Map { keys, values }) => self
                .source
                .map_field(id, slot)?
                .to_vec()?
                .into_iter()
                .flat_map(|(k, v)| {
                    let k = keys.then_some(k);
                    let v = values.then_some(v);
                    k.into_iter().chain(v)
                })
                .collect(),
            _ => Vec::new(),
        };
        trace!(target: "modeldb::copy", entity = %id, %slot, found = values.len(), "follow step");
        Ok(values
            .iter()
            .filter_map(Value::as_reference)
            .map(|bytes| EntityId::from_bytes(*bytes))
            .collect())
    }
}

/// Progress of one `copy` call.
struct Walk<'e, 'a, 's> {
    engine: &'e CopyEngine<'a>,
    state: &'s mut CopyState,
    /// Model types whose layouts already matched.
    checked: BTreeSet<StorageSlot>,
    copied: usize,
}

impl Walk<'_, '_, '_> {
    /// Copies a reached entity unless it was copied before or is
    /// dangling. Returns whether to walk on from it.
    fn enter(&mut self, id: EntityId) -> CoreResult<bool> {
        if self.engine.already_copied(self.state, id)? {
            trace!(target: "modeldb::copy", entity = %id, "already copied");
            return Ok(false);
        }
        if !self.engine.source.exists(id)? {
            trace!(target: "modeldb::copy", entity = %id, "dangling reference");
            return Ok(false);
        }
        self.copy_entity(id, id)?;
        Ok(true)
    }

    fn copy_entity(&mut self, id: EntityId, onto: EntityId) -> CoreResult<()> {
        let (source, dest) = (self.engine.source, self.engine.dest);
        if id == onto && Arc::ptr_eq(source, dest) {
            // The entity already is its own copy; resetting it would erase
            // the fields about to be read.
            self.state.mark(id, onto);
            self.copied += 1;
            trace!(target: "modeldb::copy", entity = %id, "copied onto itself");
            return Ok(());
        }
        let from = source.model_type_of(id)?;
        let to = dest.model_type_of(onto).map_err(|err| err.with_entity(id))?;
        if from.slot != to.slot {
            return Err(CoreError::schema_mismatch(format!(
                "cannot copy a {} onto a {}",
                from.name, to.name
            ))
            .with_entity(id));
        }
        if self.checked.insert(from.slot) {
            check_layout(from, to).map_err(|err| err.with_entity(id))?;
        }

        if dest.exists(onto)? {
            dest.reset(onto)?;
        } else {
            dest.create_with_id(onto)?;
        }
        for decl in &from.fields {
            if let Some(counterpart) = to.field_decl(decl.slot) {
                self.copy_field(id, onto, decl, counterpart)?;
            }
        }

        self.state.mark(id, onto);
        self.copied += 1;
        debug!(target: "modeldb::copy", entity = %id, onto = %onto, ty = %from.name, "entity copied");
        Ok(())
    }

    fn copy_field(
        &self,
        id: EntityId,
        onto: EntityId,
        from: &FieldDecl,
        to: &FieldDecl,
    ) -> CoreResult<()> {
        let (source, dest) = (self.engine.source, self.engine.dest);
        let slot = from.slot;
        match (&from.kind, &to.kind) {
            (FieldKind::Counter, _) => dest.set_counter(onto, slot, source.counter(id, slot)?),
            (FieldKind::Set(a), FieldKind::Set(b)) => {
                let set = dest.set_field(onto, slot)?;
                for element in source.set_field(id, slot)?.to_vec()? {
                    set.insert(remap(element, a, b)?)?;
                }
                Ok(())
            }
            (FieldKind::List(a), FieldKind::List(b)) => {
                let list = dest.list_field(onto, slot)?;
                for element in source.list_field(id, slot)?.to_vec()? {
                    list.push(remap(element, a, b)?)?;
                }
                Ok(())
            }
            (FieldKind::Map { key: ka, value: va }, FieldKind::Map { key: kb, value: vb }) => {
                let map = dest.map_field(onto, slot)?;
                for (key, value) in source.map_field(id, slot)?.to_vec()? {
                    map.put(remap(key, ka, kb)?, remap(value, va, vb)?)?;
                }
                Ok(())
            }
            (a, b) => match (a.value_type(), b.value_type()) {
                (Some(a), Some(b)) => {
                    let value = source.read_field(id, slot)?;
                    if value.is_null() {
                        return Ok(());
                    }
                    let value = remap_value(value, &a, &b).map_err(|err| err.with_slot(slot))?;
                    dest.write_field(onto, slot, value).map(|_| ())
                }
                _ => Err(CoreError::schema_mismatch("field kinds differ")
                    .with_slot(slot)
                    .with_entity(id)),
            },
        }
    }
}

fn remap(value: Value, from: &SubFieldDecl, to: &SubFieldDecl) -> CoreResult<Value> {
    remap_value(value, &from.value_type, &to.value_type).map_err(|err| err.with_slot(from.slot))
}

/// Carries enum constants over by name; other values are copied as they
/// are.
fn remap_value(value: Value, from: &ValueType, to: &ValueType) -> CoreResult<Value> {
    match (value, from, to) {
        (Value::Enum { ordinal, name }, ValueType::Enum(a), ValueType::Enum(b)) => {
            let converted = EnumDefConverter::new(a.clone(), b.clone())
                .forward(&EnumValue::new(ordinal, name))?;
            Ok(Value::enumeration(converted.ordinal, converted.name))
        }
        (value, _, _) => Ok(value),
    }
}

/// Checks that two declarations of one model type store the same shape.
///
/// Field slots, kinds, sub-field slots and scalar types must agree. Enum
/// definitions and reference targets may differ.
fn check_layout(from: &ModelType, to: &ModelType) -> CoreResult<()> {
    let slots = |ty: &ModelType| ty.fields.iter().map(|d| d.slot).collect::<BTreeSet<_>>();
    let (a, b) = (slots(from), slots(to));
    if let Some(slot) = a.symmetric_difference(&b).next() {
        return Err(
            CoreError::schema_mismatch(format!("{} field sets differ", from.name)).with_slot(*slot),
        );
    }

    for decl in &from.fields {
        let Some(other) = to.field_decl(decl.slot) else {
            continue;
        };
        let mismatch = |message: &str| {
            Err(CoreError::schema_mismatch(format!("{}: {message}", decl.name)).with_slot(decl.slot))
        };
        if decl.kind.tag() != other.kind.tag() {
            return mismatch("field kinds differ");
        }
        if let (FieldKind::Simple(x), FieldKind::Simple(y)) = (&decl.kind, &other.kind) {
            if x != y {
                return mismatch("scalar types differ");
            }
        }
        let (subs, other_subs) = (decl.kind.sub_fields(), other.kind.sub_fields());
        for (sub, other_sub) in subs.iter().zip(&other_subs) {
            if sub.slot != other_sub.slot {
                return mismatch("sub-field slots differ");
            }
            if !same_shape(&sub.value_type, &other_sub.value_type) {
                return mismatch("sub-field types differ");
            }
        }
    }
    Ok(())
}

fn same_shape(a: &ValueType, b: &ValueType) -> bool {
    match (a, b) {
        (ValueType::Scalar(x), ValueType::Scalar(y)) => x == y,
        (ValueType::Enum(_), ValueType::Enum(_))
        | (ValueType::Reference(_), ValueType::Reference(_)) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumDef, RefTarget, ScalarType, SchemaBuilder};
    use crate::Database;

    const NODE: StorageSlot = StorageSlot(1);
    const LABEL: StorageSlot = StorageSlot(10);
    const NEXT: StorageSlot = StorageSlot(11);
    const SHADE: StorageSlot = StorageSlot(12);
    const LINKS: StorageSlot = StorageSlot(13);
    const WEIGHT: StorageSlot = StorageSlot(15);

    fn node(label: ScalarType, shades: &[&str]) -> SchemaBuilder {
        SchemaBuilder::new().model(
            ModelType::new("Node", 1)
                .field(FieldDecl::new(10, "label", FieldKind::Simple(label)))
                .field(FieldDecl::new(11, "next", FieldKind::Reference(RefTarget::Any)))
                .field(FieldDecl::new(
                    12,
                    "shade",
                    FieldKind::Enum(EnumDef::new("Shade", shades.iter().copied())),
                ))
                .field(FieldDecl::new(
                    13,
                    "links",
                    FieldKind::Set(SubFieldDecl::new(
                        14,
                        "link",
                        ValueType::Reference(RefTarget::Any),
                    )),
                ))
                .field(FieldDecl::new(15, "weight", FieldKind::Counter)),
        )
    }

    fn reference(id: EntityId) -> Value {
        Value::Reference(*id.as_bytes())
    }

    #[test]
    fn copies_fields_by_value() {
        let db = Database::open_in_memory(&node(ScalarType::Text, &["Light", "Dark"])).unwrap();
        let (source, dest) = (db.begin(), db.begin());
        let a = source.create(NODE).unwrap();
        let b = source.create(NODE).unwrap();
        source.write_field(a, LABEL, Value::text("a")).unwrap();
        source.write_field(a, NEXT, reference(b)).unwrap();
        source
            .write_field(a, SHADE, Value::enumeration(1, "Dark"))
            .unwrap();
        source.set_field(a, LINKS).unwrap().insert(reference(b)).unwrap();
        source.set_counter(a, WEIGHT, 7).unwrap();

        let mut state = CopyState::new();
        let copied = CopyEngine::new(&source, &dest)
            .copy(&mut state, a, None, &[])
            .unwrap();
        assert_eq!(copied, 1);
        assert_eq!(dest.read_field(a, LABEL).unwrap(), Value::text("a"));
        assert_eq!(dest.read_field(a, NEXT).unwrap(), reference(b));
        assert_eq!(dest.counter(a, WEIGHT).unwrap(), 7);
        assert_eq!(
            dest.set_field(a, LINKS).unwrap().to_vec().unwrap(),
            vec![reference(b)]
        );
        assert!(!dest.exists(b).unwrap());
    }

    #[test]
    fn overwrites_existing_destination() {
        let db = Database::open_in_memory(&node(ScalarType::Text, &["Light"])).unwrap();
        let (source, dest) = (db.begin(), db.begin());
        let a = source.create(NODE).unwrap();
        dest.create_with_id(a).unwrap();
        dest.write_field(a, LABEL, Value::text("stale")).unwrap();
        dest.set_counter(a, WEIGHT, 3).unwrap();

        CopyEngine::new(&source, &dest)
            .copy(&mut CopyState::new(), a, None, &[])
            .unwrap();
        assert_eq!(dest.read_field(a, LABEL).unwrap(), Value::Null);
        assert_eq!(dest.counter(a, WEIGHT).unwrap(), 0);
    }

    #[test]
    fn copies_root_onto_target() {
        let db = Database::open_in_memory(&node(ScalarType::Text, &["Light"])).unwrap();
        let (source, dest) = (db.begin(), db.begin());
        let a = source.create(NODE).unwrap();
        source.write_field(a, LABEL, Value::text("a")).unwrap();
        let onto = EntityId::new(NODE);

        let mut state = CopyState::new();
        CopyEngine::new(&source, &dest)
            .copy(&mut state, a, Some(onto), &[])
            .unwrap();
        assert_eq!(state.destination_of(a), Some(onto));
        assert_eq!(dest.read_field(onto, LABEL).unwrap(), Value::text("a"));
        assert!(!dest.exists(a).unwrap());
    }

    #[test]
    fn follows_set_elements() {
        let db = Database::open_in_memory(&node(ScalarType::Text, &["Light"])).unwrap();
        let (source, dest) = (db.begin(), db.begin());
        let root = source.create(NODE).unwrap();
        let links = source.set_field(root, LINKS).unwrap();
        let children: Vec<_> = (0..3).map(|_| source.create(NODE).unwrap()).collect();
        for child in &children {
            links.insert(reference(*child)).unwrap();
        }

        let copied = CopyEngine::new(&source, &dest)
            .copy(&mut CopyState::new(), root, None, &[ReferencePath::of([13])])
            .unwrap();
        assert_eq!(copied, 4);
        for child in children {
            assert!(dest.exists(child).unwrap());
        }
    }

    #[test]
    fn enum_constants_follow_names() {
        let source_db = Database::open_in_memory(&node(ScalarType::Text, &["Light", "Dark"])).unwrap();
        let dest_db = Database::open_in_memory(&node(ScalarType::Text, &["Dark"])).unwrap();
        let (source, dest) = (source_db.begin(), dest_db.begin());
        let a = source.create(NODE).unwrap();
        source
            .write_field(a, SHADE, Value::enumeration(1, "Dark"))
            .unwrap();

        CopyEngine::new(&source, &dest)
            .copy(&mut CopyState::new(), a, None, &[])
            .unwrap();
        assert_eq!(
            dest.read_field(a, SHADE).unwrap(),
            Value::enumeration(0, "Dark")
        );

        let b = source.create(NODE).unwrap();
        source
            .write_field(b, SHADE, Value::enumeration(0, "Light"))
            .unwrap();
        let err = CopyEngine::new(&source, &dest)
            .copy(&mut CopyState::new(), b, None, &[])
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue { slot: Some(s), .. } if s == SHADE));
    }

    #[test]
    fn scalar_type_change_is_a_mismatch() {
        let source_db = Database::open_in_memory(&node(ScalarType::Text, &["Light"])).unwrap();
        let dest_db = Database::open_in_memory(&node(ScalarType::Integer, &["Light"])).unwrap();
        let (source, dest) = (source_db.begin(), dest_db.begin());
        let a = source.create(NODE).unwrap();

        let err = CopyEngine::new(&source, &dest)
            .copy(&mut CopyState::new(), a, None, &[])
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::SchemaMismatch { entity_id: Some(e), slot: Some(s), .. } if e == a && s == LABEL
        ));
        assert!(!dest.exists(a).unwrap());
    }
}
