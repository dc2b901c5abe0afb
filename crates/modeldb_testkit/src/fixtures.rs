//! Test fixtures: a sample schema, a live handle and its factory.
//!
//! The schema models people and their pets:
//!
//! ```text
//! Person (1): name* 10, age* 11, mood 12, friend 13, tags 14 {tag* 15},
//!             pets 16 [pet 17], scores 18 {topic* 19 -> score 20},
//!             visits 21, city 22
//! Pet    (2): name 10, friend 13, owner 23
//!
//! by_city_age           30  (city, age)
//! by_age_city_name      31  (age, city, name)
//! by_age_city_name_mood 32  (age, city, name, mood)
//! ```
//!
//! Starred slots are indexed. Both types extend `Named`.

use modeldb_codec::Value;
use modeldb_core::cache::EntityCache;
use modeldb_core::convert::{
    Converter, ModelEnum, ModelEnumConverter, NullableConverter, ReferenceConverter,
    ValueConverter,
};
use modeldb_core::index::{ColumnConverter, Index2, Index3, Index4};
use modeldb_core::schema::{
    EnumDef, EnumValue, FieldDecl, FieldKind, IndexDecl, ModelType, RefTarget, ScalarType,
    SchemaBuilder, SubFieldDecl, ValueType,
};
use modeldb_core::view::{ConvertedList, ConvertedSet, ListRef, SetRef};
use modeldb_core::{
    AccessorFactory, BoxError, CoreResult, Database, EntityId, LiveHandle, Transaction,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Storage slots of the sample schema.
pub mod slots {
    use modeldb_core::StorageSlot;

    /// `Person` model type.
    pub const PERSON: StorageSlot = StorageSlot(1);
    /// `Pet` model type.
    pub const PET: StorageSlot = StorageSlot(2);
    /// `name`, declared by both types, indexed.
    pub const NAME: StorageSlot = StorageSlot(10);
    /// `age`, indexed.
    pub const AGE: StorageSlot = StorageSlot(11);
    /// `mood`.
    pub const MOOD: StorageSlot = StorageSlot(12);
    /// `friend`, declared by both types.
    pub const FRIEND: StorageSlot = StorageSlot(13);
    /// `tags` set.
    pub const TAGS: StorageSlot = StorageSlot(14);
    /// Element of `tags`, indexed.
    pub const TAG: StorageSlot = StorageSlot(15);
    /// `pets` list.
    pub const PETS: StorageSlot = StorageSlot(16);
    /// Element of `pets`.
    pub const PET_ITEM: StorageSlot = StorageSlot(17);
    /// `scores` map.
    pub const SCORES: StorageSlot = StorageSlot(18);
    /// Key of `scores`, indexed.
    pub const TOPIC: StorageSlot = StorageSlot(19);
    /// Value of `scores`.
    pub const SCORE: StorageSlot = StorageSlot(20);
    /// `visits` counter.
    pub const VISITS: StorageSlot = StorageSlot(21);
    /// `city`.
    pub const CITY: StorageSlot = StorageSlot(22);
    /// `owner` of a pet.
    pub const OWNER: StorageSlot = StorageSlot(23);
    /// Composite index over `(city, age)`.
    pub const BY_CITY_AGE: StorageSlot = StorageSlot(30);
    /// Composite index over `(age, city, name)`.
    pub const BY_AGE_CITY_NAME: StorageSlot = StorageSlot(31);
    /// Composite index over `(age, city, name, mood)`.
    pub const BY_AGE_CITY_NAME_MOOD: StorageSlot = StorageSlot(32);
}

use slots::*;

/// Moods a person can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mood {
    /// Ordinal 0.
    Happy,
    /// Ordinal 1.
    Grumpy,
    /// Ordinal 2.
    Sleepy,
}

impl ModelEnum for Mood {
    const NAME: &'static str = "Mood";

    fn variants() -> &'static [Self] {
        &[Mood::Happy, Mood::Grumpy, Mood::Sleepy]
    }

    fn name(self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Grumpy => "Grumpy",
            Mood::Sleepy => "Sleepy",
        }
    }
}

fn text() -> ValueType {
    ValueType::Scalar(ScalarType::Text)
}

/// The `Person` type with the given mood definition.
pub fn person_type(moods: EnumDef) -> ModelType {
    ModelType::new("Person", PERSON.0)
        .supertype("Named")
        .field(FieldDecl::new(NAME.0, "name", FieldKind::Simple(ScalarType::Text)).indexed())
        .field(FieldDecl::new(AGE.0, "age", FieldKind::Simple(ScalarType::Integer)).indexed())
        .field(FieldDecl::new(MOOD.0, "mood", FieldKind::Enum(moods)))
        .field(FieldDecl::new(FRIEND.0, "friend", FieldKind::Reference(RefTarget::Any)))
        .field(FieldDecl::new(
            TAGS.0,
            "tags",
            FieldKind::Set(SubFieldDecl::new(TAG.0, "tag", text()).indexed()),
        ))
        .field(FieldDecl::new(
            PETS.0,
            "pets",
            FieldKind::List(SubFieldDecl::new(
                PET_ITEM.0,
                "pet",
                ValueType::Reference(RefTarget::of([PET])),
            )),
        ))
        .field(FieldDecl::new(
            SCORES.0,
            "scores",
            FieldKind::Map {
                key: SubFieldDecl::new(TOPIC.0, "topic", text()).indexed(),
                value: SubFieldDecl::new(SCORE.0, "score", ValueType::Scalar(ScalarType::Integer)),
            },
        ))
        .field(FieldDecl::new(VISITS.0, "visits", FieldKind::Counter))
        .field(FieldDecl::new(CITY.0, "city", FieldKind::Simple(ScalarType::Text)))
}

/// The `Pet` type.
pub fn pet_type() -> ModelType {
    ModelType::new("Pet", PET.0)
        .supertype("Named")
        .field(FieldDecl::new(NAME.0, "name", FieldKind::Simple(ScalarType::Text)))
        .field(FieldDecl::new(FRIEND.0, "friend", FieldKind::Reference(RefTarget::Any)))
        .field(FieldDecl::new(
            OWNER.0,
            "owner",
            FieldKind::Reference(RefTarget::of([PERSON])),
        ))
}

/// The sample schema.
pub fn people_schema() -> SchemaBuilder {
    people_schema_with_moods(Mood::enum_def())
}

/// The sample schema with a different mood definition.
pub fn people_schema_with_moods(moods: EnumDef) -> SchemaBuilder {
    SchemaBuilder::new()
        .model(person_type(moods))
        .model(pet_type())
        .index(IndexDecl::new("by_city_age", BY_CITY_AGE.0, [CITY.0, AGE.0]))
        .index(IndexDecl::new(
            "by_age_city_name",
            BY_AGE_CITY_NAME.0,
            [AGE.0, CITY.0, NAME.0],
        ))
        .index(IndexDecl::new(
            "by_age_city_name_mood",
            BY_AGE_CITY_NAME_MOOD.0,
            [AGE.0, CITY.0, NAME.0, MOOD.0],
        ))
}

/// A database over the sample schema, held for the duration of a test.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
}

impl TestDatabase {
    /// Opens the sample schema in memory.
    pub fn memory() -> Self {
        Self::with_schema(&people_schema())
    }

    /// Opens `schema` in memory.
    pub fn with_schema(schema: &SchemaBuilder) -> Self {
        Self {
            db: Database::open_in_memory(schema).expect("Failed to open in-memory database"),
        }
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test against a fresh database over the sample schema.
pub fn with_people<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Stored form of a reference to `id`.
pub fn reference(id: EntityId) -> Value {
    Value::Reference(*id.as_bytes())
}

/// Creates a person with a name and an age.
pub fn create_person(txn: &Arc<Transaction>, name: &str, age: i64) -> CoreResult<EntityId> {
    let id = txn.create(PERSON)?;
    txn.write_field(id, NAME, Value::text(name))?;
    txn.write_field(id, AGE, Value::Integer(age))?;
    Ok(id)
}

/// Creates a pet, optionally owned by a person.
pub fn create_pet(txn: &Arc<Transaction>, name: &str, owner: Option<EntityId>) -> CoreResult<EntityId> {
    let id = txn.create(PET)?;
    txn.write_field(id, NAME, Value::text(name))?;
    if let Some(owner) = owner {
        txn.write_field(id, OWNER, reference(owner))?;
    }
    Ok(id)
}

/// Integer column converter.
pub fn ints() -> ColumnConverter<i64> {
    Arc::new(ValueConverter::<i64>::new())
}

/// Text column converter.
pub fn texts() -> ColumnConverter<String> {
    Arc::new(ValueConverter::<String>::new())
}

/// Entity ID column converter, used for target columns.
pub fn ids() -> ColumnConverter<EntityId> {
    Arc::new(ValueConverter::<EntityId>::new())
}

/// Mood column converter.
pub fn moods() -> ColumnConverter<Mood> {
    Arc::new(ModelEnumConverter::<Mood>::new().then(ValueConverter::<EnumValue>::new()))
}

/// `by_city_age` as a typed index.
pub fn by_city_age(txn: &Arc<Transaction>) -> CoreResult<Index2<String, i64, EntityId>> {
    Index2::new(txn.index(BY_CITY_AGE)?, texts(), ints(), ids())
}

/// `by_age_city_name` as a typed index.
pub fn by_age_city_name(
    txn: &Arc<Transaction>,
) -> CoreResult<Index3<i64, String, String, EntityId>> {
    Index3::new(txn.index(BY_AGE_CITY_NAME)?, ints(), texts(), texts(), ids())
}

/// `by_age_city_name_mood` as a typed index.
pub fn by_age_city_name_mood(
    txn: &Arc<Transaction>,
) -> CoreResult<Index4<i64, String, String, Mood, EntityId>> {
    Index4::new(
        txn.index(BY_AGE_CITY_NAME_MOOD)?,
        ints(),
        texts(),
        texts(),
        moods(),
        ids(),
    )
}

/// The sample live handle, for people and pets alike.
///
/// Every accessor reads through to the transaction; the handle itself
/// holds no field state.
pub struct ModelHandle {
    id: EntityId,
    txn: Arc<Transaction>,
    cache: Arc<EntityCache<ModelFactory>>,
}

impl LiveHandle for ModelHandle {
    fn entity_id(&self) -> EntityId {
        self.id
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle").field("id", &self.id).finish()
    }
}

impl ModelHandle {
    /// The entity's ID.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The transaction the handle is bound to.
    pub fn transaction(&self) -> &Arc<Transaction> {
        &self.txn
    }

    /// Name of the entity's model type.
    pub fn type_name(&self) -> CoreResult<String> {
        Ok(self.txn.model_type_of(self.id)?.name.clone())
    }

    /// Reads `name`, or an empty string when unset.
    pub fn name(&self) -> CoreResult<String> {
        let value = self.txn.read_field(self.id, NAME)?;
        Ok(NullableConverter(ValueConverter::<String>::new())
            .backward(&value)?
            .unwrap_or_default())
    }

    /// Writes `name`.
    pub fn set_name(&self, name: &str) -> CoreResult<()> {
        self.txn.write_field(self.id, NAME, Value::text(name))?;
        Ok(())
    }

    /// Reads `age`.
    pub fn age(&self) -> CoreResult<Option<i64>> {
        NullableConverter(ValueConverter::<i64>::new()).backward(&self.txn.read_field(self.id, AGE)?)
    }

    /// Reads `mood`.
    pub fn mood(&self) -> CoreResult<Option<Mood>> {
        let mood = NullableConverter(
            ModelEnumConverter::<Mood>::new().then(ValueConverter::<EnumValue>::new()),
        );
        mood.backward(&self.txn.read_field(self.id, MOOD)?)
    }

    /// Writes `mood`.
    pub fn set_mood(&self, mood: Option<Mood>) -> CoreResult<()> {
        let converter = NullableConverter(
            ModelEnumConverter::<Mood>::new().then(ValueConverter::<EnumValue>::new()),
        );
        self.txn
            .write_field(self.id, MOOD, converter.forward(&mood)?)?;
        Ok(())
    }

    /// Resolves `friend` through the identity cache.
    pub fn friend(&self) -> CoreResult<Option<Arc<ModelHandle>>> {
        let friend = NullableConverter(ReferenceConverter::new(Arc::clone(&self.cache)));
        friend.backward(&self.txn.read_field(self.id, FRIEND)?)
    }

    /// Points `friend` at another handle, or clears it.
    pub fn set_friend(&self, friend: Option<&Arc<ModelHandle>>) -> CoreResult<()> {
        let value = friend.map_or(Value::Null, |f| reference(f.id()));
        self.txn.write_field(self.id, FRIEND, value)?;
        Ok(())
    }

    /// The `tags` set as strings.
    pub fn tags(&self) -> CoreResult<ConvertedSet<Value, String, ValueConverter<String>>> {
        let tags: SetRef<Value> = Arc::new(self.txn.set_field(self.id, TAGS)?);
        Ok(ConvertedSet::new(tags, ValueConverter::new()))
    }

    /// The `pets` list as live handles.
    pub fn pets(
        &self,
    ) -> CoreResult<ConvertedList<Value, Arc<ModelHandle>, ReferenceConverter<ModelFactory>>> {
        let pets: ListRef<Value> = Arc::new(self.txn.list_field(self.id, PETS)?);
        Ok(ConvertedList::new(
            pets,
            ReferenceConverter::new(Arc::clone(&self.cache)),
        ))
    }
}

/// An instrumented [`AccessorFactory`] for [`ModelHandle`].
///
/// Counts instantiations and can be told to fail, to stall, or to look up
/// the entity under construction.
#[derive(Debug, Default)]
pub struct ModelFactory {
    instantiated: AtomicUsize,
    failures: AtomicUsize,
    decoys: AtomicUsize,
    delay_ms: AtomicU64,
    lookup_before_register: AtomicBool,
    lookup_after_register: AtomicBool,
    resolve_friend: AtomicBool,
    self_hits: AtomicUsize,
    failed_ids: Mutex<HashSet<EntityId>>,
}

impl ModelFactory {
    /// A factory that builds handles and nothing else.
    pub fn new() -> Self {
        Self::default()
    }

    /// A plain factory, shared.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Fails the next `count` instantiations.
    #[must_use]
    pub fn failing(self, count: usize) -> Self {
        self.failures.store(count, Ordering::SeqCst);
        self
    }

    /// Sleeps for `delay` inside every instantiation.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.delay_ms.store(millis, Ordering::SeqCst);
        self
    }

    /// Looks up the entity under construction before registering it.
    #[must_use]
    pub fn looking_up_before_register(self) -> Self {
        self.lookup_before_register.store(true, Ordering::SeqCst);
        self
    }

    /// Registers a stand-in handle on the next `n` builds and returns a
    /// different one.
    #[must_use]
    pub fn registering_decoys(self, n: usize) -> Self {
        self.decoys.store(n, Ordering::SeqCst);
        self
    }

    /// Registers the new handle, then looks its entity up again.
    #[must_use]
    pub fn looking_up_after_register(self) -> Self {
        self.lookup_after_register.store(true, Ordering::SeqCst);
        self
    }

    /// Resolves `friend` while initializing each handle.
    #[must_use]
    pub fn resolving_friends(self) -> Self {
        self.resolve_friend.store(true, Ordering::SeqCst);
        self
    }

    /// Number of handles instantiated so far, failed ones included.
    pub fn instantiated(&self) -> usize {
        self.instantiated.load(Ordering::SeqCst)
    }

    /// Number of self-lookups that returned the handle under construction.
    pub fn self_hits(&self) -> usize {
        self.self_hits.load(Ordering::SeqCst)
    }

    /// Entities whose instantiation was made to fail.
    pub fn failed_ids(&self) -> HashSet<EntityId> {
        self.failed_ids.lock().clone()
    }
}

impl AccessorFactory for ModelFactory {
    type Handle = ModelHandle;

    fn instantiate(
        &self,
        cache: &Arc<EntityCache<Self>>,
        txn: &Arc<Transaction>,
        id: EntityId,
    ) -> Result<Arc<ModelHandle>, BoxError> {
        self.instantiated.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
        let fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            self.failed_ids.lock().insert(id);
            return Err(format!("injected failure for {id}").into());
        }
        if self.lookup_before_register.load(Ordering::SeqCst) {
            cache.get(id)?;
        }

        let handle = Arc::new(ModelHandle {
            id,
            txn: Arc::clone(txn),
            cache: Arc::clone(cache),
        });
        let decoy = self
            .decoys
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if decoy {
            cache.register(&Arc::new(ModelHandle {
                id,
                txn: Arc::clone(txn),
                cache: Arc::clone(cache),
            }))?;
        }
        if self.lookup_after_register.load(Ordering::SeqCst) {
            cache.register(&handle)?;
            if Arc::ptr_eq(&cache.get(id)?, &handle) {
                self.self_hits.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(handle)
    }

    fn initialize(
        &self,
        _cache: &Arc<EntityCache<Self>>,
        handle: &Arc<ModelHandle>,
    ) -> Result<(), BoxError> {
        if self.resolve_friend.load(Ordering::SeqCst) {
            handle.friend()?;
        }
        Ok(())
    }
}
