//! Property-based test generators using proptest.
//!
//! Provides strategies for stored values, entity IDs, index rows and small
//! entity graphs over the sample schema.

use crate::fixtures::{create_person, reference, slots};
use modeldb_codec::Value;
use modeldb_core::view::SetView;
use modeldb_core::{CoreResult, EntityId, StorageSlot, Transaction};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Strategy for entity IDs of the given model type.
pub fn entity_id_strategy(type_slot: StorageSlot) -> impl Strategy<Value = EntityId> {
    prop::array::uniform12(any::<u8>()).prop_map(move |tail| {
        let mut bytes = [0u8; 16];
        bytes[..4].copy_from_slice(&type_slot.to_be_bytes());
        bytes[4..].copy_from_slice(&tail);
        EntityId::from_bytes(bytes)
    })
}

/// Strategy for short person names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,7}").expect("Invalid regex")
}

/// Strategy for text that exercises the escaping of embedded zero bytes.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!['a', 'b', 'c', '\0', '\u{1}']), 0..6)
        .prop_map(|chars| chars.into_iter().collect())
}

/// Strategy for non-null stored values of every kind.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (0u32..4, "[A-Z]{1,4}").prop_map(|(ordinal, name)| Value::enumeration(ordinal, name)),
        text_strategy().prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
        prop::array::uniform16(any::<u8>()).prop_map(Value::Reference),
    ]
}

/// Strategy for `(age, city, name)` index keys drawn from a small domain,
/// so that rows share prefixes.
pub fn person_key_strategy() -> impl Strategy<Value = (i64, String, String)> {
    (
        0i64..4,
        prop::sample::select(vec!["Oslo", "Lima", "Kyiv"]),
        prop::sample::select(vec!["Ada", "Bo", "Cy", "Di"]),
    )
        .prop_map(|(age, city, name)| (age, city.to_string(), name.to_string()))
}

/// One person of a generated graph.
#[derive(Debug, Clone)]
pub struct PersonSeed {
    /// Name of the person.
    pub name: String,
    /// Age of the person.
    pub age: i64,
    /// Position of the person's friend within the graph, if any.
    pub friend: Option<usize>,
    /// Tags of the person.
    pub tags: BTreeSet<String>,
}

/// A graph of people linked by `friend`, cycles and self-loops included.
#[derive(Debug, Clone)]
pub struct PeopleGraph {
    /// The people, in creation order.
    pub people: Vec<PersonSeed>,
}

impl PeopleGraph {
    /// Number of people.
    pub fn len(&self) -> usize {
        self.people.len()
    }

    /// Returns true if the graph has no people.
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Creates every person in `txn` and links friends.
    ///
    /// Returns the IDs in graph order.
    pub fn build(&self, txn: &Arc<Transaction>) -> CoreResult<Vec<EntityId>> {
        let ids = self
            .people
            .iter()
            .map(|seed| create_person(txn, &seed.name, seed.age))
            .collect::<CoreResult<Vec<_>>>()?;
        for (seed, &id) in self.people.iter().zip(&ids) {
            if let Some(friend) = seed.friend {
                txn.write_field(id, slots::FRIEND, reference(ids[friend]))?;
            }
            let tags = txn.set_field(id, slots::TAGS)?;
            for tag in &seed.tags {
                tags.insert(Value::text(tag.as_str()))?;
            }
        }
        Ok(ids)
    }

    /// Positions reached from `start` by following `friend` at most
    /// `steps` times, `start` included.
    pub fn friends_of(&self, start: usize, steps: usize) -> BTreeSet<usize> {
        let mut reached = BTreeSet::from([start]);
        let mut current = start;
        for _ in 0..steps {
            match self.people[current].friend {
                Some(next) if reached.insert(next) => current = next,
                _ => break,
            }
        }
        reached
    }
}

/// Strategy for graphs of one to `max_people` people.
pub fn people_graph_strategy(max_people: usize) -> impl Strategy<Value = PeopleGraph> {
    (1..=max_people.max(1)).prop_flat_map(|count| {
        let seed = (
            name_strategy(),
            0i64..100,
            prop::option::of(0..count),
            prop::collection::btree_set("[a-d]{1,2}", 0..3),
        )
            .prop_map(|(name, age, friend, tags)| PersonSeed {
                name,
                age,
                friend,
                tags,
            });
        prop::collection::vec(seed, count).prop_map(|people| PeopleGraph { people })
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
