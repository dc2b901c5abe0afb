//! Converters and converted views over stored fields.

use modeldb_codec::{encode_value, Value};
use modeldb_core::convert::{
    Converter, EnumDefConverter, MapViewConverter, ModelEnum, ModelEnumConverter,
    NullableConverter, Row3, SetViewConverter, Tuple3Converter, ValueConverter,
};
use modeldb_core::schema::{EnumDef, EnumValue};
use modeldb_core::view::{ListView, MapRef, MapView, SetRef, SetView};
use modeldb_core::CoreError;
use modeldb_testkit::prelude::*;
use proptest::prelude::*;
use std::sync::Arc;

fn mood_value() -> impl Converter<Mood, Value> {
    ModelEnumConverter::<Mood>::new().then(ValueConverter::<EnumValue>::new())
}

#[test]
fn handle_views_read_and_write_through() {
    with_people(|db| {
        let txn = db.begin();
        let ada = create_person(&txn, "Ada", 36).unwrap();
        let cache = txn.entity_cache(ModelFactory::shared()).unwrap();
        let handle = cache.get(ada).unwrap();

        let tags = handle.tags().unwrap();
        assert!(tags.insert("go".to_string()).unwrap());
        assert!(!tags.insert("go".to_string()).unwrap());
        assert!(tags.contains(&"go".to_string()).unwrap());

        let raw = txn.set_field(ada, slots::TAGS).unwrap();
        assert_eq!(raw.to_vec().unwrap(), vec![Value::text("go")]);

        handle.set_name("Ada L.").unwrap();
        assert_eq!(txn.read_field(ada, slots::NAME).unwrap(), Value::text("Ada L."));
    });
}

#[test]
fn reference_lists_resolve_to_cached_handles() {
    with_people(|db| {
        let txn = db.begin();
        let ada = create_person(&txn, "Ada", 36).unwrap();
        let rex = create_pet(&txn, "Rex", Some(ada)).unwrap();
        let cache = txn.entity_cache(ModelFactory::shared()).unwrap();
        let owner = cache.get(ada).unwrap();
        let pet = cache.get(rex).unwrap();

        let pets = owner.pets().unwrap();
        pets.push(Arc::clone(&pet)).unwrap();
        pets.push(Arc::clone(&pet)).unwrap();
        assert_eq!(pets.len().unwrap(), 2);
        assert!(Arc::ptr_eq(&pets.get(1).unwrap().unwrap(), &pet));
        assert_eq!(pet.type_name().unwrap(), "Pet");
    });
}

#[test]
fn map_fields_convert_keys_and_values() {
    with_people(|db| {
        let txn = db.begin();
        let ada = create_person(&txn, "Ada", 36).unwrap();
        let raw: MapRef<Value, Value> = Arc::new(txn.map_field(ada, slots::SCORES).unwrap());
        let lift = MapViewConverter(ValueConverter::<String>::new(), ValueConverter::<i64>::new());
        let scores: MapRef<String, i64> = lift.backward(&raw).unwrap();

        assert_eq!(scores.put("chess".to_string(), 3).unwrap(), None);
        assert_eq!(scores.put("chess".to_string(), 5).unwrap(), Some(3));
        scores.put("go".to_string(), 1).unwrap();
        assert_eq!(
            scores.to_vec().unwrap(),
            vec![("chess".to_string(), 5), ("go".to_string(), 1)]
        );
        assert_eq!(scores.remove(&"go".to_string()).unwrap(), Some(1));
        assert_eq!(scores.get(&"go".to_string()).unwrap(), None);
    });
}

#[test]
fn enum_fields_reject_foreign_constants() {
    with_people(|db| {
        let txn = db.begin();
        let ada = create_person(&txn, "Ada", 36).unwrap();
        let err = txn
            .write_field(ada, slots::MOOD, Value::enumeration(7, "Angry"))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue { .. }), "{err}");
    });
}

#[test]
fn enum_definitions_remap_by_name() {
    let narrow = EnumDef::new("Mood", ["Happy", "Sleepy"]);
    let remap = EnumDefConverter::new(Mood::enum_def(), narrow);
    let sleepy = ModelEnumConverter::<Mood>::new().forward(&Mood::Sleepy).unwrap();
    assert_eq!(remap.forward(&sleepy).unwrap(), EnumValue::new(1, "Sleepy"));
    assert_eq!(remap.backward(&EnumValue::new(1, "Sleepy")).unwrap(), sleepy);

    let grumpy = EnumValue::new(1, "Grumpy");
    assert!(matches!(
        remap.forward(&grumpy),
        Err(CoreError::InvalidValue { .. })
    ));
}

#[test]
fn lifted_set_converter_relabels_whole_views() {
    with_people(|db| {
        let txn = db.begin();
        let ada = create_person(&txn, "Ada", 36).unwrap();
        let raw: SetRef<Value> = Arc::new(txn.set_field(ada, slots::TAGS).unwrap());
        raw.insert(Value::text("b")).unwrap();
        raw.insert(Value::text("a")).unwrap();

        let lift = SetViewConverter(ValueConverter::<String>::new());
        let strings: SetRef<String> = lift.backward(&raw).unwrap();
        assert_eq!(strings.to_vec().unwrap(), vec!["a", "b"]);
        let back: SetRef<Value> = lift.forward(&strings).unwrap();
        assert!(back.contains(&Value::text("a")).unwrap());
    });
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn rows_round_trip(age in any::<i64>(), city in text_strategy(), mood in 0usize..3) {
        let mood = Mood::variants()[mood];
        let row = Tuple3Converter(ValueConverter::<i64>::new(), ValueConverter::<String>::new(), mood_value())
            .then(Row3);
        let stored = row.forward(&(age, city.clone(), mood)).unwrap();
        prop_assert_eq!(stored.len(), 3);
        prop_assert_eq!(row.backward(&stored).unwrap(), (age, city, mood));
    }

    #[test]
    fn encoded_order_follows_value_order(
        a in (any::<i64>(), text_strategy()),
        b in (any::<i64>(), text_strategy()),
    ) {
        let row = Tuple3Converter(
            ValueConverter::<i64>::new(),
            ValueConverter::<String>::new(),
            NullableConverter(ValueConverter::<i64>::new()),
        )
        .then(Row3);
        let encode = |(n, s): &(i64, String)| -> Vec<u8> {
            row.forward(&(*n, s.clone(), None))
                .unwrap()
                .iter()
                .flat_map(encode_value)
                .collect()
        };
        prop_assert_eq!(encode(&a).cmp(&encode(&b)), a.cmp(&b));
    }

    #[test]
    fn stored_values_survive_fields(value in value_strategy()) {
        let kind_matches = matches!(value, Value::Text(_));
        with_people(|db| {
            let txn = db.begin();
            let ada = create_person(&txn, "Ada", 36).unwrap();
            let result = txn.write_field(ada, slots::CITY, value.clone());
            assert_eq!(result.is_ok(), kind_matches);
            if kind_matches {
                assert_eq!(txn.read_field(ada, slots::CITY).unwrap(), value);
            }
        });
    }
}
