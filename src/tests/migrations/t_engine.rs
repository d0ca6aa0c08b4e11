use crate::common::Address;
use crate::interpreter::encoding::{decode_value, encode_value};
use crate::interpreter::storage::{
    InMemorySlabStorage, SlabStorage, StorageCell, StorageDomain, StorageKey,
};
use crate::interpreter::value::{IntegerValue, Value};
use crate::migrations::{
    MigrationReporter, StorageMigration, ValueMigration, ValueMigrationPosition,
};
use crate::types::{PrimitiveType, StaticType};

/// Replaces every `Bool` with the given integer. Skips anything that
/// cannot transitively contain a boolean.
struct BoolToInt {
    name: &'static str,
    replacement: i64,
}

impl ValueMigration for BoolToInt {
    fn name(&self) -> &'static str {
        self.name
    }

    fn migrate(
        &self,
        _storage_key: StorageKey,
        _map_key: &str,
        value: &Value,
        _position: ValueMigrationPosition,
    ) -> Result<Option<Value>, crate::interpreter::RuntimeError> {
        Ok(match value {
            Value::Bool(_) => Some(Value::Integer(IntegerValue::int(self.replacement))),
            _ => None,
        })
    }

    fn can_skip(&self, value_type: &StaticType) -> bool {
        match value_type {
            StaticType::Primitive(PrimitiveType::Bool) => false,
            StaticType::Primitive(_) => true,
            StaticType::Optional(inner) => self.can_skip(inner),
            StaticType::VariableSizedArray(element)
            | StaticType::ConstantSizedArray { element, .. } => self.can_skip(element),
            StaticType::Dictionary { key, value } => self.can_skip(key) && self.can_skip(value),
            _ => false,
        }
    }
}

#[derive(Default)]
struct CountingReporter {
    migrated: Vec<(String, &'static str)>,
}

impl MigrationReporter for CountingReporter {
    fn migrated(&mut self, _storage_key: StorageKey, map_key: &str, migration: &'static str) {
        self.migrated.push((map_key.to_string(), migration));
    }
}

fn store(storage: &mut InMemorySlabStorage, address: Address, key: &str, value: &Value) {
    let bytes = encode_value(value).expect("encodes");
    storage.set_cell(
        StorageKey::new(address, StorageDomain::Storage),
        key,
        StorageCell::Inline(bytes),
    );
}

fn stored(storage: &InMemorySlabStorage, address: Address, key: &str) -> Value {
    let cell = storage
        .cell(StorageKey::new(address, StorageDomain::Storage), key)
        .expect("cell present");
    let bytes = match cell {
        StorageCell::Inline(bytes) => bytes,
        StorageCell::Slab(slab) => storage.read(slab).expect("slab present"),
    };
    decode_value(&bytes).expect("decodes")
}

#[test]
fn test_first_registered_migration_wins_per_node() {
    let address = Address::from_u64(1);
    let mut storage = InMemorySlabStorage::new();
    store(&mut storage, address, "flag", &Value::Bool(true));

    let mut reporter = CountingReporter::default();
    let mut engine = StorageMigration::new(&mut storage);
    engine.add(BoolToInt {
        name: "first",
        replacement: 1,
    });
    engine.add(BoolToInt {
        name: "second",
        replacement: 2,
    });
    engine
        .migrate_account(address, &mut reporter)
        .expect("migration runs");
    drop(engine);

    assert!(stored(&storage, address, "flag")
        .equal(&Value::Integer(IntegerValue::int(1))));
    assert_eq!(reporter.migrated, vec![("flag".to_string(), "first")]);
}

#[test]
fn test_nested_values_inside_optionals_are_rewritten() {
    let address = Address::from_u64(1);
    let mut storage = InMemorySlabStorage::new();
    store(
        &mut storage,
        address,
        "wrapped",
        &Value::some(Value::some(Value::Bool(true))),
    );

    let mut reporter = CountingReporter::default();
    let mut engine = StorageMigration::new(&mut storage);
    engine.add(BoolToInt {
        name: "bool-to-int",
        replacement: 9,
    });
    engine
        .migrate_account(address, &mut reporter)
        .expect("migration runs");
    drop(engine);

    assert!(stored(&storage, address, "wrapped")
        .equal(&Value::some(Value::some(Value::Integer(IntegerValue::int(9))))));
}

#[test]
fn test_composite_fields_are_rewritten_and_slab_replaced() {
    let address = Address::from_u64(1);
    let mut storage = InMemorySlabStorage::new();

    let mut composite = crate::interpreter::value::CompositeValue::new(
        crate::common::Location::Script("test".to_string()),
        "Flags",
        crate::ast::CompositeKind::Struct,
    );
    composite.fields.insert("a".to_string(), Value::Bool(true));
    composite
        .fields
        .insert("padding".to_string(), Value::string("x".repeat(100)));
    let value = Value::composite(composite);

    // Force the cell out to a slab so the rewrite exercises slab
    // replacement.
    let bytes = encode_value(&value).expect("encodes");
    let slab = storage.allocate(bytes);
    storage.set_cell(
        StorageKey::new(address, StorageDomain::Storage),
        "flags",
        StorageCell::Slab(slab),
    );
    let slab_count_before = storage.slab_count();

    let mut reporter = CountingReporter::default();
    let mut engine = StorageMigration::new(&mut storage);
    engine.add(BoolToInt {
        name: "bool-to-int",
        replacement: 1,
    });
    engine
        .migrate_account(address, &mut reporter)
        .expect("migration runs");
    drop(engine);

    let migrated = stored(&storage, address, "flags");
    let Value::Composite(composite) = &migrated else {
        panic!("expected a composite");
    };
    assert!(composite
        .borrow()
        .fields
        .get("a")
        .unwrap()
        .equal(&Value::Integer(IntegerValue::int(1))));
    // Old slab freed, replacement allocated.
    assert_eq!(storage.slab_count(), slab_count_before);
}

#[test]
fn test_domain_filter_limits_application() {
    let address = Address::from_u64(1);
    let mut storage = InMemorySlabStorage::new();
    // Stored under the public domain; the migration only covers storage.
    let bytes = encode_value(&Value::Bool(true)).expect("encodes");
    storage.set_cell(
        StorageKey::new(address, StorageDomain::Public),
        "flag",
        StorageCell::Inline(bytes.clone()),
    );

    struct StorageOnly(BoolToInt);

    impl ValueMigration for StorageOnly {
        fn name(&self) -> &'static str {
            self.0.name()
        }

        fn domains(&self) -> Option<std::collections::HashSet<StorageDomain>> {
            Some([StorageDomain::Storage].into_iter().collect())
        }

        fn migrate(
            &self,
            storage_key: StorageKey,
            map_key: &str,
            value: &Value,
            position: ValueMigrationPosition,
        ) -> Result<Option<Value>, crate::interpreter::RuntimeError> {
            self.0.migrate(storage_key, map_key, value, position)
        }

        fn can_skip(&self, value_type: &StaticType) -> bool {
            self.0.can_skip(value_type)
        }
    }

    let mut reporter = CountingReporter::default();
    let mut engine = StorageMigration::new(&mut storage);
    engine.add(StorageOnly(BoolToInt {
        name: "storage-only",
        replacement: 1,
    }));
    engine
        .migrate_account(address, &mut reporter)
        .expect("migration runs");
    drop(engine);

    let cell = storage
        .cell(StorageKey::new(address, StorageDomain::Public), "flag")
        .expect("cell present");
    assert_eq!(cell, StorageCell::Inline(bytes));
    assert!(reporter.migrated.is_empty());
}
