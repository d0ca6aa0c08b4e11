use std::cell::RefCell;
use std::rc::Rc;

use crate::common::{Address, AddressPath, Path, PathDomain};
use crate::interpreter::encoding::{decode_value, encode_value};
use crate::interpreter::storage::{
    InMemorySlabStorage, SlabStorage, StorageCell, StorageDomain, StorageKey,
};
use crate::interpreter::value::{IdCapabilityValue, PathCapabilityValue, Value};
use crate::migrations::capcons::{
    CapabilityMigrationReporter, CapabilityValueMigration, PathCapabilityMapping,
    PathTypeCapabilityMapping,
};
use crate::migrations::{NullReporter, StorageMigration};
use crate::types::{Authorization, PrimitiveType, StaticType};

#[derive(Debug, Default)]
struct TestReporter {
    migrated: Vec<(Address, AddressPath, u64)>,
    missing_capability_ids: Vec<(Address, AddressPath)>,
    missing_borrow_types: Vec<(Address, AddressPath)>,
}

impl CapabilityMigrationReporter for TestReporter {
    fn migrated_path_capability(
        &mut self,
        account_address: Address,
        address_path: &AddressPath,
        _borrow_type: &StaticType,
        capability_id: u64,
    ) {
        self.migrated
            .push((account_address, address_path.clone(), capability_id));
    }

    fn missing_capability_id(&mut self, account_address: Address, address_path: &AddressPath) {
        self.missing_capability_ids
            .push((account_address, address_path.clone()));
    }

    fn missing_borrow_type(&mut self, account_address: Address, address_path: &AddressPath) {
        self.missing_borrow_types
            .push((account_address, address_path.clone()));
    }
}

fn foo_reference() -> StaticType {
    StaticType::Reference {
        authorization: Authorization::Unauthorized,
        referenced: Box::new(StaticType::Composite {
            location: crate::common::Location::Address {
                address: Address::from_u64(1),
                name: "Foo".to_string(),
            },
            qualified_identifier: "Foo".to_string(),
            kind: crate::ast::CompositeKind::Struct,
        }),
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

fn migration(
    mapping: PathCapabilityMapping,
    reporter: Rc<RefCell<TestReporter>>,
) -> CapabilityValueMigration<TestReporter> {
    CapabilityValueMigration {
        private_public_capability_mapping: mapping,
        storage_capability_mapping: PathTypeCapabilityMapping::new(),
        storage_capability_without_type_mapping: PathCapabilityMapping::new(),
        reporter,
    }
}

#[test]
fn test_public_path_capability_is_migrated_to_id_capability() {
    let address = Address::from_u64(1);
    let path = Path::new(PathDomain::Public, "x");
    let mut storage = InMemorySlabStorage::new();

    store(
        &mut storage,
        address,
        "cap",
        &Value::PathCapability(PathCapabilityValue {
            address,
            path: path.clone(),
            borrow_type: Some(foo_reference()),
        }),
    );

    let mut mapping = PathCapabilityMapping::new();
    mapping.record(AddressPath::new(address, path), 42, foo_reference());

    let reporter = Rc::new(RefCell::new(TestReporter::default()));
    let mut engine = StorageMigration::new(&mut storage);
    engine.add(migration(mapping, reporter.clone()));
    engine
        .migrate_account(address, &mut NullReporter)
        .expect("migration runs");
    drop(engine);

    let migrated = stored(&storage, address, "cap");
    assert!(migrated.equal(&Value::IdCapability(IdCapabilityValue {
        address,
        id: 42,
        borrow_type: foo_reference(),
    })));

    let reporter = reporter.borrow();
    assert_eq!(reporter.migrated.len(), 1);
    assert_eq!(reporter.migrated[0].2, 42);
    assert!(reporter.missing_capability_ids.is_empty());
    assert!(reporter.missing_borrow_types.is_empty());
}

#[test]
fn test_missing_mapping_reports_and_leaves_value() {
    let address = Address::from_u64(1);
    let path = Path::new(PathDomain::Public, "x");
    let mut storage = InMemorySlabStorage::new();

    let original = Value::PathCapability(PathCapabilityValue {
        address,
        path,
        borrow_type: Some(foo_reference()),
    });
    store(&mut storage, address, "cap", &original);
    let original_bytes = encode_value(&original).expect("encodes");

    let reporter = Rc::new(RefCell::new(TestReporter::default()));
    let mut engine = StorageMigration::new(&mut storage);
    engine.add(migration(PathCapabilityMapping::new(), reporter.clone()));
    engine
        .migrate_account(address, &mut NullReporter)
        .expect("migration runs");
    drop(engine);

    // Unchanged, byte for byte.
    let cell = storage
        .cell(StorageKey::new(address, StorageDomain::Storage), "cap")
        .expect("cell present");
    assert_eq!(cell, StorageCell::Inline(original_bytes));

    let reporter = reporter.borrow();
    assert!(reporter.migrated.is_empty());
    assert_eq!(reporter.missing_capability_ids.len(), 1);
    assert!(reporter.missing_borrow_types.is_empty());
}

#[test]
fn test_untyped_capability_adopts_controller_borrow_type() {
    let address = Address::from_u64(1);
    let path = Path::new(PathDomain::Private, "y");
    let mut storage = InMemorySlabStorage::new();

    store(
        &mut storage,
        address,
        "cap",
        &Value::PathCapability(PathCapabilityValue {
            address,
            path: path.clone(),
            borrow_type: None,
        }),
    );

    let mut mapping = PathCapabilityMapping::new();
    mapping.record(AddressPath::new(address, path), 7, foo_reference());

    let reporter = Rc::new(RefCell::new(TestReporter::default()));
    let mut engine = StorageMigration::new(&mut storage);
    engine.add(migration(mapping, reporter.clone()));
    engine
        .migrate_account(address, &mut NullReporter)
        .expect("migration runs");
    drop(engine);

    let migrated = stored(&storage, address, "cap");
    assert!(migrated.equal(&Value::IdCapability(IdCapabilityValue {
        address,
        id: 7,
        borrow_type: foo_reference(),
    })));
}

#[test]
fn test_typed_storage_path_capability_uses_type_mapping() {
    let address = Address::from_u64(2);
    let path = Path::new(PathDomain::Storage, "vault");
    let mut storage = InMemorySlabStorage::new();

    store(
        &mut storage,
        address,
        "cap",
        &Value::PathCapability(PathCapabilityValue {
            address,
            path: path.clone(),
            borrow_type: Some(foo_reference()),
        }),
    );

    let mut type_mapping = PathTypeCapabilityMapping::new();
    type_mapping.record(
        AddressPath::new(address, path),
        foo_reference().id(),
        11,
    );

    let reporter = Rc::new(RefCell::new(TestReporter::default()));
    let capability_migration = CapabilityValueMigration {
        private_public_capability_mapping: PathCapabilityMapping::new(),
        storage_capability_mapping: type_mapping,
        storage_capability_without_type_mapping: PathCapabilityMapping::new(),
        reporter: reporter.clone(),
    };

    let mut engine = StorageMigration::new(&mut storage);
    engine.add(capability_migration);
    engine
        .migrate_account(address, &mut NullReporter)
        .expect("migration runs");
    drop(engine);

    let migrated = stored(&storage, address, "cap");
    assert!(migrated.equal(&Value::IdCapability(IdCapabilityValue {
        address,
        id: 11,
        borrow_type: foo_reference(),
    })));
}

#[test]
fn test_migration_is_idempotent() {
    let address = Address::from_u64(1);
    let path = Path::new(PathDomain::Public, "x");
    let mut storage = InMemorySlabStorage::new();

    store(
        &mut storage,
        address,
        "cap",
        &Value::PathCapability(PathCapabilityValue {
            address,
            path: path.clone(),
            borrow_type: Some(foo_reference()),
        }),
    );

    let mut mapping = PathCapabilityMapping::new();
    mapping.record(AddressPath::new(address, path), 42, foo_reference());

    let reporter = Rc::new(RefCell::new(TestReporter::default()));

    for _ in 0..2 {
        let mut engine = StorageMigration::new(&mut storage);
        engine.add(migration(mapping.clone(), reporter.clone()));
        engine
            .migrate_account(address, &mut NullReporter)
            .expect("migration runs");
    }

    let migrated = stored(&storage, address, "cap");
    assert!(migrated.equal(&Value::IdCapability(IdCapabilityValue {
        address,
        id: 42,
        borrow_type: foo_reference(),
    })));
    // The second run found nothing to do.
    assert_eq!(reporter.borrow().migrated.len(), 1);
}

#[test]
fn test_nested_capability_in_array_is_migrated() {
    let address = Address::from_u64(1);
    let path = Path::new(PathDomain::Public, "x");
    let mut storage = InMemorySlabStorage::new();

    let array = Value::array(
        StaticType::VariableSizedArray(Box::new(StaticType::Capability { borrow: None })),
        vec![Value::PathCapability(PathCapabilityValue {
            address,
            path: path.clone(),
            borrow_type: Some(foo_reference()),
        })],
    );
    store(&mut storage, address, "caps", &array);

    let mut mapping = PathCapabilityMapping::new();
    mapping.record(AddressPath::new(address, path), 5, foo_reference());

    let reporter = Rc::new(RefCell::new(TestReporter::default()));
    let mut engine = StorageMigration::new(&mut storage);
    engine.add(migration(mapping, reporter.clone()));
    engine
        .migrate_account(address, &mut NullReporter)
        .expect("migration runs");
    drop(engine);

    let migrated = stored(&storage, address, "caps");
    let Value::Array(elements) = &migrated else {
        panic!("expected an array, got {migrated}");
    };
    assert!(elements.borrow().values[0].equal(&Value::IdCapability(
        IdCapabilityValue {
            address,
            id: 5,
            borrow_type: foo_reference(),
        },
    )));
    assert_eq!(reporter.borrow().migrated.len(), 1);
}

#[test]
fn test_skippable_container_is_byte_identical() {
    let address = Address::from_u64(1);
    let mut storage = InMemorySlabStorage::new();

    let numbers = Value::array(
        StaticType::VariableSizedArray(Box::new(StaticType::Primitive(PrimitiveType::Int))),
        vec![
            Value::Integer(crate::interpreter::value::IntegerValue::int(1)),
            Value::Integer(crate::interpreter::value::IntegerValue::int(2)),
        ],
    );
    store(&mut storage, address, "numbers", &numbers);
    let original_bytes = encode_value(&numbers).expect("encodes");

    let reporter = Rc::new(RefCell::new(TestReporter::default()));
    let mut engine = StorageMigration::new(&mut storage);
    engine.add(migration(PathCapabilityMapping::new(), reporter.clone()));
    engine
        .migrate_account(address, &mut NullReporter)
        .expect("migration runs");
    drop(engine);

    let cell = storage
        .cell(StorageKey::new(address, StorageDomain::Storage), "numbers")
        .expect("cell present");
    assert_eq!(cell, StorageCell::Inline(original_bytes));
}
