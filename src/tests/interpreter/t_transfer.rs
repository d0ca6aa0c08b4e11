#[path = "../ast_test_utils.rs"]
mod util;

use util::{check, program};

use crate::ast::CompositeKind;
use crate::common::{Address, Location, Path, PathDomain};
use crate::diag::Span;
use crate::interpreter::value::{CompositeValue, IntegerValue, Value};
use crate::interpreter::{
    AccountStorage, InMemorySlabStorage, Interpreter, InterpreterConfig, RuntimeError,
    UserErrorKind,
};
use crate::types::{PrimitiveType, StaticType};

fn empty_interpreter() -> Interpreter {
    let checked = check(program(Vec::new())).expect("empty program checks");
    let storage = AccountStorage::new(Box::new(InMemorySlabStorage::new()));
    Interpreter::new(checked, storage, InterpreterConfig::default()).expect("interpreter setup")
}

fn struct_value(field: i64) -> Value {
    let mut composite = CompositeValue::new(
        Location::Script("test".to_string()),
        "Point",
        CompositeKind::Struct,
    );
    composite
        .fields
        .insert("x".to_string(), Value::Integer(IntegerValue::int(field)));
    Value::composite(composite)
}

fn resource_value() -> Value {
    Value::composite(CompositeValue::new(
        Location::Script("test".to_string()),
        "R",
        CompositeKind::Resource,
    ))
}

#[test]
fn test_non_resource_transfer_deep_copies() {
    let mut interpreter = empty_interpreter();
    let original = struct_value(1);
    let copy = interpreter
        .transfer(original.clone(), None, false)
        .expect("transfers");

    if let Value::Composite(composite) = &copy {
        composite
            .borrow_mut()
            .fields
            .insert("x".to_string(), Value::Integer(IntegerValue::int(99)));
    }
    if let Value::Composite(composite) = &original {
        assert!(composite
            .borrow()
            .fields
            .get("x")
            .unwrap()
            .equal(&Value::Integer(IntegerValue::int(1))));
    }
}

#[test]
fn test_resource_transfer_requires_removal() {
    let mut interpreter = empty_interpreter();
    let error = interpreter
        .transfer(resource_value(), None, false)
        .expect_err("transfer without removal is rejected");
    assert!(error.is_internal());
}

#[test]
fn test_capability_transfer_copies_tuple_without_controller_changes() {
    let mut interpreter = empty_interpreter();
    let address = Address::from_u64(1);
    let path = Path::new(PathDomain::Storage, "x");
    interpreter
        .storage_save(
            address,
            &path,
            Value::Integer(IntegerValue::int(1)),
            Span::default(),
        )
        .expect("saves");
    let capability = interpreter
        .issue_capability(
            address,
            path,
            StaticType::Reference {
                authorization: crate::types::Authorization::Unauthorized,
                referenced: Box::new(StaticType::Primitive(PrimitiveType::Int)),
            },
        )
        .expect("issues");

    let transferred = interpreter
        .transfer(capability.clone(), Some(Address::from_u64(2)), false)
        .expect("transfers");
    assert!(transferred.equal(&capability));
    // Controller state is untouched.
    assert!(interpreter
        .storage
        .controller(address, 1)
        .expect("reads controller")
        .is_some());
}

#[test]
fn test_save_rejects_occupied_slot() {
    let mut interpreter = empty_interpreter();
    let address = Address::from_u64(1);
    let path = Path::new(PathDomain::Storage, "x");
    interpreter
        .storage_save(address, &path, struct_value(1), Span::default())
        .expect("first save");
    let error = interpreter
        .storage_save(address, &path, struct_value(2), Span::default())
        .expect_err("second save fails");
    match error {
        RuntimeError::User(user) => {
            assert!(matches!(user.kind, UserErrorKind::StorageSlotOccupied { .. }));
        }
        other => panic!("expected a user error, got {other:?}"),
    }
}

#[test]
fn test_save_sets_owner_and_load_clears_it() {
    let mut interpreter = empty_interpreter();
    let address = Address::from_u64(1);
    let path = Path::new(PathDomain::Storage, "r");

    let resource = resource_value();
    interpreter
        .storage_save(address, &path, resource.clone(), Span::default())
        .expect("saves");
    if let Value::Composite(composite) = &resource {
        assert_eq!(composite.borrow().owner, Some(address));
    }

    let loaded = interpreter
        .storage_load(address, &path)
        .expect("loads")
        .expect("value present");
    if let Value::Composite(composite) = &loaded {
        assert_eq!(composite.borrow().owner, None);
    }

    // The slot is free again.
    assert!(interpreter
        .storage_load(address, &path)
        .expect("second load")
        .is_none());
}

#[test]
fn test_storage_copy_leaves_value_in_place() {
    let mut interpreter = empty_interpreter();
    let address = Address::from_u64(1);
    let path = Path::new(PathDomain::Storage, "x");
    interpreter
        .storage_save(address, &path, struct_value(7), Span::default())
        .expect("saves");

    let copy = interpreter
        .storage_copy(address, &path)
        .expect("copies")
        .expect("value present");
    assert!(copy.equal(&struct_value(7)));
    assert!(interpreter
        .storage_copy(address, &path)
        .expect("copies again")
        .is_some());
}

#[test]
fn test_functions_cannot_be_saved() {
    let mut interpreter = empty_interpreter();
    let function = Value::Function(crate::interpreter::value::FunctionValue::Constructor(
        "S".to_string(),
    ));
    let error = interpreter
        .storage_save(
            Address::from_u64(1),
            &Path::new(PathDomain::Storage, "f"),
            function,
            Span::default(),
        )
        .expect_err("functions are not storable");
    match error {
        RuntimeError::User(user) => {
            assert!(matches!(user.kind, UserErrorKind::NotStorable { .. }));
        }
        other => panic!("expected a user error, got {other:?}"),
    }
}
