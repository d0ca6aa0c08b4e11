#[path = "../ast_test_utils.rs"]
mod util;

use std::cell::RefCell;
use std::rc::Rc;

use util::{check, program};

use crate::diag::Span;
use crate::interpreter::value::{IntegerValue, Value};
use crate::interpreter::{
    host_function, AccountStorage, InMemorySlabStorage, Interpreter, InterpreterConfig,
    RuntimeError, UserErrorKind,
};
use crate::stdlib::{test_contract_checker, test_contract_value, TestFramework};
use crate::types::StaticType;

struct StubFramework {
    files: Vec<(String, String)>,
}

impl TestFramework for StubFramework {
    fn read_file(&self, path: &str) -> Result<String, RuntimeError> {
        self.files
            .iter()
            .find(|(name, _)| name == path)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| RuntimeError::internal(format!("no such file: {path}")))
    }

    fn new_emulator_blockchain(&mut self) -> Result<Value, RuntimeError> {
        Ok(Value::composite(
            crate::interpreter::value::CompositeValue::new(
                crate::common::Location::Identifier("Test".to_string()),
                "Test.Blockchain",
                crate::ast::CompositeKind::Struct,
            ),
        ))
    }
}

fn test_interpreter() -> (Interpreter, Value) {
    let checked = check(program(Vec::new())).expect("empty program checks");
    let storage = AccountStorage::new(Box::new(InMemorySlabStorage::new()));
    let interpreter =
        Interpreter::new(checked, storage, InterpreterConfig::default()).expect("setup");
    let framework = Rc::new(RefCell::new(StubFramework {
        files: vec![("test.cdc".to_string(), "contract source".to_string())],
    }));
    let test = test_contract_value(framework);
    (interpreter, test)
}

fn call_test_function(
    interpreter: &mut Interpreter,
    test: &Value,
    name: &str,
    arguments: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let member = interpreter.get_member(test, name, Span::default())?;
    let Value::Function(function) = member else {
        panic!("`{name}` is not a function");
    };
    interpreter.call_value(function, arguments)
}

#[test]
fn test_contract_checks_once_and_is_shared() {
    let first = test_contract_checker().expect("test contract checks");
    let second = test_contract_checker().expect("test contract checks");
    assert!(std::ptr::eq(first, second));
    assert_eq!(
        first.location,
        crate::common::Location::Identifier("Test".to_string()),
    );
}

#[test]
fn test_contract_exposes_matcher_and_blockchain_types() {
    let checked = test_contract_checker().expect("test contract checks");
    let names: Vec<String> = checked
        .registry
        .ids()
        .filter_map(|id| {
            checked
                .cache
                .get(id)
                .nominal_key()
                .map(|key| key.qualified_identifier.clone())
        })
        .collect();
    assert!(names.contains(&"Test".to_string()));
    assert!(names.contains(&"Test.Matcher".to_string()));
    assert!(names.contains(&"Test.Blockchain".to_string()));
}

#[test]
fn test_assert_passes_and_fails() {
    let (mut interpreter, test) = test_interpreter();
    call_test_function(&mut interpreter, &test, "assert", vec![Value::Bool(true)])
        .expect("assert(true) passes");

    let error = call_test_function(&mut interpreter, &test, "assert", vec![Value::Bool(false)])
        .expect_err("assert(false) fails");
    match error {
        RuntimeError::User(user) => {
            assert!(matches!(user.kind, UserErrorKind::AssertionFailed { .. }));
        }
        other => panic!("expected a user error, got {other:?}"),
    }
}

#[test]
fn test_fail_always_fails() {
    let (mut interpreter, test) = test_interpreter();
    let error = call_test_function(
        &mut interpreter,
        &test,
        "fail",
        vec![Value::string("nope")],
    )
    .expect_err("fail fails");
    match error {
        RuntimeError::User(user) => match user.kind {
            UserErrorKind::AssertionFailed { message } => {
                assert_eq!(message.as_deref(), Some("\"nope\""));
            }
            other => panic!("expected assertion failure, got {other:?}"),
        },
        other => panic!("expected a user error, got {other:?}"),
    }
}

#[test]
fn test_expect_with_equal_matcher() {
    let (mut interpreter, test) = test_interpreter();
    let matcher = call_test_function(
        &mut interpreter,
        &test,
        "equal",
        vec![Value::Integer(IntegerValue::int(42))],
    )
    .expect("equal matcher");

    call_test_function(
        &mut interpreter,
        &test,
        "expect",
        vec![Value::Integer(IntegerValue::int(42)), matcher.clone()],
    )
    .expect("matching value passes");

    let error = call_test_function(
        &mut interpreter,
        &test,
        "expect",
        vec![Value::Integer(IntegerValue::int(41)), matcher],
    )
    .expect_err("mismatching value fails");
    assert!(matches!(
        error,
        RuntimeError::User(user) if matches!(user.kind, UserErrorKind::AssertionFailed { .. }),
    ));
}

#[test]
fn test_be_empty_and_have_element_count_matchers() {
    let (mut interpreter, test) = test_interpreter();
    let int_array_type =
        StaticType::VariableSizedArray(Box::new(StaticType::Primitive(
            crate::types::PrimitiveType::Int,
        )));

    let empty = Value::array(int_array_type.clone(), Vec::new());
    let matcher = call_test_function(&mut interpreter, &test, "beEmpty", Vec::new())
        .expect("beEmpty matcher");
    call_test_function(&mut interpreter, &test, "expect", vec![empty, matcher])
        .expect("empty array matches");

    let two = Value::array(
        int_array_type,
        vec![
            Value::Integer(IntegerValue::int(1)),
            Value::Integer(IntegerValue::int(2)),
        ],
    );
    let matcher = call_test_function(
        &mut interpreter,
        &test,
        "haveElementCount",
        vec![Value::Integer(IntegerValue::int(2))],
    )
    .expect("haveElementCount matcher");
    call_test_function(&mut interpreter, &test, "expect", vec![two, matcher])
        .expect("two elements match");
}

#[test]
fn test_contain_and_comparison_matchers() {
    let (mut interpreter, test) = test_interpreter();
    let values = Value::array(
        StaticType::VariableSizedArray(Box::new(StaticType::Primitive(
            crate::types::PrimitiveType::Int,
        ))),
        vec![
            Value::Integer(IntegerValue::int(1)),
            Value::Integer(IntegerValue::int(2)),
        ],
    );
    let matcher = call_test_function(
        &mut interpreter,
        &test,
        "contain",
        vec![Value::Integer(IntegerValue::int(2))],
    )
    .expect("contain matcher");
    call_test_function(&mut interpreter, &test, "expect", vec![values, matcher])
        .expect("contained element matches");

    let matcher = call_test_function(
        &mut interpreter,
        &test,
        "beGreaterThan",
        vec![Value::Integer(IntegerValue::int(10))],
    )
    .expect("beGreaterThan matcher");
    call_test_function(
        &mut interpreter,
        &test,
        "expect",
        vec![Value::Integer(IntegerValue::int(11)), matcher],
    )
    .expect("greater value matches");

    let matcher = call_test_function(
        &mut interpreter,
        &test,
        "beLessThan",
        vec![Value::Integer(IntegerValue::int(10))],
    )
    .expect("beLessThan matcher");
    let error = call_test_function(
        &mut interpreter,
        &test,
        "expect",
        vec![Value::Integer(IntegerValue::int(11)), matcher],
    )
    .expect_err("greater value does not match");
    assert!(matches!(error, RuntimeError::User(_)));
}

#[test]
fn test_new_matcher_uses_custom_test_function() {
    let (mut interpreter, test) = test_interpreter();
    let is_even = Value::Function(host_function("isEven", |_, invocation| {
        let Some(Value::Integer(value)) = invocation.arguments.first() else {
            return Ok(Value::Bool(false));
        };
        Ok(Value::Bool(&value.value % 2 == num_bigint::BigInt::from(0)))
    }));

    let matcher = call_test_function(&mut interpreter, &test, "newMatcher", vec![is_even])
        .expect("newMatcher");
    call_test_function(
        &mut interpreter,
        &test,
        "expect",
        vec![Value::Integer(IntegerValue::int(4)), matcher.clone()],
    )
    .expect("even value matches");
    let error = call_test_function(
        &mut interpreter,
        &test,
        "expect",
        vec![Value::Integer(IntegerValue::int(3)), matcher],
    )
    .expect_err("odd value does not match");
    assert!(matches!(error, RuntimeError::User(_)));
}

#[test]
fn test_read_file_dispatches_to_framework() {
    let (mut interpreter, test) = test_interpreter();
    let content = call_test_function(
        &mut interpreter,
        &test,
        "readFile",
        vec![Value::string("test.cdc")],
    )
    .expect("readFile");
    assert!(content.equal(&Value::string("contract source")));
}

#[test]
fn test_new_emulator_blockchain_dispatches_to_framework() {
    let (mut interpreter, test) = test_interpreter();
    let blockchain =
        call_test_function(&mut interpreter, &test, "newEmulatorBlockchain", Vec::new())
            .expect("newEmulatorBlockchain");
    match blockchain {
        Value::Composite(composite) => {
            assert_eq!(composite.borrow().qualified_identifier, "Test.Blockchain");
        }
        other => panic!("expected a composite, got {other}"),
    }
}
